//! Orchestrator integration tests: lifecycle, stop-on-success, drain.

mod common;

use std::sync::Arc;

use grabber_core::{
    GrabberError, OrchestratorConfig, PoolConfig, ResultObserver, SessionPool, WorkOutcome,
    WorkResult, WorkerOrchestrator, WorkerConfig,
};
use parking_lot::Mutex;
use tokio::time::Duration;

use common::{MockFactory, ScriptedExecutor, SucceedAtCall};

fn fast_worker() -> WorkerConfig {
    WorkerConfig {
        check_interval_ms: 10,
        jitter_ms: 0,
        min_delay_ms: 10,
        acquire_timeout_ms: 100,
        retry_backoff_ms: 10,
        status_tick_every: 10,
        success_cooldown_ms: 10,
    }
}

fn orchestrator_config(workers: usize, stop_on_first_success: bool) -> OrchestratorConfig {
    OrchestratorConfig {
        worker_count: workers,
        stop_on_first_success,
        result_channel_capacity: 64,
        shutdown_timeout_ms: 5_000,
        worker: fast_worker(),
    }
}

struct CollectingObserver {
    seen: Mutex<Vec<WorkResult>>,
}

impl ResultObserver for CollectingObserver {
    fn on_result(&self, result: &WorkResult) {
        self.seen.lock().push(result.clone());
    }
}

#[tokio::test(start_paused = true)]
async fn first_success_stops_the_whole_fleet() {
    let pool = SessionPool::new(
        MockFactory::new(),
        PoolConfig {
            capacity: 3,
            ..PoolConfig::default()
        },
    )
    .await
    .unwrap();

    let executor = Arc::new(SucceedAtCall::new(4));
    let orchestrator =
        WorkerOrchestrator::new(pool.clone(), executor, orchestrator_config(5, true)).unwrap();

    orchestrator.start().unwrap();
    orchestrator.wait_for_stop().await;
    orchestrator.stop_all().await.unwrap();

    // successes racing the stop transition may land more than one result,
    // but the fleet halted and the pool was torn down exactly once
    let totals = orchestrator.totals();
    assert!(totals.successes >= 1);
    assert!(!orchestrator.is_running());
    assert_eq!(pool.stats().total_sessions, 0);
}

#[tokio::test(start_paused = true)]
async fn workers_keep_running_when_stop_on_success_is_off() {
    let pool = SessionPool::new(
        MockFactory::new(),
        PoolConfig {
            capacity: 2,
            ..PoolConfig::default()
        },
    )
    .await
    .unwrap();

    let executor = Arc::new(SucceedAtCall::new(3));
    let observer = Arc::new(CollectingObserver {
        seen: Mutex::new(Vec::new()),
    });
    let orchestrator = WorkerOrchestrator::new(pool, executor.clone(), orchestrator_config(2, false))
        .unwrap()
        .with_observer(observer.clone());

    orchestrator.start().unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(orchestrator.is_running());
    orchestrator.stop_all().await.unwrap();

    // every call from the third on succeeds, and nothing stopped the fleet
    let totals = orchestrator.totals();
    assert!(totals.successes > 1);
    assert!(executor.calls() > totals.successes);

    // the observer saw every result the aggregator saw, in order
    let seen = observer.seen.lock();
    assert_eq!(seen.len() as u64, totals.results_seen);
    assert!(seen
        .iter()
        .any(|r| matches!(r.outcome, WorkOutcome::StatusTick { .. })));
}

#[tokio::test(start_paused = true)]
async fn noop_run_reports_status_and_drains_cleanly() {
    let pool = SessionPool::new(
        MockFactory::new(),
        PoolConfig {
            capacity: 2,
            ..PoolConfig::default()
        },
    )
    .await
    .unwrap();

    let executor = Arc::new(ScriptedExecutor::new(vec![]));
    let orchestrator =
        WorkerOrchestrator::new(pool.clone(), executor, orchestrator_config(3, true)).unwrap();

    orchestrator.start().unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    orchestrator.stop_all().await.unwrap();

    let totals = orchestrator.totals();
    assert_eq!(totals.successes, 0);
    assert!(totals.status_ticks > 0);
    assert_eq!(pool.stats().total_sessions, 0);
}

#[tokio::test]
async fn double_start_is_rejected() {
    let pool = SessionPool::new(MockFactory::new(), PoolConfig::default())
        .await
        .unwrap();
    let executor = Arc::new(ScriptedExecutor::new(vec![]));
    let orchestrator =
        WorkerOrchestrator::new(pool, executor, orchestrator_config(1, true)).unwrap();

    orchestrator.start().unwrap();
    assert!(matches!(
        orchestrator.start(),
        Err(GrabberError::InvalidState(_))
    ));

    orchestrator.stop_all().await.unwrap();
}

#[tokio::test]
async fn stop_all_is_idempotent() {
    let pool = SessionPool::new(MockFactory::new(), PoolConfig::default())
        .await
        .unwrap();
    let executor = Arc::new(ScriptedExecutor::new(vec![]));
    let orchestrator =
        WorkerOrchestrator::new(pool, executor, orchestrator_config(2, true)).unwrap();

    orchestrator.start().unwrap();
    orchestrator.stop_all().await.unwrap();
    orchestrator.stop_all().await.unwrap();
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn zero_workers_is_a_configuration_error() {
    let pool = SessionPool::new(MockFactory::new(), PoolConfig::default())
        .await
        .unwrap();
    let executor = Arc::new(ScriptedExecutor::new(vec![]));
    let result = WorkerOrchestrator::new(pool, executor, orchestrator_config(0, true));
    assert!(matches!(result, Err(GrabberError::ConfigurationError(_))));
}
