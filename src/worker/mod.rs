//! # Worker Orchestration
//!
//! A [`WorkerOrchestrator`] runs a configured number of worker loops, each
//! repeatedly borrowing a session from the pool, invoking the external
//! [`TaskExecutor`](crate::executor::TaskExecutor), and reporting outcomes
//! over a bounded channel to a single aggregator consumer.
//!
//! Cancellation is cooperative: a shared running flag gates every loop, and
//! sleeps are interruptible, so shutdown completes once in-flight tasks
//! return.

mod aggregator;
mod orchestrator;
mod result;

pub use aggregator::{AggregateTotals, TotalsSnapshot};
pub use orchestrator::WorkerOrchestrator;
pub use result::{ResultObserver, WorkOutcome, WorkResult};

pub(crate) use aggregator::ResultAggregator;
pub(crate) use orchestrator::OrchestratorControl;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::executor::{TaskExecutor, TaskOutcome};
use crate::pool::SessionPool;
use crate::session::SessionFactory;

/// One worker loop: acquire → execute → report → release → delay.
pub(crate) struct Worker<F, E>
where
    F: SessionFactory,
    E: TaskExecutor<Handle = F::Handle>,
{
    id: usize,
    pool: SessionPool<F>,
    executor: Arc<E>,
    config: WorkerConfig,
    stop_on_first_success: bool,
    control: Arc<OrchestratorControl>,
    results: mpsc::Sender<WorkResult>,
    check_count: u64,
    success_count: u64,
    window_task_ms: u64,
    window_checks: u64,
}

impl<F, E> Worker<F, E>
where
    F: SessionFactory,
    E: TaskExecutor<Handle = F::Handle>,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: usize,
        pool: SessionPool<F>,
        executor: Arc<E>,
        config: WorkerConfig,
        stop_on_first_success: bool,
        control: Arc<OrchestratorControl>,
        results: mpsc::Sender<WorkResult>,
    ) -> Self {
        Self {
            id,
            pool,
            executor,
            config,
            stop_on_first_success,
            control,
            results,
            check_count: 0,
            success_count: 0,
            window_task_ms: 0,
            window_checks: 0,
        }
    }

    /// Loop until the orchestrator clears the running flag. Nothing inside
    /// an iteration can end the loop: acquire misses and task errors are
    /// absorbed with a backoff.
    pub(crate) async fn run(mut self) {
        info!(worker_id = self.id, "worker started");

        while self.control.is_running() {
            self.run_iteration().await;
        }

        info!(
            worker_id = self.id,
            checks = self.check_count,
            successes = self.success_count,
            "worker stopped"
        );
    }

    async fn run_iteration(&mut self) {
        let Some(lease) = self.pool.acquire(self.config.acquire_timeout()).await else {
            debug!(worker_id = self.id, "no session available; backing off");
            self.idle(self.config.retry_backoff()).await;
            return;
        };

        self.check_count += 1;
        let session_id = lease.id();
        let started = Instant::now();

        let outcome = match self.executor.run(lease.handle()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // external failure, not a pool failure; the session stays
                // in circulation unless its own probe later disagrees
                warn!(
                    worker_id = self.id,
                    session_id,
                    error = %e,
                    "task execution error"
                );
                TaskOutcome::Failure
            }
        };

        self.window_task_ms += started.elapsed().as_millis() as u64;
        self.window_checks += 1;

        if outcome == TaskOutcome::Failure {
            lease.record_failure();
        }
        drop(lease); // hand the session back before reporting and delaying

        let mut delay = jittered_delay(&self.config);
        if outcome == TaskOutcome::Success {
            self.success_count += 1;
            info!(
                worker_id = self.id,
                session_id, "🎉 acquisition attempt succeeded"
            );
            self.emit(WorkOutcome::Success).await;
            if self.stop_on_first_success {
                self.control.request_stop();
                return;
            }
            // avoid hammering the endpoint with redundant follow-ups
            delay = delay.max(self.config.success_cooldown());
        }

        if self.config.status_tick_every > 0 && self.check_count % self.config.status_tick_every == 0
        {
            let avg_task_ms = if self.window_checks > 0 {
                self.window_task_ms as f64 / self.window_checks as f64
            } else {
                0.0
            };
            self.emit(WorkOutcome::StatusTick {
                check_count: self.check_count,
                success_count: self.success_count,
                avg_task_ms,
            })
            .await;
            self.window_task_ms = 0;
            self.window_checks = 0;
        }

        self.idle(delay).await;
    }

    async fn emit(&self, outcome: WorkOutcome) {
        let result = WorkResult::new(self.id, outcome);
        if self.results.send(result).await.is_err() {
            debug!(worker_id = self.id, "result channel closed");
        }
    }

    /// Interruptible sleep: wakes early when shutdown is signalled.
    async fn idle(&self, delay: Duration) {
        if !self.control.is_running() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.control.shutdown_signal() => {}
        }
    }
}

/// Base interval with random jitter, floored so a small jitter can never
/// produce a tight spin loop.
fn jittered_delay(config: &WorkerConfig) -> Duration {
    let base = config.check_interval_ms as i64;
    let jitter = config.jitter_ms as i64;
    let offset = if jitter > 0 {
        fastrand::i64(-jitter..=jitter)
    } else {
        0
    };
    let millis = (base + offset).max(config.min_delay_ms as i64);
    Duration::from_millis(millis as u64)
}
