//! Lifecycle control for the worker fleet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::{GrabberError, Result};
use crate::executor::TaskExecutor;
use crate::pool::{PoolMonitor, SessionPool};
use crate::session::SessionFactory;
use crate::worker::aggregator::AggregateTotals;
use crate::worker::result::ResultObserver;
use crate::worker::{ResultAggregator, TotalsSnapshot, Worker};

/// Shared run state gating every worker loop.
///
/// `request_stop` is an atomic transition: exactly one caller observes
/// `true` no matter how many successes or shutdown paths race.
pub(crate) struct OrchestratorControl {
    running: AtomicBool,
    stop_requested: AtomicBool,
    shutdown_notify: Notify,
}

impl OrchestratorControl {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            shutdown_notify: Notify::new(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn mark_running(&self) {
        self.stop_requested.store(false, Ordering::Release);
        self.running.store(true, Ordering::Release);
    }

    /// Clear the running flag. Returns `true` only for the caller that
    /// performed the transition.
    pub(crate) fn request_stop(&self) -> bool {
        if self.stop_requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.running.store(false, Ordering::Release);
        self.shutdown_notify.notify_waiters();
        true
    }

    pub(crate) async fn shutdown_signal(&self) {
        self.shutdown_notify.notified().await;
    }
}

/// Owns the worker fleet, the result aggregator, and the pool monitor.
pub struct WorkerOrchestrator<F, E>
where
    F: SessionFactory,
    E: TaskExecutor<Handle = F::Handle>,
{
    id: Uuid,
    pool: SessionPool<F>,
    executor: Arc<E>,
    config: OrchestratorConfig,
    control: Arc<OrchestratorControl>,
    totals: Arc<AggregateTotals>,
    monitor: PoolMonitor<F>,
    worker_handles: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    aggregator_handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
    observer: Option<Arc<dyn ResultObserver>>,
}

impl<F, E> WorkerOrchestrator<F, E>
where
    F: SessionFactory,
    E: TaskExecutor<Handle = F::Handle>,
{
    pub fn new(pool: SessionPool<F>, executor: Arc<E>, config: OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            monitor: PoolMonitor::new(pool.clone()),
            pool,
            executor,
            config,
            control: Arc::new(OrchestratorControl::new()),
            totals: Arc::new(AggregateTotals::default()),
            worker_handles: parking_lot::Mutex::new(Vec::new()),
            aggregator_handle: parking_lot::Mutex::new(None),
            observer: None,
        })
    }

    /// Attach an observer that receives every result in channel order.
    pub fn with_observer(mut self, observer: Arc<dyn ResultObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    pub fn pool(&self) -> &SessionPool<F> {
        &self.pool
    }

    pub fn totals(&self) -> TotalsSnapshot {
        self.totals.snapshot()
    }

    /// Launch the configured number of workers, the aggregator, and the
    /// pool monitor. Errors if already running.
    pub fn start(&self) -> Result<()> {
        if self.control.is_running() {
            return Err(GrabberError::InvalidState(
                "orchestrator is already running".to_string(),
            ));
        }
        self.control.mark_running();

        let (tx, rx) = mpsc::channel(self.config.result_channel_capacity);

        let aggregator = ResultAggregator::new(
            rx,
            self.totals.clone(),
            self.control.clone(),
            self.config.stop_on_first_success,
            self.observer.clone(),
        );
        *self.aggregator_handle.lock() = Some(tokio::spawn(aggregator.run()));

        let mut handles = Vec::with_capacity(self.config.worker_count);
        for worker_id in 1..=self.config.worker_count {
            let worker = Worker::new(
                worker_id,
                self.pool.clone(),
                self.executor.clone(),
                self.config.worker.clone(),
                self.config.stop_on_first_success,
                self.control.clone(),
                tx.clone(),
            );
            handles.push(tokio::spawn(worker.run()));
        }
        drop(tx); // workers hold the only senders; the channel drains with them
        *self.worker_handles.lock() = handles;

        self.monitor.start()?;

        info!(
            orchestrator_id = %self.id,
            workers = self.config.worker_count,
            stop_on_first_success = self.config.stop_on_first_success,
            "🚀 orchestrator started"
        );
        Ok(())
    }

    /// Request the stop transition without waiting for the drain.
    pub fn request_stop(&self) {
        self.control.request_stop();
    }

    /// Stop everything: signal the workers, drain them within the shutdown
    /// timeout (stragglers are abandoned with a warning), drain the
    /// aggregator, stop the monitor, and destroy the pool. Idempotent.
    pub async fn stop_all(&self) -> Result<()> {
        self.control.request_stop();

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.worker_handles.lock());
        if !handles.is_empty() {
            info!(
                orchestrator_id = %self.id,
                workers = handles.len(),
                "draining workers"
            );
            let drain = futures::future::join_all(handles);
            if tokio::time::timeout(self.config.shutdown_timeout(), drain)
                .await
                .is_err()
            {
                warn!(
                    timeout_ms = self.config.shutdown_timeout_ms,
                    "⚠️ workers did not drain in time; abandoning stragglers"
                );
            }
        }

        let aggregator = self.aggregator_handle.lock().take();
        if let Some(handle) = aggregator {
            if tokio::time::timeout(self.config.shutdown_timeout(), handle)
                .await
                .is_err()
            {
                warn!("⚠️ aggregator did not drain in time");
            }
        }

        if let Err(e) = self.monitor.stop(self.config.shutdown_timeout()).await {
            warn!(error = %e, "pool monitor stop failed");
        }

        self.pool.destroy_all().await;

        info!(orchestrator_id = %self.id, "🛑 orchestrator stopped");
        Ok(())
    }

    /// Park until the running flag clears (either [`stop_all`](Self::stop_all)
    /// or a stop-on-success transition). Does not perform the shutdown itself.
    pub async fn wait_for_stop(&self) {
        while self.control.is_running() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
