//! Single-consumer aggregation of worker results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::worker::orchestrator::OrchestratorControl;
use crate::worker::result::{ResultObserver, WorkOutcome, WorkResult};

/// Running totals across all workers
#[derive(Debug, Default)]
pub struct AggregateTotals {
    results_seen: AtomicU64,
    successes: AtomicU64,
    status_ticks: AtomicU64,
}

impl AggregateTotals {
    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TotalsSnapshot {
        TotalsSnapshot {
            results_seen: self.results_seen.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            status_ticks: self.status_ticks.load(Ordering::Relaxed),
        }
    }

    fn record(&self, result: &WorkResult) {
        self.results_seen.fetch_add(1, Ordering::Relaxed);
        match result.outcome {
            WorkOutcome::Success => {
                self.successes.fetch_add(1, Ordering::Relaxed);
            }
            WorkOutcome::StatusTick { .. } => {
                self.status_ticks.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Point-in-time copy of [`AggregateTotals`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotalsSnapshot {
    pub results_seen: u64,
    pub successes: u64,
    pub status_ticks: u64,
}

/// Consumes the result channel in delivery order, keeps totals, and fires
/// the stop transition on the first success when so configured.
pub(crate) struct ResultAggregator {
    rx: mpsc::Receiver<WorkResult>,
    totals: Arc<AggregateTotals>,
    control: Arc<OrchestratorControl>,
    stop_on_first_success: bool,
    observer: Option<Arc<dyn ResultObserver>>,
}

impl ResultAggregator {
    pub(crate) fn new(
        rx: mpsc::Receiver<WorkResult>,
        totals: Arc<AggregateTotals>,
        control: Arc<OrchestratorControl>,
        stop_on_first_success: bool,
        observer: Option<Arc<dyn ResultObserver>>,
    ) -> Self {
        Self {
            rx,
            totals,
            control,
            stop_on_first_success,
            observer,
        }
    }

    /// Run until every producer has hung up and the channel drains.
    pub(crate) async fn run(mut self) {
        while let Some(result) = self.rx.recv().await {
            self.totals.record(&result);
            if let Some(observer) = &self.observer {
                observer.on_result(&result);
            }

            match result.outcome {
                WorkOutcome::Success => {
                    info!(
                        worker_id = result.worker_id,
                        total_successes = self.totals.successes(),
                        "🎉 success reported"
                    );
                    if self.stop_on_first_success && self.control.request_stop() {
                        info!("stop-on-success: halting all workers");
                    }
                }
                WorkOutcome::StatusTick {
                    check_count,
                    success_count,
                    avg_task_ms,
                } => {
                    info!(
                        worker_id = result.worker_id,
                        checks = check_count,
                        successes = success_count,
                        avg_task_ms,
                        "worker status"
                    );
                }
            }
        }

        let totals = self.totals.snapshot();
        debug!(
            results = totals.results_seen,
            successes = totals.successes,
            "result channel drained; aggregator exiting"
        );
    }
}
