//! Result events emitted by workers.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a worker has to report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WorkOutcome {
    /// One acquisition attempt succeeded
    Success,
    /// Periodic progress report with cumulative per-worker counters
    StatusTick {
        check_count: u64,
        success_count: u64,
        /// Average task duration over the reporting window, in milliseconds
        avg_task_ms: f64,
    },
}

/// One event on the result channel
#[derive(Debug, Clone, Serialize)]
pub struct WorkResult {
    pub worker_id: usize,
    pub outcome: WorkOutcome,
    pub timestamp: DateTime<Utc>,
}

impl WorkResult {
    pub(crate) fn new(worker_id: usize, outcome: WorkOutcome) -> Self {
        Self {
            worker_id,
            outcome,
            timestamp: Utc::now(),
        }
    }
}

/// Injected observer receiving every result in channel delivery order.
///
/// The aggregator is the channel's single consumer; this is the monitoring
/// seam for embedders, replacing any global mutable state.
pub trait ResultObserver: Send + Sync + 'static {
    fn on_result(&self, result: &WorkResult);
}
