//! The external task seam.
//!
//! One [`TaskExecutor::run`] call is a single check-and-attempt unit of work
//! against the remote target, performed through a borrowed session handle.
//! The executor may retry selectors or navigate internally; the core only
//! sees the tri-state outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::SessionHandle;

/// Outcome of one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// Nothing actionable found (target unavailable); try again later
    NoOp,
    /// The acquisition attempt succeeded
    Success,
    /// The attempt ran and failed
    Failure,
}

/// Performs one unit of work against a borrowed session handle.
///
/// An `Err` from [`run`](TaskExecutor::run) is treated by the worker as a
/// task failure, never as a pool failure: the session stays in circulation
/// unless the pool's own liveness probe later disagrees.
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    type Handle: SessionHandle;

    async fn run(&self, handle: &Self::Handle) -> Result<TaskOutcome>;
}
