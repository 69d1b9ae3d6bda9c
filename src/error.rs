//! Structured error handling for the pool and orchestration core.
//!
//! Expected-empty outcomes (an acquire timing out on a busy pool) are modeled
//! as `Option`, not errors; this enum covers the conditions a caller can
//! actually act on.

/// Crate-wide error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrabberError {
    /// A session could not be constructed by the factory
    #[error("Session error: {0}")]
    SessionError(String),

    /// The pool has no live sessions and cannot create any
    #[error("Pool exhausted: {0}")]
    PoolExhausted(String),

    /// The external task reported a hard failure
    #[error("Task error: {0}")]
    TaskError(String),

    /// An operation was invoked in a state that does not permit it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A bounded wait elapsed before the operation completed
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Rejected configuration values
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

pub type Result<T> = std::result::Result<T, GrabberError>;
