//! Configuration for the session pool and worker orchestration core.
//!
//! These structs are plain immutable parameters: loading them from the
//! environment or files is owned by the embedding process. Each struct
//! carries a `validate()` that rejects values the core cannot run with.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GrabberError, Result};

/// Session pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Target steady-state number of live sessions
    pub capacity: usize,
    /// Interval between background health sweeps in milliseconds
    pub health_check_interval_ms: u64,
    /// Maximum session lifetime in seconds before eviction
    pub max_session_age_secs: u64,
    /// Maximum number of acquisitions before eviction
    pub max_usage_count: u64,
    /// Maximum recorded errors before eviction
    pub max_error_count: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            health_check_interval_ms: 60_000,
            max_session_age_secs: 1800,
            max_usage_count: 1000,
            max_error_count: 10,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(GrabberError::ConfigurationError(
                "Pool capacity must be greater than 0".to_string(),
            ));
        }
        if self.health_check_interval_ms == 0 {
            return Err(GrabberError::ConfigurationError(
                "Health check interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn max_session_age(&self) -> Duration {
        Duration::from_secs(self.max_session_age_secs)
    }
}

/// Per-worker loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Base delay between iterations in milliseconds
    pub check_interval_ms: u64,
    /// Random jitter applied to the base delay, plus or minus, in milliseconds
    pub jitter_ms: u64,
    /// Floor for the jittered delay in milliseconds
    pub min_delay_ms: u64,
    /// How long one acquire call waits for a session in milliseconds
    pub acquire_timeout_ms: u64,
    /// Backoff after an empty acquire or an unexpected loop error in milliseconds
    pub retry_backoff_ms: u64,
    /// Emit a status result every this many iterations (0 disables)
    pub status_tick_every: u64,
    /// Cool-down after a successful attempt in milliseconds
    pub success_cooldown_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 300,
            jitter_ms: 100,
            min_delay_ms: 100,
            acquire_timeout_ms: 5_000,
            retry_backoff_ms: 1_000,
            status_tick_every: 100,
            success_cooldown_ms: 2_000,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_ms == 0 {
            return Err(GrabberError::ConfigurationError(
                "Check interval must be greater than 0".to_string(),
            ));
        }
        if self.min_delay_ms > self.check_interval_ms + self.jitter_ms {
            return Err(GrabberError::ConfigurationError(
                "Minimum delay exceeds the largest possible jittered delay".to_string(),
            ));
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn success_cooldown(&self) -> Duration {
        Duration::from_millis(self.success_cooldown_ms)
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of concurrent workers to run
    pub worker_count: usize,
    /// Halt all workers after the first successful attempt
    pub stop_on_first_success: bool,
    /// Bounded capacity of the result channel
    pub result_channel_capacity: usize,
    /// Bounded wait for workers to drain on shutdown in milliseconds
    pub shutdown_timeout_ms: u64,
    /// Per-worker loop settings
    pub worker: WorkerConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            stop_on_first_success: true,
            result_channel_capacity: 64,
            shutdown_timeout_ms: 10_000,
            worker: WorkerConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(GrabberError::ConfigurationError(
                "Worker count must be greater than 0".to_string(),
            ));
        }
        if self.result_channel_capacity == 0 {
            return Err(GrabberError::ConfigurationError(
                "Result channel capacity must be greater than 0".to_string(),
            ));
        }
        self.worker.validate()
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
