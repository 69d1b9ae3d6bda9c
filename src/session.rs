//! # Session Lifecycle
//!
//! A [`Session`] wraps one externally-created resource handle with the
//! metadata the pool needs to manage it: health, usage, age, and error
//! counts. The handle itself is opaque — the pool only relies on the
//! [`SessionHandle`] probe/close capabilities and hands the handle to the
//! task executor otherwise untouched.
//!
//! Counters are atomics because the background health monitor reads and
//! flips them concurrently with the single worker holding the session.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::error::Result;

/// Health state of a pooled session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionHealth {
    Healthy,
    Unhealthy,
}

const HEALTH_HEALTHY: u8 = 0;
const HEALTH_UNHEALTHY: u8 = 1;

/// An opaque, externally-created resource handle.
///
/// The pool requires only two capabilities: a cheap liveness probe and a
/// close operation releasing the underlying resource. Everything else the
/// handle can do belongs to the task executor.
#[async_trait]
pub trait SessionHandle: Send + Sync + 'static {
    /// Cheap check that the handle is still usable
    async fn probe(&self) -> bool;

    /// Release the underlying resource. Invoked at most once per session.
    async fn close(&self);
}

/// Constructs new session handles. Construction is expensive and may fail;
/// the pool tolerates individual failures and logs them.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    type Handle: SessionHandle;

    async fn create(&self) -> Result<Self::Handle>;
}

/// A pool-managed session: one resource handle plus lifecycle metadata.
///
/// At most one worker holds a session at a time; the pool enforces this.
/// `health` and `error_count` may additionally be updated by the health
/// monitor while a worker holds the session.
#[derive(Debug)]
pub struct Session<H> {
    id: u64,
    handle: H,
    health: AtomicU8,
    created_at: Instant,
    last_used_at: Mutex<Instant>,
    usage_count: AtomicU64,
    error_count: AtomicU64,
    closed: AtomicBool,
}

impl<H: SessionHandle> Session<H> {
    pub(crate) fn new(id: u64, handle: H) -> Self {
        let now = Instant::now();
        Self {
            id,
            handle,
            health: AtomicU8::new(HEALTH_HEALTHY),
            created_at: now,
            last_used_at: Mutex::new(now),
            usage_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The underlying resource handle
    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn health(&self) -> SessionHealth {
        match self.health.load(Ordering::Acquire) {
            HEALTH_HEALTHY => SessionHealth::Healthy,
            _ => SessionHealth::Unhealthy,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.health() == SessionHealth::Healthy
    }

    pub(crate) fn mark_unhealthy(&self) {
        self.health.store(HEALTH_UNHEALTHY, Ordering::Release);
    }

    pub fn usage_count(&self) -> u64 {
        self.usage_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Record a task failure against this session. Never evicts by itself;
    /// saturation past `max_error_count` is acted on by the next sweep.
    pub fn record_error(&self) -> u64 {
        self.error_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Time since construction
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn last_used_at(&self) -> Instant {
        *self.last_used_at.lock()
    }

    /// Stamp an acquisition: updates `last_used_at` and bumps `usage_count`.
    pub(crate) fn touch(&self) {
        *self.last_used_at.lock() = Instant::now();
        self.usage_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Run the liveness probe. A failed probe marks the session Unhealthy
    /// and counts as an error.
    pub(crate) async fn probe(&self) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        if self.handle.probe().await {
            true
        } else {
            warn!(session_id = self.id, "session failed liveness probe");
            self.record_error();
            self.mark_unhealthy();
            false
        }
    }

    /// Whether this session has crossed any eviction threshold.
    pub(crate) fn should_evict(&self, config: &PoolConfig) -> bool {
        !self.is_healthy()
            || self.age() > config.max_session_age()
            || self.usage_count() > config.max_usage_count
            || self.error_count() > config.max_error_count
    }

    /// Close the underlying handle. Idempotent: the resource is released
    /// exactly once no matter how many callers race here.
    pub(crate) async fn close(&self) {
        self.mark_unhealthy();
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.handle.close().await;
            debug!(session_id = self.id, "session handle closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64 as StdAtomicU64;
    use std::sync::Arc;

    struct TestHandle {
        alive: AtomicBool,
        closes: Arc<StdAtomicU64>,
    }

    impl TestHandle {
        fn new(closes: Arc<StdAtomicU64>) -> Self {
            Self {
                alive: AtomicBool::new(true),
                closes,
            }
        }
    }

    #[async_trait]
    impl SessionHandle for TestHandle {
        async fn probe(&self) -> bool {
            self.alive.load(Ordering::Relaxed)
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn test_session(closes: Arc<StdAtomicU64>) -> Session<TestHandle> {
        Session::new(1, TestHandle::new(closes))
    }

    #[tokio::test]
    async fn test_touch_stamps_usage() {
        let session = test_session(Arc::default());
        assert_eq!(session.usage_count(), 0);
        session.touch();
        session.touch();
        assert_eq!(session.usage_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_probe_marks_unhealthy() {
        let session = test_session(Arc::default());
        session.handle().alive.store(false, Ordering::Relaxed);

        assert!(!session.probe().await);
        assert_eq!(session.health(), SessionHealth::Unhealthy);
        assert_eq!(session.error_count(), 1);
    }

    #[tokio::test]
    async fn test_close_releases_handle_exactly_once() {
        let closes = Arc::new(StdAtomicU64::new(0));
        let session = test_session(closes.clone());

        session.close().await;
        session.close().await;

        assert_eq!(closes.load(Ordering::Relaxed), 1);
        assert!(!session.is_healthy());
    }

    #[tokio::test]
    async fn test_usage_threshold_triggers_eviction() {
        let config = PoolConfig {
            max_usage_count: 3,
            ..PoolConfig::default()
        };
        let session = test_session(Arc::default());

        for _ in 0..3 {
            session.touch();
        }
        assert!(!session.should_evict(&config));

        session.touch();
        assert!(session.should_evict(&config));
    }

    #[tokio::test]
    async fn test_error_threshold_triggers_eviction() {
        let config = PoolConfig {
            max_error_count: 2,
            ..PoolConfig::default()
        };
        let session = test_session(Arc::default());

        session.record_error();
        session.record_error();
        assert!(!session.should_evict(&config));

        session.record_error();
        assert!(session.should_evict(&config));
    }

    #[tokio::test(start_paused = true)]
    async fn test_age_threshold_triggers_eviction() {
        let config = PoolConfig {
            max_session_age_secs: 60,
            ..PoolConfig::default()
        };
        let session = test_session(Arc::default());
        assert!(!session.should_evict(&config));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(session.should_evict(&config));
    }
}
