//! # Session Pool
//!
//! Maintains up to `capacity` healthy sessions and hands them out to workers
//! under mutual exclusion with a bounded wait. Sessions that fail their
//! liveness probe, age out, get overused, or saturate their error budget are
//! evicted and replaced.
//!
//! All mutation of the `sessions`/`available`/`checked_out` sets happens
//! under one pool-wide lock; probes, factory calls, and handle closes run
//! outside it so eviction never stalls concurrent acquirers for longer than
//! a set mutation.

mod guard;
mod monitor;

pub use guard::PooledSession;
pub use monitor::PoolMonitor;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::{GrabberError, Result};
use crate::session::{Session, SessionFactory};

struct PoolInner<H> {
    sessions: HashMap<u64, Arc<Session<H>>>,
    available: VecDeque<u64>,
    checked_out: HashSet<u64>,
    closed: bool,
}

struct PoolShared<F: SessionFactory> {
    factory: F,
    config: PoolConfig,
    inner: Mutex<PoolInner<F::Handle>>,
    available_notify: Notify,
    next_session_id: AtomicU64,
}

/// Fixed-capacity pool of reusable sessions.
///
/// Cheap to clone; all clones share the same state. Acquisition returns a
/// [`PooledSession`] guard whose drop hands the session back on every exit
/// path.
pub struct SessionPool<F: SessionFactory> {
    shared: Arc<PoolShared<F>>,
}

impl<F: SessionFactory> Clone for SessionPool<F> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<F: SessionFactory> SessionPool<F> {
    /// Create and initialize a pool. Individual construction failures are
    /// logged and tolerated; fails with `PoolExhausted` only when not a
    /// single session could be created.
    pub async fn new(factory: F, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let pool = Self {
            shared: Arc::new(PoolShared {
                factory,
                config,
                inner: Mutex::new(PoolInner {
                    sessions: HashMap::new(),
                    available: VecDeque::new(),
                    checked_out: HashSet::new(),
                    closed: false,
                }),
                available_notify: Notify::new(),
                next_session_id: AtomicU64::new(0),
            }),
        };

        pool.initialize().await?;
        Ok(pool)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    async fn initialize(&self) -> Result<()> {
        let capacity = self.shared.config.capacity;
        info!(capacity, "initializing session pool");

        for _ in 0..capacity {
            if let Err(e) = self.spawn_session().await {
                warn!(error = %e, "session construction failed during initialization");
            }
        }

        let live = self.shared.inner.lock().sessions.len();
        if live == 0 {
            return Err(GrabberError::PoolExhausted(
                "no sessions could be created during pool initialization".to_string(),
            ));
        }
        if live < capacity {
            warn!(live, capacity, "pool initialized under capacity");
        }

        info!(live, "session pool ready");
        Ok(())
    }

    /// Create one session and add it to the available set.
    async fn spawn_session(&self) -> Result<u64> {
        let handle = self.shared.factory.create().await?;
        let id = self.shared.next_session_id.fetch_add(1, Ordering::Relaxed) + 1;
        let session = Arc::new(Session::new(id, handle));

        let rejected = {
            let mut inner = self.shared.inner.lock();
            if inner.closed {
                true
            } else {
                inner.sessions.insert(id, session.clone());
                inner.available.push_back(id);
                false
            }
        };

        if rejected {
            session.close().await;
            return Err(GrabberError::InvalidState("pool is shut down".to_string()));
        }

        self.shared.available_notify.notify_one();
        debug!(session_id = id, "session created");
        Ok(id)
    }

    /// Borrow a session, waiting up to `timeout` for one to become
    /// available. Returns `None` on timeout or when the pool is shut down —
    /// an expected outcome under load, not an error.
    ///
    /// The returned session has passed a liveness probe; a session failing
    /// its probe here is evicted and exactly one replacement attempt is made
    /// before giving up.
    pub async fn acquire(&self, timeout: Duration) -> Option<PooledSession<F>> {
        let deadline = Instant::now() + timeout;
        let mut failed_probes = 0u32;

        loop {
            if let Some(session) = self.try_checkout() {
                session.touch();
                if session.probe().await {
                    return Some(PooledSession::new(self.clone(), session));
                }

                self.evict(&session).await;
                failed_probes += 1;
                if failed_probes > 1 {
                    debug!("giving up acquisition after repeated probe failures");
                    return None;
                }
                continue;
            }

            if self.is_closed() {
                return None;
            }

            let remaining = deadline.checked_duration_since(Instant::now())?;
            if tokio::time::timeout(remaining, self.shared.available_notify.notified())
                .await
                .is_err()
            {
                debug!("no session became available within the acquire timeout");
                return None;
            }
        }
    }

    fn try_checkout(&self) -> Option<Arc<Session<F::Handle>>> {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
            return None;
        }
        while let Some(id) = inner.available.pop_front() {
            if let Some(session) = inner.sessions.get(&id).cloned() {
                inner.checked_out.insert(id);
                if !inner.available.is_empty() {
                    // more stock remains; pass the wakeup along
                    self.shared.available_notify.notify_one();
                }
                return Some(session);
            }
        }
        None
    }

    /// Hand a session back. Invoked by the guard on drop; a healthy session
    /// rejoins the FIFO queue, an unhealthy one stays out of circulation
    /// until the next sweep destroys it.
    pub(crate) fn release(&self, session: &Arc<Session<F::Handle>>) {
        let mut inner = self.shared.inner.lock();
        inner.checked_out.remove(&session.id());
        if inner.closed || !inner.sessions.contains_key(&session.id()) {
            return;
        }
        if session.is_healthy() {
            inner.available.push_back(session.id());
            drop(inner);
            self.shared.available_notify.notify_one();
        } else {
            debug!(
                session_id = session.id(),
                "unhealthy session held out of circulation until next sweep"
            );
        }
    }

    /// Remove a session from the pool and close its handle.
    async fn evict(&self, session: &Arc<Session<F::Handle>>) {
        let removed = {
            let mut inner = self.shared.inner.lock();
            inner.available.retain(|id| *id != session.id());
            inner.checked_out.remove(&session.id());
            inner.sessions.remove(&session.id()).is_some()
        };
        if removed {
            session.close().await;
            info!(
                session_id = session.id(),
                usage = session.usage_count(),
                errors = session.error_count(),
                "session evicted"
            );
        }
    }

    /// Probe every live session, evicting the ones that fail. A failing
    /// session currently held by a worker is only marked unhealthy; it is
    /// destroyed after it comes back. Ends with a replenishment pass.
    pub async fn health_check_all(&self) {
        let sessions: Vec<Arc<Session<F::Handle>>> =
            self.shared.inner.lock().sessions.values().cloned().collect();

        for session in sessions {
            if !session.probe().await {
                if self.is_checked_out(session.id()) {
                    debug!(
                        session_id = session.id(),
                        "probe failed on a held session; deferring eviction"
                    );
                    continue;
                }
                self.evict(&session).await;
            } else if !session.is_healthy() && !self.is_checked_out(session.id()) {
                // returned unhealthy since the last sweep
                self.evict(&session).await;
            }
        }

        self.replenish().await;
    }

    /// Evict sessions past their age, usage, or error budget, then
    /// replenish. Held sessions are marked and destroyed on a later sweep.
    pub async fn evict_aged(&self) {
        let sessions: Vec<Arc<Session<F::Handle>>> =
            self.shared.inner.lock().sessions.values().cloned().collect();

        for session in sessions {
            if !session.should_evict(&self.shared.config) {
                continue;
            }
            if self.is_checked_out(session.id()) {
                session.mark_unhealthy();
                debug!(
                    session_id = session.id(),
                    "expired session still held; deferring eviction"
                );
            } else {
                self.evict(&session).await;
            }
        }

        self.replenish().await;
    }

    /// Create sessions until the pool is back at capacity, tolerating
    /// partial factory failure (the next sweep retries).
    async fn replenish(&self) {
        loop {
            let deficit = {
                let inner = self.shared.inner.lock();
                if inner.closed {
                    return;
                }
                self.shared.config.capacity.saturating_sub(inner.sessions.len())
            };
            if deficit == 0 {
                return;
            }
            if let Err(e) = self.spawn_session().await {
                warn!(error = %e, "replenishment attempt failed");
                return;
            }
        }
    }

    /// Destroy every session and refuse further acquisitions. Sessions
    /// still checked out are force-closed; close-once on the session makes
    /// the race with a late-returning guard safe.
    pub async fn destroy_all(&self) {
        let sessions: Vec<Arc<Session<F::Handle>>> = {
            let mut inner = self.shared.inner.lock();
            inner.closed = true;
            inner.available.clear();
            inner.checked_out.clear();
            inner.sessions.drain().map(|(_, s)| s).collect()
        };

        let destroyed = sessions.len();
        for session in sessions {
            session.close().await;
        }

        // wake blocked acquirers so they observe the shutdown
        self.shared.available_notify.notify_waiters();
        info!(destroyed, "all sessions destroyed");
    }

    /// Read-only snapshot of the pool. Side-effect-free.
    pub fn stats(&self) -> PoolStats {
        let inner = self.shared.inner.lock();
        let mut sessions: Vec<SessionStats> = inner
            .sessions
            .values()
            .map(|s| SessionStats {
                id: s.id(),
                healthy: s.is_healthy(),
                usage_count: s.usage_count(),
                error_count: s.error_count(),
                age_secs: s.age().as_secs(),
            })
            .collect();
        sessions.sort_by_key(|s| s.id);

        PoolStats {
            capacity: self.shared.config.capacity,
            total_sessions: inner.sessions.len(),
            available_count: inner.available.len(),
            checked_out_count: inner.checked_out.len(),
            total_usage: sessions.iter().map(|s| s.usage_count).sum(),
            total_errors: sessions.iter().map(|s| s.error_count).sum(),
            sessions,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.inner.lock().closed
    }

    fn is_checked_out(&self, id: u64) -> bool {
        self.shared.inner.lock().checked_out.contains(&id)
    }
}

/// Point-in-time pool snapshot
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub total_sessions: usize,
    pub available_count: usize,
    pub checked_out_count: usize,
    pub total_usage: u64,
    pub total_errors: u64,
    pub sessions: Vec<SessionStats>,
}

/// Per-session counters within a [`PoolStats`] snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub id: u64,
    pub healthy: bool,
    pub usage_count: u64,
    pub error_count: u64,
    pub age_secs: u64,
}
