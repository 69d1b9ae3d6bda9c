//! Scoped session acquisition.

use std::sync::Arc;

use tracing::debug;

use crate::pool::SessionPool;
use crate::session::{Session, SessionFactory};

/// RAII guard over a checked-out session.
///
/// Dropping the guard hands the session back to the pool on every exit
/// path — normal return, early `?`, panic unwind, or task abort — so a
/// worker cannot leak pool capacity by forgetting to release.
pub struct PooledSession<F: SessionFactory> {
    pool: SessionPool<F>,
    session: Arc<Session<F::Handle>>,
}

impl<F: SessionFactory> PooledSession<F> {
    pub(crate) fn new(pool: SessionPool<F>, session: Arc<Session<F::Handle>>) -> Self {
        Self { pool, session }
    }

    pub fn id(&self) -> u64 {
        self.session.id()
    }

    /// The underlying resource handle, for the task executor
    pub fn handle(&self) -> &F::Handle {
        self.session.handle()
    }

    pub fn session(&self) -> &Session<F::Handle> {
        &self.session
    }

    /// Record a task failure against the held session. The session stays
    /// usable until it saturates its error budget and a sweep evicts it.
    pub fn record_failure(&self) {
        let errors = self.session.record_error();
        debug!(
            session_id = self.session.id(),
            errors, "task failure recorded on session"
        );
    }
}

impl<F: SessionFactory> Drop for PooledSession<F> {
    fn drop(&mut self) {
        self.pool.release(&self.session);
    }
}
