//! Shared mocks for pool and orchestrator integration tests.

#![allow(dead_code)] // not every test binary uses every helper

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use grabber_core::{
    GrabberError, Result, SessionFactory, SessionHandle, TaskExecutor, TaskOutcome,
};
use parking_lot::Mutex;

/// Handle whose liveness tests can flip and whose closes are counted.
pub struct MockHandle {
    alive: Arc<AtomicBool>,
    closes: Arc<AtomicU64>,
}

#[async_trait]
impl SessionHandle for MockHandle {
    async fn probe(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Factory with a scriptable failure point; keeps every created handle's
/// alive flag so tests can kill specific sessions. Clones share state, so
/// tests keep a control handle after the pool takes ownership of its copy.
#[derive(Clone)]
pub struct MockFactory {
    state: Arc<FactoryState>,
}

struct FactoryState {
    created: AtomicU64,
    fail_after: AtomicU64,
    alive_flags: Mutex<Vec<Arc<AtomicBool>>>,
    closes: Arc<AtomicU64>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::failing_after(u64::MAX)
    }

    pub fn failing_after(fail_after: u64) -> Self {
        Self {
            state: Arc::new(FactoryState {
                created: AtomicU64::new(0),
                fail_after: AtomicU64::new(fail_after),
                alive_flags: Mutex::new(Vec::new()),
                closes: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    /// Kill the nth created handle (0-based creation order).
    pub fn kill(&self, index: usize) {
        self.state.alive_flags.lock()[index].store(false, Ordering::Relaxed);
    }

    /// Refuse all further creations.
    pub fn fail_from_now_on(&self) {
        self.state.fail_after.store(0, Ordering::Relaxed);
    }

    pub fn created(&self) -> u64 {
        self.state.created.load(Ordering::Relaxed)
    }

    pub fn closes(&self) -> u64 {
        self.state.closes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    type Handle = MockHandle;

    async fn create(&self) -> Result<MockHandle> {
        let n = self.state.created.fetch_add(1, Ordering::Relaxed);
        if n >= self.state.fail_after.load(Ordering::Relaxed) {
            return Err(GrabberError::SessionError(
                "mock factory refused to create a session".to_string(),
            ));
        }
        let alive = Arc::new(AtomicBool::new(true));
        self.state.alive_flags.lock().push(alive.clone());
        Ok(MockHandle {
            alive,
            closes: self.state.closes.clone(),
        })
    }
}

/// Executor that plays back a script of outcomes, then NoOps forever.
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<Result<TaskOutcome>>>,
}

impl ScriptedExecutor {
    pub fn new(script: Vec<Result<TaskOutcome>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    type Handle = MockHandle;

    async fn run(&self, _handle: &MockHandle) -> Result<TaskOutcome> {
        self.script
            .lock()
            .pop_front()
            .unwrap_or(Ok(TaskOutcome::NoOp))
    }
}

/// Executor that NoOps until the nth call across all workers, which
/// succeeds.
pub struct SucceedAtCall {
    calls: AtomicU64,
    succeed_at: u64,
}

impl SucceedAtCall {
    pub fn new(succeed_at: u64) -> Self {
        Self {
            calls: AtomicU64::new(0),
            succeed_at,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TaskExecutor for SucceedAtCall {
    type Handle = MockHandle;

    async fn run(&self, _handle: &MockHandle) -> Result<TaskOutcome> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if call >= self.succeed_at {
            Ok(TaskOutcome::Success)
        } else {
            Ok(TaskOutcome::NoOp)
        }
    }
}
