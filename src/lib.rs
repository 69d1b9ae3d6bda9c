#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Grabber Core
//!
//! Session pool and concurrent worker orchestration core for acquiring a
//! scarce, intermittently-available remote resource.
//!
//! ## Overview
//!
//! Client sessions against the remote target are expensive to create, age
//! out, and fail silently. This crate keeps a fixed-size pool of them
//! healthy — probing, evicting, and replacing in the background — while a
//! fleet of workers borrows sessions to run an opaque check-and-attempt
//! task, reporting outcomes to a single aggregator that can halt the whole
//! fleet on the first success.
//!
//! What a session *does* is not this crate's business: callers supply a
//! [`SessionFactory`], a [`SessionHandle`] with probe/close capabilities,
//! and a [`TaskExecutor`] returning a tri-state [`TaskOutcome`].
//!
//! ## Module Organization
//!
//! - [`session`] - Session lifecycle and the factory/handle seams
//! - [`pool`] - Fixed-capacity pool, RAII acquisition guard, health monitor
//! - [`executor`] - The external task seam
//! - [`worker`] - Worker loops, result aggregation, orchestrator lifecycle
//! - [`config`] - Immutable construction-time parameters
//! - [`error`] - Structured error handling
//! - [`logging`] - Console tracing setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use grabber_core::{
//!     OrchestratorConfig, PoolConfig, SessionPool, WorkerOrchestrator,
//! };
//! # use grabber_core::{Result, SessionFactory, SessionHandle, TaskExecutor, TaskOutcome};
//! # use async_trait::async_trait;
//! # struct Browser;
//! # #[async_trait]
//! # impl SessionHandle for Browser {
//! #     async fn probe(&self) -> bool { true }
//! #     async fn close(&self) {}
//! # }
//! # struct BrowserFactory;
//! # #[async_trait]
//! # impl SessionFactory for BrowserFactory {
//! #     type Handle = Browser;
//! #     async fn create(&self) -> Result<Browser> { Ok(Browser) }
//! # }
//! # struct CheckoutTask;
//! # #[async_trait]
//! # impl TaskExecutor for CheckoutTask {
//! #     type Handle = Browser;
//! #     async fn run(&self, _h: &Browser) -> Result<TaskOutcome> { Ok(TaskOutcome::NoOp) }
//! # }
//! # tokio_test::block_on(async {
//! let pool = SessionPool::new(BrowserFactory, PoolConfig::default()).await.unwrap();
//! let orchestrator = WorkerOrchestrator::new(
//!     pool,
//!     Arc::new(CheckoutTask),
//!     OrchestratorConfig::default(),
//! )
//! .unwrap();
//!
//! orchestrator.start().unwrap();
//! orchestrator.wait_for_stop().await;
//! orchestrator.stop_all().await.unwrap();
//! # });
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pool;
pub mod session;
pub mod worker;

pub use config::{OrchestratorConfig, PoolConfig, WorkerConfig};
pub use error::{GrabberError, Result};
pub use executor::{TaskExecutor, TaskOutcome};
pub use logging::init_logging;
pub use pool::{PoolMonitor, PoolStats, PooledSession, SessionPool, SessionStats};
pub use session::{Session, SessionFactory, SessionHandle, SessionHealth};
pub use worker::{
    AggregateTotals, ResultObserver, TotalsSnapshot, WorkOutcome, WorkResult, WorkerOrchestrator,
};
