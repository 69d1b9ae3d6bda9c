//! Background health monitoring for the session pool.
//!
//! One sweep = probe every session, evict the expired, replenish toward
//! capacity. The loop runs on its own tokio task, sleeps the configured
//! interval between sweeps, and shuts down cooperatively.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{GrabberError, Result};
use crate::pool::SessionPool;
use crate::session::SessionFactory;

/// Periodic sweeper over a [`SessionPool`].
pub struct PoolMonitor<F: SessionFactory> {
    pool: SessionPool<F>,
    running: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl<F: SessionFactory> PoolMonitor<F> {
    pub fn new(pool: SessionPool<F>) -> Self {
        Self {
            pool,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            handle: parking_lot::Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawn the sweep loop. Errors if the monitor is already running.
    pub fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(GrabberError::InvalidState(
                "pool monitor is already running".to_string(),
            ));
        }

        let pool = self.pool.clone();
        let running = self.running.clone();
        let shutdown_notify = self.shutdown_notify.clone();
        let interval = self.pool.config().health_check_interval();

        let handle = tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "pool monitor started");

            while running.load(Ordering::Acquire) {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown_notify.notified() => {
                        debug!("pool monitor received shutdown");
                        break;
                    }
                }
                if !running.load(Ordering::Acquire) {
                    break;
                }

                pool.health_check_all().await;
                pool.evict_aged().await;
            }

            running.store(false, Ordering::Release);
            info!("pool monitor stopped");
        });

        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Request shutdown and wait up to `timeout` for the loop to exit.
    pub async fn stop(&self, timeout: Duration) -> Result<()> {
        if !self.running.load(Ordering::Acquire) {
            return Ok(());
        }

        self.running.store(false, Ordering::Release);
        self.shutdown_notify.notify_waiters();

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "pool monitor task ended abnormally"),
                Err(_) => {
                    warn!("pool monitor did not stop within timeout");
                    return Err(GrabberError::Timeout(
                        "pool monitor stop timeout exceeded".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
