//! Graceful shutdown coordination for the discovery server.
//!
//! Session workers subscribe to the shutdown signal and register
//! themselves as active operations; shutdown waits for them to drain
//! within a grace period. Wiring an OS signal to the trigger is the
//! embedding process's job.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

/// Controller for coordinating graceful shutdown.
///
/// Provides mechanisms to:
/// - Subscribe to the shutdown signal
/// - Trigger shutdown programmatically
/// - Wait for in-flight sessions to drain, bounded by a grace period
#[derive(Debug, Clone)]
pub struct ShutdownController {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug)]
struct ShutdownInner {
    /// Whether shutdown has been initiated.
    initiated: AtomicBool,
    /// Sender for the shutdown signal.
    tx: watch::Sender<bool>,
    /// Receiver kept alive so the channel never closes.
    rx: watch::Receiver<bool>,
    /// Active operation counter.
    active_ops: AtomicUsize,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    /// Create a new shutdown controller.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            inner: Arc::new(ShutdownInner {
                initiated: AtomicBool::new(false),
                tx,
                rx,
                active_ops: AtomicUsize::new(0),
            }),
        }
    }

    /// Subscribe to shutdown notifications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.rx.clone()
    }

    /// Check if shutdown has been initiated.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.initiated.load(Ordering::SeqCst)
    }

    /// Initiate graceful shutdown.
    ///
    /// Sets the flag, notifies all subscribers, and waits up to the
    /// grace period for active operations to drain. Returns `true` if
    /// everything drained in time.
    pub async fn shutdown(&self, grace_period: Duration) -> bool {
        if self
            .inner
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Already initiated
            return true;
        }

        info!(grace_period = ?grace_period, "initiating graceful shutdown");

        let _ = self.inner.tx.send(true);

        match timeout(grace_period, self.wait_for_drain()).await {
            Ok(()) => {
                info!("graceful shutdown completed");
                true
            }
            Err(_) => {
                warn!(
                    remaining_ops = self.active_operations(),
                    "graceful shutdown timed out"
                );
                false
            }
        }
    }

    async fn wait_for_drain(&self) {
        loop {
            if self.active_operations() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Register an active operation.
    ///
    /// Returns a guard that decrements the counter when dropped.
    #[must_use]
    pub fn register_operation(&self) -> OperationGuard {
        self.inner.active_ops.fetch_add(1, Ordering::SeqCst);
        OperationGuard {
            controller: self.clone(),
        }
    }

    /// Get the number of active operations.
    #[must_use]
    pub fn active_operations(&self) -> usize {
        self.inner.active_ops.load(Ordering::SeqCst)
    }
}

/// Guard for tracking an active operation.
///
/// Decrements the active operation counter when dropped.
#[derive(Debug)]
pub struct OperationGuard {
    controller: ShutdownController,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.controller
            .inner
            .active_ops
            .fetch_sub(1, Ordering::SeqCst);
    }
}
