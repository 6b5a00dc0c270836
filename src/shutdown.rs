//! Graceful shutdown coordination for the replay binary.
//!
//! A [`ShutdownSignal`] fires on SIGINT/SIGTERM (or a manual trigger) and
//! carries the time budget the process grants pending analytics sends before
//! it exits.
//!
//! # Example
//!
//! ```rust,ignore
//! use advred_analytics::shutdown::ShutdownSignal;
//!
//! let shutdown = ShutdownSignal::new();
//! tokio::select! {
//!     _ = shutdown.wait() => {}
//!     _ = replay(&registry) => {}
//! }
//! registry.disable_all();
//! tokio::time::timeout(shutdown.timeout(), adapter.settle()).await.ok();
//! ```

use crate::DEFAULT_SEND_TIMEOUT;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// A signal for coordinating graceful shutdown.
#[derive(Clone)]
pub struct ShutdownSignal {
    /// Broadcast sender for shutdown notification
    sender: broadcast::Sender<()>,
    /// How long pending sends may take once shutdown starts
    timeout: Duration,
}

impl ShutdownSignal {
    /// Create a signal whose grace period equals the default send timeout,
    /// so a send started just before shutdown can still finish.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_SEND_TIMEOUT)
    }

    /// Create a new shutdown signal with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender, timeout }
    }

    /// Get the shutdown timeout duration.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for SIGINT or SIGTERM, or a manual [`trigger`](Self::trigger),
    /// then notify all subscribers.
    ///
    /// If a signal handler cannot be installed, that source is skipped and
    /// the others are still honored.
    pub async fn wait(&self) {
        let mut manual = self.sender.subscribe();

        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            _ = manual.recv() => {
                return;
            }
        }

        // Notify all receivers
        let _ = self.sender.send(());
    }

    #[cfg(test)]
    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Trigger shutdown manually (for testing or programmatic shutdown).
    pub fn trigger(&self) {
        info!("Shutdown triggered programmatically");
        let _ = self.sender.send(());
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_signal_creation() {
        let signal = ShutdownSignal::new();
        assert_eq!(signal.timeout(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_custom_timeout() {
        let signal = ShutdownSignal::with_timeout(Duration::from_secs(60));
        assert_eq!(signal.timeout(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_manual_trigger_ends_wait() {
        let signal = ShutdownSignal::new();

        let trigger_signal = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger_signal.trigger();
        });

        let result = tokio::time::timeout(Duration::from_millis(500), signal.wait()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_clone_receives_signal() {
        let signal = ShutdownSignal::new();
        let signal2 = signal.clone();

        let mut receiver1 = signal.subscribe();
        let mut receiver2 = signal2.subscribe();

        signal.trigger();

        // Both should receive
        assert!(receiver1.recv().await.is_ok());
        assert!(receiver2.recv().await.is_ok());
    }
}
