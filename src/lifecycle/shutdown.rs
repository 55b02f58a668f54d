//! Shutdown coordination.

use std::time::Duration;
use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Every long-running task (server, admin listener, rate-limit sweeper)
/// holds a receiver and stops when the signal fires.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Safe to call more than once.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Tasks still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wait until every subscriber has dropped its receiver or `grace` elapses.
    /// Returns `true` when all tasks finished in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + grace;
        while self.receiver_count() > 0 {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(remaining = self.receiver_count(), "Shutdown grace period elapsed");
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
