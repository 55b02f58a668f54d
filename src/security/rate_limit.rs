//! Per-form, per-client sliding window rate limiting.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::observability::metrics;

/// Length of the trailing window. Not configurable.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Sliding window limiter keyed by `(form public id, client address)`.
///
/// Each key holds the timestamps of its admitted requests inside the trailing
/// window. Denied attempts are never recorded, so a client that hits the
/// limit regains access exactly one window after its oldest admitted request.
pub struct RateLimiter {
    windows: DashMap<(String, String), Vec<Instant>>,
    limit: AtomicUsize,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` requests per key per minute.
    pub fn new(limit: usize) -> Self {
        Self {
            windows: DashMap::new(),
            limit: AtomicUsize::new(limit),
            window: WINDOW,
        }
    }

    /// Decide whether a request for `form_key` from `client_key` at `now` is admitted.
    ///
    /// Prune, count and append happen under the entry's shard lock, so two
    /// concurrent requests for the same key cannot both slip past the limit.
    pub fn admit(&self, form_key: &str, client_key: &str, now: Instant) -> bool {
        let limit = self.limit.load(Ordering::Relaxed);
        let mut entry = self
            .windows
            .entry((form_key.to_string(), client_key.to_string()))
            .or_default();
        let stamps = entry.value_mut();

        stamps.retain(|t| now.saturating_duration_since(*t) < self.window);
        if stamps.len() > limit {
            // Limit was lowered by a reload; keep only the newest entries.
            let excess = stamps.len() - limit;
            stamps.drain(..excess);
        }

        if stamps.len() >= limit {
            return false;
        }
        stamps.push(now);
        true
    }

    /// Current per-window allowance.
    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    /// Apply a new allowance to subsequent `admit` calls.
    pub fn set_limit(&self, limit: usize) {
        let previous = self.limit.swap(limit, Ordering::Relaxed);
        if previous != limit {
            tracing::info!(previous, limit, "Rate limit updated");
        }
    }

    /// Forget every key.
    pub fn clear(&self) {
        self.windows.clear();
        metrics::record_rate_limit_keys(0);
    }

    /// Drop keys whose timestamps have all left the window. Returns how many were removed.
    pub fn prune_idle(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, stamps| {
            stamps.retain(|t| now.saturating_duration_since(*t) < self.window);
            !stamps.is_empty()
        });
        let after = self.windows.len();
        metrics::record_rate_limit_keys(after);
        before.saturating_sub(after)
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Periodically prune idle keys until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.prune_idle(Instant::now());
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.tracked_keys(), "Swept idle rate-limit keys");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate-limit sweeper stopping");
                    break;
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(10)
    }
}
