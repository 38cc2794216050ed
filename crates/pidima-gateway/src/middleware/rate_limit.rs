//! In-process fixed-window rate limiter keyed by admission identity.

use async_trait::async_trait;
use dashmap::DashMap;
use pidima_kernel::gateway::{RateLimitConfig, RateLimiter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Window state per identity key
struct WindowState {
    /// Requests counted in the current window
    count: u64,
    /// Start of the current window
    window_start: Instant,
}

/// Fixed-window limiter: each identity key gets `max_requests` per `window`.
///
/// When the window expires the counter resets. Keys are whatever
/// `IdentityResolver` produced, so authenticated callers are bucketed by
/// subject and anonymous ones by network address.
#[derive(Clone)]
pub struct FixedWindowLimiter {
    clients: Arc<DashMap<String, WindowState>>,
    max_requests: u64,
    window: Duration,
}

impl FixedWindowLimiter {
    /// * `max_requests` - allowed requests per window
    /// * `window`       - window duration
    pub fn new(max_requests: u64, window: Duration) -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Return `true` if a request under `identity_key` is allowed at `now`.
    pub fn check_at(&self, identity_key: &str, now: Instant) -> bool {
        let mut entry = self
            .clients
            .entry(identity_key.to_string())
            .or_insert_with(|| WindowState {
                count: 0,
                window_start: now,
            });

        if now.saturating_duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            true
        } else {
            false
        }
    }

    /// Remove stale entries to keep memory usage bounded.
    ///
    /// Called periodically from a background task.
    pub fn gc(&self) {
        let now = Instant::now();
        self.clients.retain(|_, state| {
            now.saturating_duration_since(state.window_start) < self.window * 2
        });
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of identity keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.clients.len()
    }
}

impl std::fmt::Debug for FixedWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .field("tracked", &self.clients.len())
            .finish()
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    fn name(&self) -> &str {
        "fixed-window"
    }

    async fn check(&self, identity_key: &str) -> bool {
        self.check_at(identity_key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_max_requests() {
        let rl = FixedWindowLimiter::new(3, Duration::from_secs(60));
        assert!(rl.check("subject:alice").await);
        assert!(rl.check("subject:alice").await);
        assert!(rl.check("subject:alice").await);
        assert!(!rl.check("subject:alice").await); // 4th request denied
    }

    #[tokio::test]
    async fn different_keys_are_independent() {
        let rl = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert!(rl.check("10.0.0.1").await);
        assert!(!rl.check("10.0.0.1").await);
        assert!(rl.check("subject:alice").await);
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let rl = FixedWindowLimiter::new(1, Duration::from_secs(1));
        let start = Instant::now();
        assert!(rl.check_at("anonymous", start));
        assert!(!rl.check_at("anonymous", start + Duration::from_millis(500)));
        assert!(rl.check_at("anonymous", start + Duration::from_secs(1)));
    }

    #[test]
    fn gc_keeps_fresh_entries() {
        let rl = FixedWindowLimiter::from_config(&RateLimitConfig::new(5, 60));
        assert!(rl.check_at("a", Instant::now()));
        rl.gc();
        assert_eq!(rl.tracked(), 1);
    }
}
