use crate::background::BackgroundTask;
use dashmap::DashMap;
use getset::CopyGetters;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Configuration for per-client rate limiting
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Requests allowed per fixed window once burst tokens are spent
    pub max_requests: u32,
    /// Length of the fixed window
    pub window: Duration,
    /// Tokens available at the start of every burst window
    pub burst_capacity: u32,
    /// Length of the burst window
    pub burst_window: Duration,
    /// How often expired clients are forgotten
    pub cleanup_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
            burst_capacity: 5,
            burst_window: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// Rate limiting state for a single client
#[derive(Debug, Clone, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct RateLimitEntry {
    count: u32,
    window_reset_at: Instant,
    burst_tokens: u32,
    burst_window_start_at: Instant,
}

impl RateLimitEntry {
    fn new(now: Instant, config: &RateLimitConfig) -> Self {
        Self {
            count: 0,
            window_reset_at: now + config.window,
            burst_tokens: config.burst_capacity,
            burst_window_start_at: now,
        }
    }

    /// Reset whichever windows have elapsed. The two windows are independent.
    fn roll_forward(&mut self, now: Instant, config: &RateLimitConfig) {
        if now >= self.window_reset_at {
            self.count = 0;
            self.window_reset_at = now + config.window;
        }
        if now.duration_since(self.burst_window_start_at) >= config.burst_window {
            self.burst_tokens = config.burst_capacity;
            self.burst_window_start_at = now;
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.window_reset_at
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl RateLimitDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_secs: None,
        }
    }

    fn deny(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            retry_after_secs: Some(retry_after_secs),
        }
    }
}

/// Per-client limiter combining a fixed window with a burst allowance.
///
/// Burst tokens are spent first, and every allowed request, burst or not,
/// counts against the fixed window.
pub struct RateLimiter {
    store: DashMap<String, RateLimitEntry>,
    config: RateLimitConfig,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            store: DashMap::new(),
            config,
        }
    }

    pub fn check_limit(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut entry = self
            .store
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry::new(now, &self.config));

        entry.roll_forward(now, &self.config);

        if entry.burst_tokens > 0 {
            entry.burst_tokens -= 1;
            entry.count += 1;
            return RateLimitDecision::allow();
        }

        if entry.count >= self.config.max_requests {
            let remaining = entry.window_reset_at.saturating_duration_since(now);
            let retry_after = (remaining.as_millis() as u64).div_ceil(1000);
            log::debug!("Rate limited {} for {}s", key, retry_after);
            return RateLimitDecision::deny(retry_after);
        }

        entry.count += 1;
        RateLimitDecision::allow()
    }

    /// Forget clients whose fixed window has expired. Returns how many were
    /// removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.store.len());
        if removed > 0 {
            log::debug!("Removed {} expired rate limit entries", removed);
        }
        removed
    }

    /// Snapshot of a client's state
    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.store.get(key).map(|entry| entry.value().clone())
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Start the periodic cleanup. The task ends once the limiter is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>) -> BackgroundTask {
        let limiter = Arc::downgrade(self);
        BackgroundTask::spawn_periodic(
            "rate-limit-cleanup",
            self.config.cleanup_interval,
            move || match limiter.upgrade() {
                Some(limiter) => {
                    limiter.cleanup();
                    true
                }
                None => false,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT: &str = "127.0.0.1";

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_window_then_deny() {
        let limiter = RateLimiter::default();

        for _ in 0..5 {
            assert!(limiter.check_limit(CLIENT).allowed);
        }
        let entry = limiter.entry(CLIENT).unwrap();
        assert_eq!(entry.burst_tokens(), 0);
        assert_eq!(entry.count(), 5);

        // Standing window covers requests six through ten.
        for expected in 6..=10 {
            assert!(limiter.check_limit(CLIENT).allowed);
            assert_eq!(limiter.entry(CLIENT).unwrap().count(), expected);
        }

        tokio::time::advance(Duration::from_millis(500)).await;
        let denied = limiter.check_limit(CLIENT);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_secs, Some(60));
        assert_eq!(limiter.entry(CLIENT).unwrap().count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_tracks_remaining_window() {
        let limiter = RateLimiter::default();
        for _ in 0..10 {
            limiter.check_limit(CLIENT);
        }

        tokio::time::advance(Duration::from_millis(5_200)).await;
        assert_eq!(limiter.check_limit(CLIENT).retry_after_secs, Some(55));

        tokio::time::advance(Duration::from_millis(4_000)).await;
        assert_eq!(limiter.check_limit(CLIENT).retry_after_secs, Some(51));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_refills_independently_of_window() {
        let limiter = RateLimiter::default();
        for _ in 0..10 {
            assert!(limiter.check_limit(CLIENT).allowed);
        }
        assert!(!limiter.check_limit(CLIENT).allowed);

        tokio::time::advance(Duration::from_secs(10)).await;

        // Burst tokens are back even though the fixed window is exhausted,
        // and spending them still counts against the window.
        for _ in 0..5 {
            assert!(limiter.check_limit(CLIENT).allowed);
        }
        let entry = limiter.entry(CLIENT).unwrap();
        assert_eq!(entry.burst_tokens(), 0);
        assert_eq!(entry.count(), 15);
        assert!(!limiter.check_limit(CLIENT).allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_count() {
        let limiter = RateLimiter::default();
        for _ in 0..10 {
            limiter.check_limit(CLIENT);
        }
        assert!(!limiter.check_limit(CLIENT).allowed);

        tokio::time::advance(Duration::from_secs(60)).await;

        assert!(limiter.check_limit(CLIENT).allowed);
        let entry = limiter.entry(CLIENT).unwrap();
        assert_eq!(entry.count(), 1);
        assert_eq!(entry.burst_tokens(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::default();
        for _ in 0..10 {
            limiter.check_limit("10.0.0.1");
        }
        assert!(!limiter.check_limit("10.0.0.1").allowed);
        assert!(limiter.check_limit("10.0.0.2").allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_removes_only_expired_entries() {
        let limiter = RateLimiter::default();
        limiter.check_limit("old");
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.check_limit("new");
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(limiter.cleanup(), 1);
        assert!(limiter.entry("old").is_none());
        assert!(limiter.entry("new").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_cleanup() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            cleanup_interval: Duration::from_secs(60),
            ..RateLimitConfig::default()
        }));
        let cleanup = limiter.spawn_cleanup();
        limiter.check_limit(CLIENT);
        assert_eq!(limiter.len(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(limiter.is_empty());

        cleanup.shutdown().await;
    }

    #[test]
    fn test_decision_serialization() {
        let denied = serde_json::to_value(RateLimitDecision::deny(42)).unwrap();
        assert_eq!(denied, serde_json::json!({"allowed": false, "retryAfterSecs": 42}));
        let allowed = serde_json::to_value(RateLimitDecision::allow()).unwrap();
        assert_eq!(allowed, serde_json::json!({"allowed": true}));
    }
}
