//! Rate limiter for token requests
//!
//! Failed `/token/` attempts are counted per username inside a sliding
//! window. Once a username reaches the limit, further attempts are refused
//! until old failures fall out of the window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

const DEFAULT_MAX_FAILURES: usize = 5;
const DEFAULT_WINDOW_MINUTES: i64 = 15;

/// Failed-login limiter keyed by lowercase username
pub struct LoginRateLimiter {
    failures: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
    max_failures: usize,
    window: Duration,
}

impl LoginRateLimiter {
    /// 5 failures per 15 minutes
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_FAILURES, Duration::minutes(DEFAULT_WINDOW_MINUTES))
    }

    pub fn with_limits(max_failures: usize, window: Duration) -> Self {
        Self {
            failures: RwLock::new(HashMap::new()),
            max_failures,
            window,
        }
    }

    /// True once the username has used up its failures in the current window
    pub async fn is_limited(&self, username: &str) -> bool {
        let mut failures = self.failures.write().await;
        let cutoff = Utc::now() - self.window;

        match failures.get_mut(&username.to_lowercase()) {
            Some(times) => {
                times.retain(|time| *time > cutoff);
                times.len() >= self.max_failures
            }
            None => false,
        }
    }

    pub async fn record_failure(&self, username: &str) {
        let mut failures = self.failures.write().await;
        failures
            .entry(username.to_lowercase())
            .or_default()
            .push(Utc::now());
    }

    /// Forget a username's failures after a successful login
    pub async fn clear(&self, username: &str) {
        self.failures.write().await.remove(&username.to_lowercase());
    }

    /// Drop expired entries. Called periodically from the server task.
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.window;
        let mut failures = self.failures.write().await;
        failures.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
    }

    #[cfg(test)]
    async fn tracked_usernames(&self) -> usize {
        self.failures.read().await.len()
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_username_rate_limit() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..4 {
            assert!(!limiter.is_limited("cook").await);
            limiter.record_failure("cook").await;
        }
        limiter.record_failure("cook").await;
        assert!(limiter.is_limited("cook").await);

        limiter.clear("cook").await;
        assert!(!limiter.is_limited("cook").await);
    }

    #[tokio::test]
    async fn test_case_insensitive_username() {
        let limiter = LoginRateLimiter::with_limits(3, Duration::minutes(15));

        limiter.record_failure("Cook").await;
        limiter.record_failure("cook").await;
        assert!(!limiter.is_limited("COOK").await);
        limiter.record_failure("COOK").await;
        assert!(limiter.is_limited("cook").await);
    }

    #[tokio::test]
    async fn test_failures_outside_window_expire() {
        let limiter = LoginRateLimiter::with_limits(1, Duration::milliseconds(20));

        limiter.record_failure("cook").await;
        assert!(limiter.is_limited("cook").await);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!limiter.is_limited("cook").await);

        limiter.cleanup().await;
        assert_eq!(limiter.tracked_usernames().await, 0);
    }

    #[tokio::test]
    async fn test_other_usernames_unaffected() {
        let limiter = LoginRateLimiter::with_limits(1, Duration::minutes(15));

        limiter.record_failure("cook").await;
        assert!(limiter.is_limited("cook").await);
        assert!(!limiter.is_limited("baker").await);
    }
}
