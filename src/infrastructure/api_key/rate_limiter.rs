//! Rate limiter implementation
//!
//! Fixed-window request throttling per (key, client) pair.
//!
//! This is a fixed-window counter, not a sliding log: a burst straddling a
//! window boundary can reach up to twice the nominal rate. Accepted
//! cost/accuracy trade-off; swapping in a sliding log or token bucket would
//! change observable throttling behavior.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::domain::api_key::RateLimitPolicy;

/// Result of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// Seconds until the current window expires
    pub retry_after_secs: u64,
}

/// Counter for one (key, client) pair
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    window_start: Instant,
}

/// Fixed-window rate limiter
///
/// Windows live in a concurrent map keyed by (token, client id); the entry
/// API makes the read-then-increment atomic per pair without a map-wide
/// lock, so unrelated pairs never contend. Expired windows are purged
/// opportunistically on every check; there is no background sweeper.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<(String, String), Window>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Check whether a request from `client_id` with `token` is allowed
    pub fn check(&self, token: &str, client_id: &str, policy: &RateLimitPolicy) -> RateDecision {
        self.check_at(token, client_id, policy, Instant::now())
    }

    fn check_at(
        &self,
        token: &str,
        client_id: &str,
        policy: &RateLimitPolicy,
        now: Instant,
    ) -> RateDecision {
        let period = Duration::from_secs(policy.period_secs);

        // Drop every expired window before evaluating, so a pair whose
        // window has lapsed starts over with a fresh one.
        self.windows
            .retain(|_, w| now.duration_since(w.window_start) < period);

        let mut window = self
            .windows
            .entry((token.to_string(), client_id.to_string()))
            .or_insert(Window {
                count: 0,
                window_start: now,
            });

        let retry_after = period
            .saturating_sub(now.duration_since(window.window_start))
            .as_secs();

        if window.count >= policy.max_requests {
            return RateDecision {
                allowed: false,
                remaining: 0,
                retry_after_secs: retry_after,
            };
        }

        window.count += 1;

        RateDecision {
            allowed: true,
            remaining: policy.max_requests - window.count,
            retry_after_secs: retry_after,
        }
    }

    /// Number of live windows (expired ones may linger until the next check)
    pub fn tracked_pairs(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_requests: u32, period_secs: u64) -> RateLimitPolicy {
        RateLimitPolicy::new(max_requests, period_secs)
    }

    #[test]
    fn test_first_request_allowed() {
        let limiter = RateLimiter::new();

        let decision = limiter.check("token-1", "client-a", &policy(10, 60));

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
    }

    #[test]
    fn test_denied_at_cap() {
        let limiter = RateLimiter::new();
        let policy = policy(3, 60);
        let now = Instant::now();

        for _ in 0..3 {
            let decision = limiter.check_at("token-1", "client-a", &policy, now);
            assert!(decision.allowed);
        }

        let decision = limiter.check_at("token-1", "client-a", &policy, now);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_denial_does_not_consume() {
        let limiter = RateLimiter::new();
        let policy = policy(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("token-1", "client-a", &policy, now).allowed);

        // Repeated refusals leave the counter untouched
        for _ in 0..5 {
            assert!(!limiter.check_at("token-1", "client-a", &policy, now).allowed);
        }
    }

    #[test]
    fn test_scoped_per_client() {
        let limiter = RateLimiter::new();
        let policy = policy(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("token-1", "client-a", &policy, now).allowed);
        assert!(!limiter.check_at("token-1", "client-a", &policy, now).allowed);

        // Client B shares the key but not the window
        assert!(limiter.check_at("token-1", "client-b", &policy, now).allowed);
    }

    #[test]
    fn test_scoped_per_key() {
        let limiter = RateLimiter::new();
        let policy = policy(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("token-1", "client-a", &policy, now).allowed);
        assert!(limiter.check_at("token-2", "client-a", &policy, now).allowed);
    }

    #[test]
    fn test_window_expiry_resets() {
        let limiter = RateLimiter::new();
        let policy = policy(2, 60);
        let start = Instant::now();

        assert!(limiter.check_at("token-1", "client-a", &policy, start).allowed);
        assert!(limiter.check_at("token-1", "client-a", &policy, start).allowed);
        assert!(!limiter.check_at("token-1", "client-a", &policy, start).allowed);

        // One second past the window: the old row is purged and a fresh
        // window starts with this request.
        let later = start + Duration::from_secs(61);
        let decision = limiter.check_at("token-1", "client-a", &policy, later);

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[test]
    fn test_expired_windows_purged_for_all_pairs() {
        let limiter = RateLimiter::new();
        let policy = policy(5, 60);
        let start = Instant::now();

        limiter.check_at("token-1", "client-a", &policy, start);
        limiter.check_at("token-2", "client-b", &policy, start);
        assert_eq!(limiter.tracked_pairs(), 2);

        let later = start + Duration::from_secs(120);
        limiter.check_at("token-3", "client-c", &policy, later);

        // Only the fresh window survives the purge
        assert_eq!(limiter.tracked_pairs(), 1);
    }

    #[test]
    fn test_retry_after_counts_down() {
        let limiter = RateLimiter::new();
        let policy = policy(1, 60);
        let start = Instant::now();

        limiter.check_at("token-1", "client-a", &policy, start);

        let denied = limiter.check_at(
            "token-1",
            "client-a",
            &policy,
            start + Duration::from_secs(20),
        );

        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_secs, 40);
    }
}
