use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::errors::AppError;

/// In-memory fixed-window rate limiter.
///
/// Keyed by `endpoint:caller`. First request (or first after the window
/// elapses) resets the count to 1 and starts a new window; further requests
/// increment the count and are denied once it exceeds the endpoint's limit.
///
/// Single-process only. Counts are lost on restart and are not shared across
/// instances — a known limitation, not something this limiter tries to fix.
pub struct RateLimiter {
    entries: DashMap<String, Entry>,
    window: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u32,
    window_end: Instant,
}

/// Above this many live keys, expired entries are swept on the next check.
const PRUNE_THRESHOLD: usize = 10_000;

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            window,
        }
    }

    /// Allow or deny a request from `caller` against `endpoint`'s limit.
    pub fn check(&self, endpoint: &str, caller: &str, max_requests: u32) -> Result<(), AppError> {
        self.check_at(endpoint, caller, max_requests, Instant::now())
    }

    fn check_at(
        &self,
        endpoint: &str,
        caller: &str,
        max_requests: u32,
        now: Instant,
    ) -> Result<(), AppError> {
        if self.entries.len() > PRUNE_THRESHOLD {
            self.entries.retain(|_, e| e.window_end > now);
        }

        let key = format!("{}:{}", endpoint, caller);
        let mut entry = self.entries.entry(key).or_insert(Entry {
            count: 0,
            window_end: now + self.window,
        });

        if now >= entry.window_end {
            entry.count = 1;
            entry.window_end = now + self.window;
            return Ok(());
        }

        entry.count += 1;
        if entry.count > max_requests {
            tracing::warn!(
                endpoint = endpoint,
                caller = caller,
                count = entry.count,
                limit = max_requests,
                "rate limit exceeded"
            );
            return Err(AppError::RateLimitExceeded);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_secs(60))
    }

    #[test]
    fn test_allows_up_to_limit() {
        let rl = limiter();
        let now = Instant::now();
        for _ in 0..10 {
            assert!(rl.check_at("generate", "1.2.3.4", 10, now).is_ok());
        }
    }

    #[test]
    fn test_denies_request_over_limit() {
        let rl = limiter();
        let now = Instant::now();
        for _ in 0..10 {
            rl.check_at("generate", "1.2.3.4", 10, now).unwrap();
        }
        assert!(matches!(
            rl.check_at("generate", "1.2.3.4", 10, now),
            Err(AppError::RateLimitExceeded)
        ));
    }

    #[test]
    fn test_window_reset_clears_count() {
        let rl = limiter();
        let now = Instant::now();
        for _ in 0..10 {
            rl.check_at("generate", "1.2.3.4", 10, now).unwrap();
        }
        // Exactly at the window boundary the count resets.
        let later = now + Duration::from_secs(60);
        assert!(rl.check_at("generate", "1.2.3.4", 10, later).is_ok());
        // And the fresh window starts from 1, so 9 more pass.
        for _ in 0..9 {
            assert!(rl.check_at("generate", "1.2.3.4", 10, later).is_ok());
        }
        assert!(rl.check_at("generate", "1.2.3.4", 10, later).is_err());
    }

    #[test]
    fn test_callers_are_independent() {
        let rl = limiter();
        let now = Instant::now();
        for _ in 0..10 {
            rl.check_at("generate", "1.2.3.4", 10, now).unwrap();
        }
        assert!(rl.check_at("generate", "5.6.7.8", 10, now).is_ok());
    }

    #[test]
    fn test_endpoints_are_independent() {
        let rl = limiter();
        let now = Instant::now();
        for _ in 0..10 {
            rl.check_at("generate", "1.2.3.4", 10, now).unwrap();
        }
        // Same caller, different endpoint and threshold.
        assert!(rl.check_at("tracker", "1.2.3.4", 20, now).is_ok());
    }
}
