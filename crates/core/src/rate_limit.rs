//! Fixed-window rate limiting keyed by an identifier string
//!
//! Each identifier gets a counter and a window expiry. The first call (or
//! the first call after expiry) opens a fresh window; calls inside a live
//! window count up until the ceiling, after which they are refused.
//! Expired entries linger until [`RateLimiter::sweep`] is called.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Attempts allowed per window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub const fn new(max_attempts: u32, window_secs: u64) -> Self {
        Self {
            max_attempts,
            window_secs,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: HashMap<String, Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the call must be refused
    pub fn check(&mut self, identifier: &str, policy: RateLimitPolicy) -> bool {
        self.check_at(identifier, policy.max_attempts, policy.window(), Instant::now())
    }

    pub fn check_at(
        &mut self,
        identifier: &str,
        max_attempts: u32,
        window: Duration,
        now: Instant,
    ) -> bool {
        match self.windows.get_mut(identifier) {
            Some(record) if now <= record.expires_at => {
                if record.count >= max_attempts {
                    return true;
                }
                record.count += 1;
                false
            }
            _ => {
                self.windows.insert(
                    identifier.to_string(),
                    Window {
                        count: 1,
                        expires_at: now + window,
                    },
                );
                false
            }
        }
    }

    /// Drop every window that has expired; returns how many were removed
    pub fn sweep(&mut self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&mut self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| now <= w.expires_at);
        before - self.windows.len()
    }

    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_allows_up_to_max_then_refuses() {
        let mut limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(!limiter.check_at("login_a", 5, WINDOW, now));
        }
        assert!(limiter.check_at("login_a", 5, WINDOW, now));
        assert!(limiter.check_at("login_a", 5, WINDOW, now));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let mut limiter = RateLimiter::new();
        let now = Instant::now();

        assert!(!limiter.check_at("a", 1, WINDOW, now));
        assert!(limiter.check_at("a", 1, WINDOW, now));
        assert!(!limiter.check_at("b", 1, WINDOW, now));
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let mut limiter = RateLimiter::new();
        let start = Instant::now();

        assert!(!limiter.check_at("a", 1, WINDOW, start));
        assert!(limiter.check_at("a", 1, WINDOW, start + Duration::from_secs(30)));
        assert!(!limiter.check_at("a", 1, WINDOW, start + Duration::from_secs(61)));
    }

    #[test]
    fn test_refused_call_does_not_extend_window() {
        let mut limiter = RateLimiter::new();
        let start = Instant::now();

        assert!(!limiter.check_at("a", 1, WINDOW, start));
        // Hammering inside the window must not push the expiry out
        assert!(limiter.check_at("a", 1, WINDOW, start + Duration::from_secs(59)));
        assert!(!limiter.check_at("a", 1, WINDOW, start + Duration::from_secs(61)));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let mut limiter = RateLimiter::new();
        let start = Instant::now();

        limiter.check_at("old", 3, Duration::from_secs(10), start);
        limiter.check_at("fresh", 3, Duration::from_secs(100), start);

        assert_eq!(limiter.sweep_at(start + Duration::from_secs(20)), 1);
        assert_eq!(limiter.tracked(), 1);
    }
}
