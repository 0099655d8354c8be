// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/bridge/rate_limit.rs
// Version: 1.0.0
//
// This file implements the per-source fixed window request limiter the
// bridge applies to incoming WebSocket connections. State is in memory only
// and resets on restart; it is a best-effort throttle.
//
// Tree Location:
// - src/bridge/rate_limit.rs (connection rate limiting)
// - Depends on: std, tokio, tracing

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

const LOG_TARGET: &str = "poolbridge::bridge::rate_limit";

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Requests seen from one source in the current window
#[derive(Debug, Clone, Copy)]
pub struct RateLimitWindow {
    pub started_at: Instant,
    pub count: u32,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, RateLimitWindow>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Count a request from `key` and report whether it is allowed
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.lock();
        match windows.get_mut(key) {
            Some(window) if now.saturating_duration_since(window.started_at) < self.config.window => {
                // Saturate so a flood cannot wrap the counter back under the limit
                window.count = window.count.saturating_add(1);
                let allowed = window.count <= self.config.max_requests;
                if !allowed {
                    debug!(target: LOG_TARGET, "Rejecting {} ({} requests in window)", key, window.count);
                }
                allowed
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    RateLimitWindow {
                        started_at: now,
                        count: 1,
                    },
                );
                self.config.max_requests >= 1
            }
        }
    }

    /// Drop every window that started a full window length ago
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let window = self.config.window;
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, w| now.saturating_duration_since(w.started_at) < window);
        before - windows.len()
    }

    /// Number of sources currently tracked
    pub fn tracked_sources(&self) -> usize {
        self.lock().len()
    }

    /// Run `sweep` every `interval` until the returned task is aborted
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = limiter.sweep();
                if evicted > 0 {
                    debug!(target: LOG_TARGET, "Evicted {} expired rate limit windows", evicted);
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimitWindow>> {
        // A panic while holding the lock leaves the map usable
        self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_rejects() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let now = Instant::now();
        let results: Vec<bool> = (0..101).map(|_| limiter.allow_at("1.2.3.4", now)).collect();
        assert!(results[..100].iter().all(|allowed| *allowed));
        assert!(!results[100]);
    }

    #[test]
    fn keeps_rejecting_until_window_rolls_over() {
        let limiter = RateLimiter::new(RateLimitConfig::new(3, 60));
        let start = Instant::now();
        for _ in 0..3 {
            assert!(limiter.allow_at("a", start));
        }
        for secs in [1, 30, 59] {
            assert!(!limiter.allow_at("a", start + Duration::from_secs(secs)));
        }
        assert!(limiter.allow_at("a", start + Duration::from_secs(60)));
        // Fresh window counts from one again
        assert!(limiter.allow_at("a", start + Duration::from_secs(61)));
        assert!(limiter.allow_at("a", start + Duration::from_secs(62)));
        assert!(!limiter.allow_at("a", start + Duration::from_secs(63)));
    }

    #[test]
    fn sources_are_independent() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, 60));
        let now = Instant::now();
        assert!(limiter.allow_at("a", now));
        assert!(!limiter.allow_at("a", now));
        assert!(limiter.allow_at("b", now));
    }

    #[test]
    fn sweep_evicts_only_expired_windows() {
        let limiter = RateLimiter::new(RateLimitConfig::new(10, 60));
        let start = Instant::now();
        limiter.allow_at("old", start);
        limiter.allow_at("new", start + Duration::from_secs(30));
        assert_eq!(limiter.sweep_at(start + Duration::from_secs(61)), 1);
        assert_eq!(limiter.tracked_sources(), 1);
    }

    #[test]
    fn zero_max_rejects_everything() {
        let limiter = RateLimiter::new(RateLimitConfig::new(0, 60));
        assert!(!limiter.allow("a"));
        assert!(!limiter.allow("a"));
    }
}
