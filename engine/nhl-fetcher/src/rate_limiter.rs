//! Outbound rate limiting for the NHL API

use crate::config::RateLimitConfig;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Sliding-window limiter shared by every request the client makes
pub struct RateLimiter {
    requests: Mutex<Vec<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            max_requests: config.max_requests as usize,
            window: Duration::from_millis(config.window_ms),
        }
    }

    /// Record a request if the window has room; returns false when the budget is spent
    pub async fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.lock().await;

        // Remove old requests outside the window
        requests.retain(|&time| now.duration_since(time) < self.window);

        if requests.len() >= self.max_requests {
            return false;
        }

        requests.push(now);
        true
    }

    /// Requests still available in the current window
    pub async fn remaining(&self) -> usize {
        let now = Instant::now();
        let requests = self.requests.lock().await;
        let in_window = requests
            .iter()
            .filter(|&&time| now.duration_since(time) < self.window)
            .count();
        self.max_requests.saturating_sub(in_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_budget_exhausted_within_window() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            max_requests: 2,
            window_ms: 60_000,
        });

        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
        assert_eq!(limiter.remaining().await, 0);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            max_requests: 1,
            window_ms: 20,
        });

        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.try_acquire().await);
    }
}
