//! Minimum-interval request gate for the catalog provider
//!
//! One limiter instance is shared by every catalog call in the process, so
//! concurrent imports serialize against the same timing gate. Tests build
//! their own instances.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Serializes outbound requests to at most one per `min_interval`
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Sleep until the minimum interval since the previous request has
    /// elapsed, then claim the slot.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Catalog rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(100); // 100ms between requests

        let start = Instant::now();
        limiter.wait().await; // First request - immediate
        let first_elapsed = start.elapsed();

        limiter.wait().await; // Second request - should wait ~100ms
        let second_elapsed = start.elapsed();

        assert!(first_elapsed.as_millis() < 50);
        assert!(second_elapsed.as_millis() >= 100);
    }
}
