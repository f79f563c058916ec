//! Fixed-rate request throttle
//!
//! Every page fetch waits on [`RateLimiter::acquire`] before it is issued.
//! Grants are spaced at least `1 / rate` apart with no burst credit: an idle
//! limiter lets the next request through immediately, but never banks the
//! idle time for later.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Shared throttle admitting a fixed number of requests per second
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two grants
    interval: Duration,

    /// Earliest instant the next grant may happen
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `requests_per_second` requests per second
    ///
    /// A rate of zero is treated as one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        let rate = requests_per_second.max(1);
        Self::with_interval(Duration::from_secs(1) / rate)
    }

    /// Creates a limiter with an explicit spacing between requests
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Returns the spacing enforced between grants
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until one request may be issued
    ///
    /// Slots are reserved under the lock and waited for outside it, so
    /// concurrent callers queue up in arrival order without holding the
    /// lock while sleeping.
    pub async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            tracing::trace!("Rate limit: waiting {:?}", wait);
            tokio::time::sleep_until(slot).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_interval_from_rate() {
        assert_eq!(RateLimiter::new(4).interval(), Duration::from_millis(250));
        assert_eq!(RateLimiter::new(0).interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::with_interval(Duration::from_secs(10));
        let start = std::time::Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_acquires_are_spaced() {
        let limiter = RateLimiter::with_interval(Duration::from_millis(50));
        let start = std::time::Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        // First grant is immediate, the other four wait one interval each
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_concurrent_acquires_are_spaced() {
        let limiter = Arc::new(RateLimiter::with_interval(Duration::from_millis(40)));
        let start = std::time::Instant::now();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..6 {
            let limiter = Arc::clone(&limiter);
            tasks.spawn(async move { limiter.acquire().await });
        }
        while tasks.join_next().await.is_some() {}

        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_no_burst_credit_after_idle() {
        let limiter = RateLimiter::with_interval(Duration::from_millis(60));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let start = std::time::Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
