//! Process-wide request pacing.
//!
//! Every request waits until at least `min_delay` (plus optional jitter up to
//! `max_delay`) has passed since the previous one. netkeiba.com is treated as
//! a single origin, so one limiter is shared by all fetches.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Minimum-interval rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateLimiterState>>,
}

struct RateLimiterState {
    last_request: Option<Instant>,
    min_delay: Duration,
    max_delay: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `min_delay_secs` - Minimum delay between requests
    /// * `max_delay_secs` - Maximum delay between requests (jitter bound)
    pub fn new(min_delay_secs: f64, max_delay_secs: f64) -> Self {
        let min_delay = Duration::from_secs_f64(min_delay_secs.max(0.0));
        let max_delay = Duration::from_secs_f64(max_delay_secs.max(0.0)).max(min_delay);

        Self {
            state: Arc::new(Mutex::new(RateLimiterState {
                last_request: None,
                min_delay,
                max_delay,
            })),
        }
    }

    /// No pacing at all
    #[cfg(test)]
    pub fn unlimited() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Wait until the next request is allowed
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        let delay_range = state.max_delay - state.min_delay;
        let interval = state.min_delay + delay_range.mul_f64(rand_delay());

        if let Some(last) = state.last_request {
            let elapsed = last.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }

        // Lock is held across the sleep so concurrent callers queue up
        state.last_request = Some(Instant::now());
    }
}

/// Generate a pseudo-random delay factor (0.0 - 1.0)
fn rand_delay() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(5.0, 5.0);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_enforces_min_delay() {
        let limiter = RateLimiter::new(0.5, 0.5);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_stays_within_bounds() {
        let limiter = RateLimiter::new(0.5, 1.0);
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed <= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_unlimited_does_not_wait() {
        let limiter = RateLimiter::unlimited();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(200));
    }
}
