//! Minimum-interval rate limiter.
//!
//! One budget per client instance: every request waits until at least
//! `min_interval` has passed since the previous request started. The
//! last-request timestamp is held under a mutex for the whole wait, so callers
//! sharing a client are serialized with respect to timing.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Build from a seconds value; negative or non-finite values disable limiting
    /// and values too large for a [`Duration`] saturate.
    pub fn from_secs_f64(seconds: f64) -> Self {
        let interval = if seconds.is_finite() && seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self::new(interval)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn is_enabled(&self) -> bool {
        !self.min_interval.is_zero()
    }

    /// Block until the next request may start, then record its start time.
    ///
    /// Returns how long the caller was held.
    pub fn acquire(&self) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }

        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let waited = match *last {
            Some(prev) => {
                let remaining = self.min_interval.saturating_sub(prev.elapsed());
                if !remaining.is_zero() {
                    std::thread::sleep(remaining);
                }
                remaining
            }
            None => Duration::ZERO,
        };

        *last = Some(Instant::now());
        waited
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_is_not_delayed() {
        let rl = RateLimiter::new(Duration::from_secs(5));
        assert_eq!(rl.acquire(), Duration::ZERO);
    }

    #[test]
    fn second_request_waits_out_the_interval() {
        let rl = RateLimiter::new(Duration::from_millis(40));
        rl.acquire();
        let start = Instant::now();
        rl.acquire();
        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn zero_interval_disables_limiting() {
        let rl = RateLimiter::from_secs_f64(0.0);
        assert!(!rl.is_enabled());
        rl.acquire();
        assert_eq!(rl.acquire(), Duration::ZERO);
    }

    #[test]
    fn negative_seconds_disable_limiting() {
        assert!(!RateLimiter::from_secs_f64(-1.0).is_enabled());
        assert!(!RateLimiter::from_secs_f64(f64::NAN).is_enabled());
    }

    #[test]
    fn huge_seconds_saturate_instead_of_panicking() {
        assert_eq!(RateLimiter::from_secs_f64(1e20).min_interval(), Duration::MAX);
    }

    #[test]
    fn default_is_six_hundred_millis() {
        assert_eq!(RateLimiter::default().min_interval(), Duration::from_millis(600));
    }
}
