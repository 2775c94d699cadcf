//! Sliding-window rate limiter: admits exactly `limit` calls per 60-second
//! window (spec §4.H, §8 boundary behavior).

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct SlidingWindowRateLimiter {
    limit: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self { limit, window, timestamps: Mutex::new(VecDeque::new()) }
    }

    pub fn per_minute(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Attempts to admit a call now. Returns `true` if admitted.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let mut ts = self.timestamps.lock();
        while let Some(&front) = ts.front() {
            if now.duration_since(front) > self.window {
                ts.pop_front();
            } else {
                break;
            }
        }
        if ts.len() >= self.limit {
            return false;
        }
        ts.push_back(now);
        true
    }

    pub fn current_count(&self) -> usize {
        self.timestamps.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_exactly_limit_calls_per_window() {
        let rl = SlidingWindowRateLimiter::new(3, Duration::from_secs(60));
        assert!(rl.try_acquire());
        assert!(rl.try_acquire());
        assert!(rl.try_acquire());
        assert!(!rl.try_acquire());
    }

    #[test]
    fn window_slides_and_readmits() {
        let rl = SlidingWindowRateLimiter::new(1, Duration::from_millis(20));
        let t0 = Instant::now();
        assert!(rl.try_acquire_at(t0));
        assert!(!rl.try_acquire_at(t0));
        assert!(rl.try_acquire_at(t0 + Duration::from_millis(25)));
    }
}
