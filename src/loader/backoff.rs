use std::time::Duration;

/// Capped exponential backoff applied to scroll-triggered fetches after a
/// failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    /// Consecutive failures after which scroll triggers stop until an explicit retry.
    pub max_failures: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
            max_failures: 5,
        }
    }
}

impl Backoff {
    /// Delay to wait after the `failures`-th consecutive failure.
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let mut delay = self.base;
        for _ in 1..failures {
            delay = delay.saturating_mul(2);
            if delay >= self.max {
                return self.max;
            }
        }
        delay.min(self.max)
    }

    pub fn is_halted(&self, failures: u32) -> bool {
        self.max_failures > 0 && failures >= self.max_failures
    }
}
