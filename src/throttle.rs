//! Pacing between consecutive model calls of one job.

use std::time::Duration;
use tracing::debug;

/// Delay policy scaled by the number of credentials in rotation.
///
/// More keys means each key sees fewer calls, so the pause shrinks, but it
/// never drops below `floor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub base: Duration,
    pub floor: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(2000),
            floor: Duration::from_millis(500),
        }
    }
}

impl ThrottlePolicy {
    pub fn new(base: Duration, floor: Duration) -> Self {
        Self { base, floor }
    }

    /// `max(base / pool_size, floor)`; a zero-sized pool gets the full base delay.
    pub fn delay_for(&self, pool_size: usize) -> Duration {
        if pool_size == 0 {
            return self.base.max(self.floor);
        }
        let per_key = self.base / u32::try_from(pool_size).unwrap_or(u32::MAX);
        per_key.max(self.floor)
    }

    /// Bind the policy to a pool size for one job.
    pub fn scheduler(&self, pool_size: usize) -> Throttle {
        Throttle {
            delay: self.delay_for(pool_size),
        }
    }
}

/// Per-job pacing: the first unit runs immediately, every later one waits.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    /// A scheduler that never waits.
    pub fn disabled() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    /// The wait before unit `index`.
    pub fn delay_before(&self, index: usize) -> Duration {
        if index == 0 {
            Duration::ZERO
        } else {
            self.delay
        }
    }

    /// Sleep as required before running unit `index`.
    pub async fn pace(&self, index: usize) {
        let delay = self.delay_before(index);
        if !delay.is_zero() {
            debug!("Waiting {:.2}s before chunk {}", delay.as_secs_f64(), index + 1);
            tokio::time::sleep(delay).await;
        }
    }
}
