/// Exponential backoff for throttling errors
///
/// Delay doubles with every consecutive throttling error, starting at `base`
/// and capped at `max`; a success resets the sequence.
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    consecutive: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            consecutive: 0,
        }
    }

    /// Register one more throttling error and return the delay to wait
    pub fn next_delay(&mut self) -> Duration {
        self.consecutive = self.consecutive.saturating_add(1);
        self.delay_for(self.consecutive)
    }

    /// Delay the n-th consecutive throttling error gets (n >= 1)
    pub fn delay_for(&self, n: u32) -> Duration {
        let exponent = n.saturating_sub(1).min(31);
        self.base.saturating_mul(1u32 << exponent).min(self.max)
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}
