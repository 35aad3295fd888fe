//! Request throttling shared by all workers
//!
//! `RateLimiter` owns a `RateWindow` and a throttling `Backoff`, each behind
//! its own mutex. Admission (prune, decide, record) happens under one lock
//! acquisition; the lock is never held across a suspension point.

pub mod backoff;
pub mod window;

pub use backoff::Backoff;
pub use window::{Admission, RateWindow};

use crate::config::RateLimitConfig;
use crate::logger::{self, LogTag};
use parking_lot::Mutex;
use tokio::time::{sleep, Duration, Instant};

pub struct RateLimiter {
    name: String,
    window: Mutex<RateWindow>,
    backoff: Mutex<Backoff>,
}

impl RateLimiter {
    pub fn new(
        name: &str,
        max_requests: usize,
        window: Duration,
        backoff_base: Duration,
        backoff_max: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            window: Mutex::new(RateWindow::new(max_requests, window)),
            backoff: Mutex::new(Backoff::new(backoff_base, backoff_max)),
        }
    }

    pub fn from_config(name: &str, config: &RateLimitConfig) -> Self {
        Self::new(
            name,
            config.max_requests_per_window,
            Duration::from_secs(config.window_secs),
            Duration::from_secs(config.error_delay_secs),
            Duration::from_secs(config.max_backoff_secs),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Single non-blocking admission attempt
    pub fn admit(&self) -> Admission {
        self.window.lock().admit(Instant::now())
    }

    /// Wait until the window admits a request; returns the time spent waiting
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        loop {
            match self.admit() {
                Admission::Proceed => return started.elapsed(),
                Admission::WaitFor(wait) => {
                    logger::debug(
                        LogTag::RateLimit,
                        &format!(
                            "[{}] Window full, waiting {:.1}s for a slot",
                            self.name,
                            wait.as_secs_f64()
                        ),
                    );
                    sleep(wait).await;
                }
            }
        }
    }

    /// Register a throttling error; returns the backoff delay to apply
    pub fn record_throttled(&self) -> Duration {
        let mut backoff = self.backoff.lock();
        let delay = backoff.next_delay();
        logger::warning(
            LogTag::RateLimit,
            &format!(
                "[{}] Rate limit hit (consecutive: {}), backing off {}s",
                self.name,
                backoff.consecutive(),
                delay.as_secs()
            ),
        );
        delay
    }

    /// A call went through; throttling backoff starts over
    pub fn record_success(&self) {
        self.backoff.lock().reset();
    }

    pub fn consecutive_throttles(&self) -> u32 {
        self.backoff.lock().consecutive()
    }

    pub fn occupancy(&self) -> usize {
        self.window.lock().occupancy(Instant::now())
    }
}
