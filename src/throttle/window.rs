/// Sliding request window
///
/// Holds the timestamps of admitted requests inside a trailing duration.
/// Invariant: after every `admit`, no more than `capacity` timestamps are
/// younger than `window`.
use std::collections::VecDeque;
use tokio::time::{Duration, Instant};

/// Outcome of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was taken, the request may go out now
    Proceed,
    /// Window is full; the oldest entry leaves it after this long
    WaitFor(Duration),
}

#[derive(Debug)]
pub struct RateWindow {
    window: Duration,
    capacity: usize,
    timestamps: VecDeque<Instant>,
}

impl RateWindow {
    pub fn new(capacity: usize, window: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            window,
            capacity,
            timestamps: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Drop timestamps that have left the window
    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.timestamps.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Decide and record in one step
    pub fn admit(&mut self, now: Instant) -> Admission {
        self.prune(now);

        if self.timestamps.len() < self.capacity {
            self.timestamps.push_back(now);
            return Admission::Proceed;
        }

        match self.timestamps.front() {
            Some(oldest) => {
                let elapsed = now.saturating_duration_since(*oldest);
                Admission::WaitFor(self.window.saturating_sub(elapsed))
            }
            // capacity >= 1 so a full window always has a front entry
            None => Admission::Proceed,
        }
    }

    /// Requests currently counted against the window
    pub fn occupancy(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.timestamps.len()
    }
}
