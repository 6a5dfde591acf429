//! Time sources that pace playback.

use std::{
    thread,
    time::{Duration, Instant},
};

/// Monotonic time source able to suspend the caller between ticks.
pub trait Clock {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Suspends until `duration` has elapsed.
    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock time backed by [`Instant`] and thread sleeps.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Starts a clock anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Deterministic clock that advances only when slept on.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualClock {
    elapsed: Duration,
}

impl ManualClock {
    /// Starts a clock at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
        }
    }

    /// Moves the clock forward without sleeping.
    pub fn advance(&mut self, duration: Duration) {
        self.elapsed = self.elapsed.saturating_add(duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.elapsed
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }
}
