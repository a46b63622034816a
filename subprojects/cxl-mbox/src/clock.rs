//! Bounded-wait time source.
//!
//! Every wait in the transport is bounded and goes through this trait, so
//! tests can drive polling loops with a fake clock instead of wall time.

use std::time::{Duration, Instant};

/// Monotonic time plus blocking sleep.
pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// The process monotonic clock and real thread sleeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
