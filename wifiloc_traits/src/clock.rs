use std::time::Instant;

/// Time source for the scan timer.
///
/// The timer computes each deadline from `now()`; swapping the clock lets
/// callers pace ticks against something other than the wall.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// `std::time::Instant`-backed clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}
