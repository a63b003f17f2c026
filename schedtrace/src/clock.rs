//! Timestamp sources for the capture engine.
//!
//! The producer stamps every event from inside the host's scheduler upcall,
//! so `now()` must be cheap and must never block. Timestamps are nanoseconds
//! on a clock that is monotonic within the process; the tick rate says how
//! many of those ticks fit in one second (always 10^9 for the monotonic
//! clock, but export records carry it explicitly so polling consumers never
//! have to assume).

use crate::domain::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Nanosecond resolution, as advertised in export records.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A monotonically increasing timestamp source callable from the producer.
pub trait Clock: Send + Sync {
    /// Current time. Strictly non-decreasing across calls.
    fn now(&self) -> Timestamp;

    /// Ticks per second of the values returned by `now()`.
    fn tick_rate(&self) -> u64;
}

/// Wall-run monotonic clock based on `Instant`.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now(&self) -> Timestamp {
        // u64 nanoseconds cover ~584 years of process uptime.
        Timestamp(self.origin.elapsed().as_nanos() as u64)
    }

    fn tick_rate(&self) -> u64 {
        NANOS_PER_SEC
    }
}

/// Deterministic clock for tests: advances only when told to.
pub struct ManualClock {
    ticks: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self { ticks: AtomicU64::new(0) }
    }

    /// Move the clock forward by `ticks` nanoseconds and return the new time.
    pub fn advance(&self, ticks: u64) -> Timestamp {
        Timestamp(self.ticks.fetch_add(ticks, Ordering::AcqRel) + ticks)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.ticks.load(Ordering::Acquire))
    }

    fn tick_rate(&self) -> u64 {
        NANOS_PER_SEC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert_eq!(clock.tick_rate(), NANOS_PER_SEC);
    }

    #[test]
    fn manual_clock_advances_on_demand() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Timestamp(0));
        assert_eq!(clock.advance(5), Timestamp(5));
        assert_eq!(clock.now(), Timestamp(5));
    }
}
