//! Newtype wrappers for scheduler-facing identifiers and timestamps.

use schedtrace_common::state_names;
use std::fmt;

/// A host scheduler task identifier.
///
/// Task ids are opaque 32-bit values assigned by the host; they are rendered
/// in hex because hosts typically encode an object class and index in them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Nanoseconds on the capture clock.
///
/// Values are monotonic within one process run; they are not wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Seconds as a float, for display only.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }
}

/// Bitset of scheduler wait/run conditions (`schedtrace_common::STATE_*`).
///
/// Zero means the task was ready to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateBits(pub u32);

impl StateBits {
    pub const READY: Self = Self(0);

    #[must_use]
    pub fn is_ready(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn contains(self, mask: u32) -> bool {
        self.0 & mask != 0
    }
}

impl fmt::Display for StateBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ready() {
            return f.write_str("READY");
        }
        for (i, name) in state_names(self.0).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Scheduler-visible state of the subject task at the moment of an upcall.
///
/// Passed by the host alongside every hook invocation; recorded verbatim into
/// the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskContext {
    /// Wait/run condition bits.
    pub state: StateBits,
    /// Effective priority (may reflect inheritance).
    pub priority_current: u8,
    /// Nominal assigned priority.
    pub priority_real: u8,
    /// Object the task is blocked on, or zero.
    pub wait_object: u32,
}

impl TaskContext {
    /// A ready-to-run task at the given priority.
    #[must_use]
    pub const fn ready(priority: u8) -> Self {
        Self {
            state: StateBits(0),
            priority_current: priority,
            priority_real: priority,
            wait_object: 0,
        }
    }

    /// A task blocked with the given condition bits on `wait_object`.
    #[must_use]
    pub const fn waiting(state: u32, wait_object: u32, priority: u8) -> Self {
        Self {
            state: StateBits(state),
            priority_current: priority,
            priority_real: priority,
            wait_object,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedtrace_common::{STATE_SUSPENDED, STATE_WAITING_FOR_SEMAPHORE};

    #[test]
    fn task_id_displays_as_hex() {
        assert_eq!(TaskId(0x0a01_0002).to_string(), "0x0a010002");
    }

    #[test]
    fn state_bits_display_ready_and_composed() {
        assert_eq!(StateBits::READY.to_string(), "READY");
        let bits = StateBits(STATE_SUSPENDED | STATE_WAITING_FOR_SEMAPHORE);
        assert_eq!(bits.to_string(), "SUSPENDED, WAITING FOR SEMAPHORE");
    }
}
