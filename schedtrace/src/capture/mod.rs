//! Capture engine core
//!
//! Wires the producer entry points, the double-buffer swap coordinator, and
//! the session state machine around one shared context object:
//! - `handoff`: the one-token producer→consumer completion signal
//! - `swap`: two ring buffers with atomically exchanged active/export roles
//! - `producer`: the scheduler upcall path (non-blocking, drop-on-contention)
//! - `controller`: Disabled/Continuous/Snapshot lifecycle and hook
//!   registration
//!
//! [`CaptureEngine`] is the single-instance facade the command layer and the
//! host registration layer both talk to.

pub mod controller;
pub mod handoff;
pub mod producer;
pub mod swap;

pub use controller::{CaptureController, CaptureState, ControlOutcome, EXTENSION_NAME};
pub use producer::EventProducer;
pub use swap::{Append, SwapCoordinator};

use crate::clock::Clock;
use crate::domain::CaptureError;
use crate::host::{HookRegistry, SchedulerHooks};
use crate::ring::RingBuffer;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const MODE_DISABLED: u8 = 0;
pub(crate) const MODE_CONTINUOUS: u8 = 1;
pub(crate) const MODE_SNAPSHOT: u8 = 2;

/// State shared between the producer upcall path and the control surface.
///
/// The buffers inside the coordinator and the role index are the only shared
/// mutable capture state; everything else here is a handful of atomics.
pub(crate) struct Shared {
    pub(crate) coordinator: SwapCoordinator,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) mode: AtomicU8,
    pub(crate) remaining: AtomicU64,
    /// Raised by the producer when a snapshot completes; tells the
    /// controller a host-side deregistration is still owed.
    pub(crate) auto_completed: AtomicBool,
}

impl Shared {
    pub(crate) fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            coordinator: SwapCoordinator::new(capacity, Arc::clone(&clock)),
            clock,
            mode: AtomicU8::new(MODE_DISABLED),
            remaining: AtomicU64::new(0),
            auto_completed: AtomicBool::new(false),
        }
    }
}

/// The capture subsystem as one explicitly owned context object.
///
/// Created once at subsystem initialization and shared from there; the
/// process-wide mutable state lives inside, never in globals.
pub struct CaptureEngine {
    shared: Arc<Shared>,
    controller: CaptureController,
    producer: Arc<EventProducer>,
}

impl CaptureEngine {
    #[must_use]
    pub fn new(capacity: usize, clock: Arc<dyn Clock>, registry: Arc<dyn HookRegistry>) -> Self {
        let shared = Arc::new(Shared::new(capacity, clock));
        let producer = Arc::new(EventProducer::new(Arc::clone(&shared)));
        let controller =
            CaptureController::new(Arc::clone(&shared), Arc::clone(&producer), registry);
        Self { shared, controller, producer }
    }

    /// Start continuous capture. Idempotent.
    ///
    /// # Errors
    /// See [`CaptureController::enable`].
    pub fn enable(&self) -> Result<ControlOutcome, CaptureError> {
        self.controller.enable()
    }

    /// Arm a bounded snapshot of `count` events (0 = one full buffer).
    ///
    /// # Errors
    /// See [`CaptureController::snapshot`].
    pub fn snapshot(&self, count: u64) -> Result<ControlOutcome, CaptureError> {
        self.controller.snapshot(count)
    }

    /// Stop capture and remove the hooks. Idempotent.
    ///
    /// # Errors
    /// See [`CaptureController::disable`].
    pub fn disable(&self) -> Result<ControlOutcome, CaptureError> {
        self.controller.disable()
    }

    #[must_use]
    pub fn state(&self) -> CaptureState {
        self.controller.state()
    }

    /// Consumer side: request a swap and wait for the frozen buffer.
    ///
    /// # Errors
    /// `CaptureError::NotEnabled` while capture is disabled (use
    /// [`harvest_export`](Self::harvest_export) to pick up a completed
    /// snapshot); otherwise see [`SwapCoordinator::request_swap`].
    pub fn request_swap(&self, timeout: Duration) -> Result<RingBuffer, CaptureError> {
        if self.controller.state() == CaptureState::Disabled {
            return Err(CaptureError::NotEnabled);
        }
        self.shared.coordinator.request_swap(timeout)
    }

    /// Snapshot of the current export buffer, without waiting.
    #[must_use]
    pub fn harvest_export(&self) -> RingBuffer {
        self.shared.coordinator.harvest_export()
    }

    /// Clear the active buffer for a fresh window.
    pub fn reset(&self) {
        self.shared.coordinator.reset_active();
    }

    /// Events dropped on the producer path so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.coordinator.dropped()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.coordinator.capacity()
    }

    /// Tick rate of the engine clock, for export records.
    #[must_use]
    pub fn tick_rate(&self) -> u64 {
        self.shared.clock.tick_rate()
    }

    /// The producer as a hooks object, for hosts that are handed the
    /// callbacks out of band (tests, embedded setups).
    #[must_use]
    pub fn hooks(&self) -> Arc<dyn SchedulerHooks> {
        Arc::clone(&self.producer) as Arc<dyn SchedulerHooks>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::domain::{TaskContext, TaskId};
    use crate::host::SimScheduler;

    fn engine(capacity: usize) -> (CaptureEngine, Arc<SimScheduler>) {
        let clock = Arc::new(ManualClock::new()) as Arc<dyn Clock>;
        let host = Arc::new(SimScheduler::new());
        let registry = Arc::clone(&host) as Arc<dyn HookRegistry>;
        (CaptureEngine::new(capacity, clock, registry), host)
    }

    fn drive(engine: &CaptureEngine, count: u32) {
        let hooks = engine.hooks();
        for n in 0..count {
            hooks.on_switch(TaskId(n), TaskId(n + 1), TaskContext::ready(10));
        }
    }

    #[test]
    fn enable_is_idempotent() {
        let (engine, _host) = engine(8);
        assert!(matches!(engine.enable(), Ok(ControlOutcome::Enabled)));
        assert!(matches!(engine.enable(), Ok(ControlOutcome::AlreadyEnabled)));
        assert_eq!(engine.state(), CaptureState::Continuous);
    }

    #[test]
    fn disable_is_idempotent() {
        let (engine, _host) = engine(8);
        engine.enable().unwrap();
        assert!(matches!(engine.disable(), Ok(ControlOutcome::Disabled)));
        assert!(matches!(engine.disable(), Ok(ControlOutcome::AlreadyDisabled)));
        assert_eq!(engine.state(), CaptureState::Disabled);
    }

    #[test]
    fn enable_installs_hooks_under_a_fixed_name() {
        let (engine, host) = engine(8);
        engine.enable().unwrap();

        // The slot is taken: a second extension cannot install.
        let other = {
            let clock = Arc::new(ManualClock::new()) as Arc<dyn Clock>;
            CaptureEngine::new(8, clock, Arc::clone(&host) as Arc<dyn HookRegistry>)
        };
        assert!(matches!(other.enable(), Err(CaptureError::Registration(_))));

        engine.disable().unwrap();
        assert!(matches!(other.enable(), Ok(ControlOutcome::Enabled)));
    }

    #[test]
    fn re_enabling_starts_a_fresh_capture_window() {
        let (engine, _host) = engine(8);
        engine.enable().unwrap();
        drive(&engine, 3);
        engine.disable().unwrap();

        engine.enable().unwrap();
        engine.hooks().on_begin(TaskId(42), TaskContext::ready(1));
        engine.shared.coordinator.execute_swap();

        // Only the second session's event survives; nothing leaks across the
        // disable/enable boundary, including the task presence set.
        let frozen = engine.harvest_export();
        let subjects: Vec<u32> = frozen.iter().map(|e| e.subject().0).collect();
        assert_eq!(subjects, vec![42]);
        assert!(!frozen.tasks_seen().contains(TaskId(1)));
    }

    #[test]
    fn snapshot_rejects_counts_beyond_capacity() {
        let (engine, _host) = engine(8);
        match engine.snapshot(9) {
            Err(CaptureError::InvalidParameter { count: 9, capacity: 8 }) => {}
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
        assert_eq!(engine.state(), CaptureState::Disabled);
    }

    #[test]
    fn snapshot_quota_auto_disables_with_exact_export() {
        let (engine, host) = engine(16);
        assert!(matches!(engine.snapshot(5), Ok(ControlOutcome::SnapshotArmed { quota: 5 })));

        drive(&engine, 9);

        assert_eq!(engine.state(), CaptureState::Disabled);
        assert_eq!(engine.harvest_export().num_events(), 5);

        // Next control operation finalizes the host deregistration.
        assert!(matches!(engine.disable(), Ok(ControlOutcome::Disabled)));
        let hooks = engine.hooks();
        assert!(host.register("probe", hooks).is_ok());
    }

    #[test]
    fn snapshot_zero_fills_one_whole_buffer() {
        let (engine, _host) = engine(8);
        assert!(matches!(engine.snapshot(0), Ok(ControlOutcome::SnapshotArmed { quota: 8 })));
        assert_eq!(engine.state(), CaptureState::Snapshot { remaining: 8 });

        drive(&engine, 20);

        assert_eq!(engine.state(), CaptureState::Disabled);
        let export = engine.harvest_export();
        assert_eq!(export.num_events(), 8);
        assert!(export.is_full());
    }

    #[test]
    fn snapshot_while_running_is_a_no_op() {
        let (engine, _host) = engine(8);
        engine.enable().unwrap();
        assert!(matches!(engine.snapshot(4), Ok(ControlOutcome::AlreadyEnabled)));
        assert_eq!(engine.state(), CaptureState::Continuous);
    }

    #[test]
    fn request_swap_while_disabled_is_not_enabled() {
        let (engine, _host) = engine(8);
        assert!(matches!(
            engine.request_swap(Duration::from_millis(5)),
            Err(CaptureError::NotEnabled)
        ));
    }
}
