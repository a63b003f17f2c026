//! # Capture Controller
//!
//! State machine governing the capture session: `Disabled`, `Continuous`, or
//! `Snapshot(remaining)`. Owns the producer's registration with the host
//! scheduler and maps host outcomes into the engine's error taxonomy.
//!
//! One wrinkle: a snapshot completes inside the producer's context, which
//! must not call back into the host registry. The producer therefore only
//! flips the shared mode to disabled and raises a completion flag; the
//! controller finalizes the host-side deregistration lazily, at the start of
//! its next public operation.

use super::producer::EventProducer;
use super::{Shared, MODE_CONTINUOUS, MODE_DISABLED, MODE_SNAPSHOT};
use crate::domain::CaptureError;
use crate::host::{HookRegistry, SchedulerHooks};
use log::{debug, info, warn};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

/// Name under which the producer hooks are installed with the host.
pub const EXTENSION_NAME: &str = "schedtrace";

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Disabled,
    Continuous,
    Snapshot { remaining: u64 },
}

/// Non-error outcomes of the control operations. "Already in the requested
/// state" is informational, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Enabled,
    AlreadyEnabled,
    SnapshotArmed { quota: u64 },
    Disabled,
    AlreadyDisabled,
}

pub struct CaptureController {
    shared: Arc<Shared>,
    producer: Arc<EventProducer>,
    registry: Arc<dyn HookRegistry>,
    /// Whether our hooks are currently installed with the host.
    registered: Mutex<bool>,
}

impl CaptureController {
    pub(crate) fn new(
        shared: Arc<Shared>,
        producer: Arc<EventProducer>,
        registry: Arc<dyn HookRegistry>,
    ) -> Self {
        Self { shared, producer, registry, registered: Mutex::new(false) }
    }

    /// `Disabled → Continuous`. Re-enabling is an idempotent no-op.
    ///
    /// # Errors
    /// `CaptureError::Registration` if the host refuses the hook install.
    pub fn enable(&self) -> Result<ControlOutcome, CaptureError> {
        self.reconcile();
        if self.shared.mode.load(Ordering::Acquire) != MODE_DISABLED {
            return Ok(ControlOutcome::AlreadyEnabled);
        }

        // The producer is quiesced while disabled, so the active buffer can
        // be reset in place: every session starts a fresh capture window.
        self.shared.coordinator.reset_active();
        self.register_hooks()?;
        self.shared.mode.store(MODE_CONTINUOUS, Ordering::Release);
        info!("capture enabled (continuous)");
        Ok(ControlOutcome::Enabled)
    }

    /// `Disabled → Snapshot(n)`. `count == 0` means fill one whole buffer.
    /// A session already running rejects the request as a no-op.
    ///
    /// # Errors
    /// `CaptureError::InvalidParameter` if `count` exceeds the buffer
    /// capacity; `CaptureError::Registration` if the host refuses the hooks.
    pub fn snapshot(&self, count: u64) -> Result<ControlOutcome, CaptureError> {
        self.reconcile();
        let capacity = self.shared.coordinator.capacity() as u64;
        if count > capacity {
            return Err(CaptureError::InvalidParameter { count, capacity });
        }
        if self.shared.mode.load(Ordering::Acquire) != MODE_DISABLED {
            return Ok(ControlOutcome::AlreadyEnabled);
        }
        let quota = if count == 0 { capacity } else { count };

        // The producer is quiesced while disabled, so the active buffer can
        // be reset in place before the hooks go live.
        self.shared.coordinator.reset_active();
        self.shared.remaining.store(quota, Ordering::Release);
        self.register_hooks()?;
        self.shared.mode.store(MODE_SNAPSHOT, Ordering::Release);
        info!("snapshot armed for {quota} events");
        Ok(ControlOutcome::SnapshotArmed { quota })
    }

    /// `Continuous|Snapshot → Disabled`. Idempotent: disabling while already
    /// disabled reports an informational outcome, not an error.
    pub fn disable(&self) -> Result<ControlOutcome, CaptureError> {
        let was_completed = self.shared.auto_completed.swap(false, Ordering::AcqRel);
        let was_enabled = self.shared.mode.swap(MODE_DISABLED, Ordering::AcqRel) != MODE_DISABLED;
        let was_registered = self.deregister_hooks();
        self.shared.coordinator.release();

        if was_enabled || was_completed || was_registered {
            info!("capture disabled");
            Ok(ControlOutcome::Disabled)
        } else {
            debug!("disable requested while already disabled");
            Ok(ControlOutcome::AlreadyDisabled)
        }
    }

    pub fn state(&self) -> CaptureState {
        match self.shared.mode.load(Ordering::Acquire) {
            MODE_CONTINUOUS => CaptureState::Continuous,
            MODE_SNAPSHOT => {
                CaptureState::Snapshot { remaining: self.shared.remaining.load(Ordering::Acquire) }
            }
            _ => CaptureState::Disabled,
        }
    }

    /// Finalize a snapshot that completed in the producer's context: the
    /// mode is already disabled, only the host-side deregistration remains.
    fn reconcile(&self) {
        if self.shared.auto_completed.swap(false, Ordering::AcqRel) {
            debug!("finalizing auto-completed snapshot session");
            self.deregister_hooks();
            self.shared.coordinator.release();
        }
    }

    fn register_hooks(&self) -> Result<(), CaptureError> {
        let mut registered =
            self.registered.lock().unwrap_or_else(PoisonError::into_inner);
        if !*registered {
            let hooks = Arc::clone(&self.producer) as Arc<dyn SchedulerHooks>;
            self.registry.register(EXTENSION_NAME, hooks)?;
            *registered = true;
        }
        Ok(())
    }

    fn deregister_hooks(&self) -> bool {
        let mut registered =
            self.registered.lock().unwrap_or_else(PoisonError::into_inner);
        if !*registered {
            return false;
        }
        if let Err(err) = self.registry.deregister(EXTENSION_NAME) {
            warn!("host deregistration failed: {err}");
        }
        *registered = false;
        true
    }
}
