//! # Buffer Swap Coordinator
//!
//! Owns the two ring buffers and the machinery that moves the "active" role
//! between them. The roles are indices into a fixed two-element array: the
//! producer appends into `buffers[active]`, the consumer reads the buffer a
//! completed handoff names as frozen. Swapping exchanges the indices, never
//! the buffers themselves, so exactly one owner per role holds at all times.
//!
//! The swap is *initiated* by the consumer (`request_swap`) but *executed* by
//! the producer (`execute_swap` from inside the next upcall): only the
//! producer's context is serialized with respect to other appends, so a
//! consumer-side swap would race an in-flight append. The consumer arms an
//! atomic flag and parks on the handoff with a bounded timeout; a timed-out
//! request leaves the flag armed and the producer still honors it.
//!
//! Producer-side locking is `try_lock` with a drop-and-count fallback. The
//! consumer holds a buffer lock only on the inactive/export buffer, which the
//! producer does not touch, so the hot path contends only with a concurrent
//! producer invocation (impossible under a serializing host, cheap to drop
//! under a non-serializing test harness).

use super::handoff::Handoff;
use crate::clock::Clock;
use crate::domain::CaptureError;
use crate::ring::{Event, RingBuffer};
use log::trace;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

/// Outcome of a producer append attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// The event was stored; `buffer_full` reports whether the active buffer
    /// has now reached capacity at least once.
    Stored { buffer_full: bool },
    /// The active buffer lock was contended; the event was dropped.
    Dropped,
}

pub struct SwapCoordinator {
    buffers: [Mutex<RingBuffer>; 2],
    /// Index of the buffer currently receiving appends. Written only from the
    /// producer path.
    active: AtomicUsize,
    /// Deferred swap request armed by the consumer, honored by the producer.
    swap_requested: AtomicBool,
    handoff: Handoff,
    /// Serializes consumers; the producer never touches this lock.
    consumer_gate: Mutex<()>,
    clock: Arc<dyn Clock>,
    dropped: AtomicU64,
}

impl SwapCoordinator {
    #[must_use]
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            buffers: [
                Mutex::new(RingBuffer::new(capacity, now)),
                Mutex::new(RingBuffer::new(capacity, now)),
            ],
            active: AtomicUsize::new(0),
            swap_requested: AtomicBool::new(false),
            handoff: Handoff::new(),
            consumer_gate: Mutex::new(()),
            clock: Arc::clone(&clock),
            dropped: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock_buffer(0).capacity()
    }

    fn active_index(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn lock_buffer(&self, index: usize) -> MutexGuard<'_, RingBuffer> {
        // A panic mid-append cannot leave a ring structurally invalid, so a
        // poisoned lock is recovered rather than propagated.
        self.buffers[index].lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a consumer has requested a swap the producer has not yet
    /// executed.
    pub fn swap_pending(&self) -> bool {
        self.swap_requested.load(Ordering::Acquire)
    }

    /// Exchange the active/export roles, clear any pending request, and post
    /// a handoff token naming the buffer this swap froze. Producer context
    /// only; must run before the in-flight event is appended so the frozen
    /// buffer ends exactly at the swap boundary.
    ///
    /// The frozen index travels in the token rather than being recomputed by
    /// the consumer: a second swap (a snapshot completing right behind the
    /// consumer's request) moves the roles again, but not the token.
    pub fn execute_swap(&self) {
        let frozen = self.active.fetch_xor(1, Ordering::AcqRel);
        self.swap_requested.store(false, Ordering::Release);
        self.handoff.signal(frozen);
        trace!("buffer roles swapped, active={}", self.active_index());
    }

    /// Append into the active buffer, marking the subject task id seen.
    /// Producer context only. Never blocks: lock contention drops the event.
    pub fn try_append(&self, event: Event) -> Append {
        let index = self.active_index();
        let mut guard = match self.buffers[index].try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return Append::Dropped;
            }
        };
        guard.note_task(event.subject());
        guard.append(event);
        Append::Stored { buffer_full: guard.is_full() }
    }

    /// Consumer side: ask the producer for a fresh, stable buffer and wait
    /// for the swap to complete.
    ///
    /// Prepares the inactive buffer (reset in place, ready to become active),
    /// arms the deferred-swap flag unless a previous request is still
    /// pending, and parks on the handoff for at most `timeout`. On success
    /// returns a stable snapshot of the buffer that was active at the moment
    /// of the request.
    ///
    /// # Errors
    /// `CaptureError::Timeout` if the producer did not run within `timeout`;
    /// the request stays armed and is honored on the next append.
    pub fn request_swap(&self, timeout: Duration) -> Result<RingBuffer, CaptureError> {
        let _gate = self.consumer_gate.lock().unwrap_or_else(PoisonError::into_inner);

        // A request that timed out earlier is still in flight: the next
        // buffer was already prepared, so do not re-arm and do not drain a
        // token that request may be about to produce.
        if !self.swap_requested.load(Ordering::Acquire) {
            self.handoff.drain();
            let inactive = 1 - self.active_index();
            self.lock_buffer(inactive).reset(self.clock.now());
            self.swap_requested.store(true, Ordering::Release);
        }

        let frozen = self.handoff.wait(timeout)?;
        Ok(self.lock_buffer(frozen).clone())
    }

    /// Snapshot of the current export buffer without waiting for a swap.
    /// Used to retrieve a snapshot capture that auto-completed.
    #[must_use]
    pub fn harvest_export(&self) -> RingBuffer {
        let export = 1 - self.active_index();
        self.lock_buffer(export).clone()
    }

    /// Reset the active buffer in place. Caller must guarantee the producer
    /// is quiesced (capture disabled).
    pub fn reset_active(&self) {
        let now = self.clock.now();
        self.lock_buffer(self.active_index()).reset(now);
    }

    /// Events dropped on the producer path due to lock contention.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Release consumer-visible handoff state (stale tokens, stale request).
    /// Called when a capture session ends.
    pub fn release(&self) {
        self.swap_requested.store(false, Ordering::Release);
        self.handoff.drain();
    }
}
