//! # Shared Data Structures (capture engine ↔ polling consumers)
//!
//! Defines the raw, `#[repr(C)]` shapes and constants shared between the
//! capture engine and external record-oriented consumers that poll a frozen
//! buffer (the "export record" binding). Keeping these in a `no_std` crate
//! with a fixed memory layout lets a consumer on the other side of a process
//! or language boundary decode a harvested buffer without pulling in the
//! engine itself.
//!
//! ## Key Types
//!
//! - [`RawEvent`] - One captured scheduler transition, fixed 32-byte layout
//! - [`CaptureRecord`] - A complete frozen buffer copied out for polling
//! - `STATE_*` - Scheduler wait/run condition bit masks
//!
//! A task's execution state is a bitset of the `STATE_*` masks; a value of
//! zero means the task was ready to run. [`state_names`] decodes a bitset
//! into its human-readable condition names.

#![no_std]

// ============================================================================
// Capacity Constants
// ============================================================================

/// Capacity of one ring buffer, in events.
///
/// Once a buffer holds this many events, every further append overwrites the
/// oldest retained event. Chosen to keep a full [`CaptureRecord`] comfortably
/// copyable in one bounded operation.
pub const MAX_EVENTS: usize = 1024;

/// Number of task identifiers tracked in a buffer's presence bitmap.
///
/// Identifiers at or beyond this range are not lost silently: the record
/// carries a counter of such sightings instead (`untracked_tasks`).
pub const MAX_TRACKED_TASKS: usize = 256;

/// Words in the task presence bitmap (64 ids per word).
pub const TASK_BITMAP_WORDS: usize = MAX_TRACKED_TASKS / 64;

// ============================================================================
// Event Kind Constants
// ============================================================================

/// A context switch: `previous` was switched out, `task` switched in.
pub const EVENT_SWITCH: u32 = 1;

/// A task started executing for the first time.
pub const EVENT_BEGIN: u32 = 2;

/// A task exited.
pub const EVENT_EXIT: u32 = 3;

// ============================================================================
// Scheduler State Bits
// ============================================================================

/// Task exists but has never been started.
pub const STATE_DORMANT: u32 = 0x0000_0001;
/// Task is suspended.
pub const STATE_SUSPENDED: u32 = 0x0000_0002;
/// Task is in a transient scheduler state.
pub const STATE_TRANSIENT: u32 = 0x0000_0004;
/// Task is sleeping for an interval.
pub const STATE_DELAYING: u32 = 0x0000_0008;
/// Task is blocked until an absolute time.
pub const STATE_WAITING_FOR_TIME: u32 = 0x0000_0010;
/// Task is blocked on a buffer pool.
pub const STATE_WAITING_FOR_BUFFER: u32 = 0x0000_0020;
/// Task is blocked on a memory segment.
pub const STATE_WAITING_FOR_SEGMENT: u32 = 0x0000_0040;
/// Task is blocked on a message queue.
pub const STATE_WAITING_FOR_MESSAGE: u32 = 0x0000_0080;
/// Task is blocked on an event set.
pub const STATE_WAITING_FOR_EVENT: u32 = 0x0000_0100;
/// Task is blocked on a semaphore.
pub const STATE_WAITING_FOR_SEMAPHORE: u32 = 0x0000_0200;
/// Task is blocked on a mutex.
pub const STATE_WAITING_FOR_MUTEX: u32 = 0x0000_0400;
/// Task is blocked on a condition variable.
pub const STATE_WAITING_FOR_CONDVAR: u32 = 0x0000_0800;
/// Task is blocked joining another task at exit.
pub const STATE_WAITING_FOR_JOIN: u32 = 0x0000_1000;
/// Task is blocked on an RPC reply.
pub const STATE_WAITING_FOR_RPC_REPLY: u32 = 0x0000_2000;
/// Task is blocked until its rate-monotonic period.
pub const STATE_WAITING_FOR_PERIOD: u32 = 0x0000_4000;
/// Task is blocked on a signal.
pub const STATE_WAITING_FOR_SIGNAL: u32 = 0x0000_8000;
/// Task is blocked on a barrier.
pub const STATE_WAITING_FOR_BARRIER: u32 = 0x0001_0000;
/// Task is blocked on a reader/writer lock.
pub const STATE_WAITING_FOR_RW_LOCK: u32 = 0x0002_0000;

/// All state bits paired with their display names, in mask order.
pub const STATE_NAMES: [(u32, &str); 18] = [
    (STATE_DORMANT, "DORMANT"),
    (STATE_SUSPENDED, "SUSPENDED"),
    (STATE_TRANSIENT, "TRANSIENT"),
    (STATE_DELAYING, "DELAYING"),
    (STATE_WAITING_FOR_TIME, "WAITING FOR TIME"),
    (STATE_WAITING_FOR_BUFFER, "WAITING FOR BUFFER"),
    (STATE_WAITING_FOR_SEGMENT, "WAITING FOR SEGMENT"),
    (STATE_WAITING_FOR_MESSAGE, "WAITING FOR MESSAGE"),
    (STATE_WAITING_FOR_EVENT, "WAITING FOR EVENT"),
    (STATE_WAITING_FOR_SEMAPHORE, "WAITING FOR SEMAPHORE"),
    (STATE_WAITING_FOR_MUTEX, "WAITING FOR MUTEX"),
    (STATE_WAITING_FOR_CONDVAR, "WAITING FOR CONDITION VARIABLE"),
    (STATE_WAITING_FOR_JOIN, "WAITING FOR JOIN AT EXIT"),
    (STATE_WAITING_FOR_RPC_REPLY, "WAITING FOR RPC REPLY"),
    (STATE_WAITING_FOR_PERIOD, "WAITING FOR PERIOD"),
    (STATE_WAITING_FOR_SIGNAL, "WAITING FOR SIGNAL"),
    (STATE_WAITING_FOR_BARRIER, "WAITING FOR BARRIER"),
    (STATE_WAITING_FOR_RW_LOCK, "WAITING FOR RW LOCK"),
];

/// Iterate the display names of the conditions set in `state`.
///
/// Yields nothing for a ready task (`state == 0`); callers render that case
/// as `"READY"`.
pub fn state_names(state: u32) -> impl Iterator<Item = &'static str> {
    STATE_NAMES
        .iter()
        .filter(move |(mask, _)| state & mask != 0)
        .map(|&(_, name)| name)
}

// ============================================================================
// Raw Export Shapes
// ============================================================================

/// One captured scheduler transition in export layout.
///
/// **Memory Layout**: `#[repr(C)]`, 32 bytes, 8-byte aligned, so polling
/// consumers can decode the event array with plain offset arithmetic.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawEvent {
    /// Event kind (`EVENT_SWITCH`, `EVENT_BEGIN`, `EVENT_EXIT`).
    pub kind: u32,

    /// Bitset of `STATE_*` masks observed on the subject at capture time.
    ///
    /// Zero means the task was ready to run.
    pub state: u32,

    /// The subject task's identifier. For a switch this is the incoming task.
    pub task: u32,

    /// For `EVENT_SWITCH`: the task switched away from. Zero otherwise.
    pub previous: u32,

    /// Identifier of the object the subject is blocked on, or zero.
    pub wait_object: u32,

    /// Effective priority at capture time (may reflect inheritance).
    pub priority_current: u8,

    /// Nominal (assigned) priority.
    pub priority_real: u8,

    /// Padding for 8-byte alignment of `timestamp_ns`.
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 2],

    /// Timestamp in nanoseconds from the engine's monotonic clock.
    pub timestamp_ns: u64,
}

impl RawEvent {
    /// The all-zero event used to fill unoccupied slots.
    pub const ZERO: Self = Self {
        kind: 0,
        state: 0,
        task: 0,
        previous: 0,
        wait_object: 0,
        priority_current: 0,
        priority_real: 0,
        _padding: [0; 2],
        timestamp_ns: 0,
    };
}

/// A complete frozen buffer copied out for a polling consumer.
///
/// Field meanings mirror the ring buffer's public shape: `num_events` is the
/// monotonic append counter (may exceed [`MAX_EVENTS`]; the live slot count is
/// `min(num_events, MAX_EVENTS)`), `head` is the index of the logical oldest
/// retained event.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct CaptureRecord {
    /// Clock resolution of `timestamp_ns` values, in ticks per second.
    pub tick_rate: u64,

    /// Timestamp at which this capture window started.
    pub started_at_ns: u64,

    /// Monotonic count of events appended during the window.
    pub num_events: u64,

    /// Index of the oldest retained event in `events`.
    pub head: u32,

    /// Sightings of task ids beyond the tracked bitmap range.
    pub untracked_tasks: u32,

    /// Presence bitmap over task ids `0..MAX_TRACKED_TASKS`.
    pub tasks_seen: [u64; TASK_BITMAP_WORDS],

    /// The event slots. Slots at or beyond the live count are `RawEvent::ZERO`.
    pub events: [RawEvent; MAX_EVENTS],
}

impl CaptureRecord {
    /// An empty record with every field zeroed.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            tick_rate: 0,
            started_at_ns: 0,
            num_events: 0,
            head: 0,
            untracked_tasks: 0,
            tasks_seen: [0; TASK_BITMAP_WORDS],
            events: [RawEvent::ZERO; MAX_EVENTS],
        }
    }

    /// Number of live events in `events`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn live_events(&self) -> usize {
        if self.num_events as usize > MAX_EVENTS {
            MAX_EVENTS
        } else {
            self.num_events as usize
        }
    }
}

impl Default for CaptureRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}
