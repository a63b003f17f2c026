//! # Fixed-Capacity Event Ring
//!
//! The store underneath the capture engine: a circular buffer of scheduler
//! events with overwrite-when-full semantics, plus the per-window metadata a
//! consumer needs to interpret it (monotonic append counter, oldest-slot
//! index, capture start time, and a bitmap of the task ids observed).
//!
//! `append` is the producer's hot path. It is O(1), never fails, and never
//! allocates: slot storage is reserved once at construction and `reset` only
//! clears it. Locking is the caller's concern — the swap coordinator wraps
//! each buffer in a mutex that the producer only ever `try_lock`s.

use crate::domain::{TaskContext, TaskId, Timestamp};
use schedtrace_common::{MAX_TRACKED_TASKS, TASK_BITMAP_WORDS};

/// Default ring capacity, in events.
pub const DEFAULT_CAPACITY: usize = schedtrace_common::MAX_EVENTS;

/// One captured scheduler transition. Immutable once appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Stamped by the producer at append time.
    pub timestamp: Timestamp,
    /// Scheduler-visible state of the subject at capture time.
    pub context: TaskContext,
    pub kind: EventKind,
}

/// What kind of transition the host reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `from` was switched out, `to` switched in. The subject is `to`.
    Switch { from: TaskId, to: TaskId },
    /// `task` started executing for the first time.
    Begin { task: TaskId },
    /// `task` exited.
    Exit { task: TaskId },
}

impl EventKind {
    /// The task this event is about (the incoming task for a switch).
    #[must_use]
    pub fn subject(self) -> TaskId {
        match self {
            Self::Switch { to, .. } => to,
            Self::Begin { task } | Self::Exit { task } => task,
        }
    }
}

impl Event {
    #[must_use]
    pub fn subject(&self) -> TaskId {
        self.kind.subject()
    }
}

/// Compact presence bitmap over the task ids observed in a capture window.
///
/// Ids at or beyond [`MAX_TRACKED_TASKS`] are not representable in the bitmap;
/// sightings of those bump `untracked` instead of being lost silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskSet {
    words: [u64; TASK_BITMAP_WORDS],
    untracked: u32,
}

impl TaskSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TaskId) {
        let idx = id.0 as usize;
        if idx < MAX_TRACKED_TASKS {
            self.words[idx / 64] |= 1 << (idx % 64);
        } else {
            self.untracked = self.untracked.saturating_add(1);
        }
    }

    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        let idx = id.0 as usize;
        idx < MAX_TRACKED_TASKS && self.words[idx / 64] & (1 << (idx % 64)) != 0
    }

    /// Number of distinct tracked ids present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Sightings of ids beyond the tracked range.
    #[must_use]
    pub fn untracked(&self) -> u32 {
        self.untracked
    }

    /// Raw bitmap words, for export records.
    #[must_use]
    pub fn words(&self) -> &[u64; TASK_BITMAP_WORDS] {
        &self.words
    }

    pub fn clear(&mut self) {
        self.words = [0; TASK_BITMAP_WORDS];
        self.untracked = 0;
    }
}

/// Fixed-capacity circular store of events plus capture-window metadata.
///
/// Invariant: `head` always indexes the logical oldest retained event. While
/// `num_events < capacity`, `head` stays 0 and slots fill in order; once the
/// ring is full every append overwrites the slot at `head` and advances it,
/// preserving "the most recent `capacity` events" at all times.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<Event>,
    capacity: usize,
    num_events: u64,
    head: usize,
    started_at: Timestamp,
    tasks_seen: TaskSet,
}

impl RingBuffer {
    /// Create an empty ring. All slot storage is reserved here; nothing on
    /// this buffer allocates afterwards.
    #[must_use]
    pub fn new(capacity: usize, started_at: Timestamp) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            num_events: 0,
            head: 0,
            started_at,
            tasks_seen: TaskSet::new(),
        }
    }

    /// Clear the ring for a new capture window starting at `now`.
    ///
    /// Must only be called on a buffer the producer is not appending to (the
    /// inactive buffer, or any buffer while capture is disabled).
    pub fn reset(&mut self, now: Timestamp) {
        self.slots.clear();
        self.num_events = 0;
        self.head = 0;
        self.started_at = now;
        self.tasks_seen.clear();
    }

    /// Append an event, overwriting the oldest one once full.
    ///
    /// O(1), infallible, allocation-free.
    #[allow(clippy::cast_possible_truncation)]
    pub fn append(&mut self, event: Event) {
        if (self.num_events as usize) < self.capacity {
            self.slots.push(event);
        } else {
            let slot = (self.num_events % self.capacity as u64) as usize;
            debug_assert_eq!(slot, self.head, "overwrite slot must be the oldest");
            self.slots[slot] = event;
            self.head = (self.head + 1) % self.capacity;
        }
        self.num_events += 1;
    }

    /// Mark a task id as observed in this window.
    pub fn note_task(&mut self, id: TaskId) {
        self.tasks_seen.insert(id);
    }

    /// Live events in chronological order, oldest first.
    ///
    /// Restartable: valid any number of times on a stable buffer.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        let len = self.len();
        self.slots[self.head..]
            .iter()
            .chain(self.slots[..self.head].iter())
            .take(len)
    }

    /// Number of live (retained) events: `min(num_events, capacity)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn len(&self) -> usize {
        if (self.num_events as usize) < self.capacity {
            self.num_events as usize
        } else {
            self.capacity
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_events == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.num_events >= self.capacity as u64
    }

    /// Monotonic append counter for this window; may exceed the capacity.
    #[must_use]
    pub fn num_events(&self) -> u64 {
        self.num_events
    }

    /// Index of the logical oldest retained event.
    #[must_use]
    pub fn head(&self) -> usize {
        self.head
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Time at which this capture window started.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    #[must_use]
    pub fn tasks_seen(&self) -> &TaskSet {
        &self.tasks_seen
    }

    /// Raw slot access by physical index, for export-record copies that
    /// preserve the head offset.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&Event> {
        self.slots.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(n: u64) -> Event {
        Event {
            timestamp: Timestamp(n),
            context: TaskContext::ready(100),
            kind: EventKind::Begin { task: TaskId(u32::try_from(n).unwrap()) },
        }
    }

    fn stamps(buf: &RingBuffer) -> Vec<u64> {
        buf.iter().map(|e| e.timestamp.0).collect()
    }

    #[test]
    fn appends_below_capacity_iterate_in_order() {
        let mut buf = RingBuffer::new(8, Timestamp(0));
        for n in 0..5 {
            buf.append(ev(n));
        }
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.num_events(), 5);
        assert_eq!(buf.head(), 0);
        assert_eq!(stamps(&buf), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn overwrite_keeps_last_capacity_events_in_order() {
        let mut buf = RingBuffer::new(4, Timestamp(0));
        for n in 0..11 {
            buf.append(ev(n));
        }
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.num_events(), 11);
        assert_eq!(buf.head(), 11 % 4);
        assert_eq!(stamps(&buf), vec![7, 8, 9, 10]);
    }

    #[test]
    fn exactly_full_is_still_in_order() {
        let mut buf = RingBuffer::new(4, Timestamp(0));
        for n in 0..4 {
            buf.append(ev(n));
        }
        assert!(buf.is_full());
        assert_eq!(buf.head(), 0);
        assert_eq!(stamps(&buf), vec![0, 1, 2, 3]);
    }

    #[test]
    fn iter_is_restartable() {
        let mut buf = RingBuffer::new(4, Timestamp(0));
        for n in 0..7 {
            buf.append(ev(n));
        }
        assert_eq!(stamps(&buf), stamps(&buf));
    }

    #[test]
    fn reset_zeroes_counters_and_stamps_new_start() {
        let mut buf = RingBuffer::new(4, Timestamp(10));
        for n in 0..9 {
            buf.append(ev(n));
        }
        buf.note_task(TaskId(3));
        assert!(!buf.tasks_seen().is_empty());

        buf.reset(Timestamp(50));
        assert_eq!(buf.num_events(), 0);
        assert_eq!(buf.head(), 0);
        assert!(buf.is_empty());
        assert!(buf.tasks_seen().is_empty());
        assert_eq!(buf.started_at(), Timestamp(50));
        assert_eq!(buf.iter().count(), 0);
    }

    #[test]
    fn task_set_tracks_bitmap_and_untracked_overflow() {
        let mut set = TaskSet::new();
        set.insert(TaskId(0));
        set.insert(TaskId(63));
        set.insert(TaskId(64));
        set.insert(TaskId(63)); // duplicate
        assert_eq!(set.len(), 3);
        assert!(set.contains(TaskId(64)));
        assert!(!set.contains(TaskId(1)));
        assert_eq!(set.untracked(), 0);

        set.insert(TaskId(0x0a01_0001));
        set.insert(TaskId(u32::MAX));
        assert_eq!(set.untracked(), 2);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn switch_subject_is_the_incoming_task() {
        let kind = EventKind::Switch { from: TaskId(1), to: TaskId(2) };
        assert_eq!(kind.subject(), TaskId(2));
        assert_eq!(EventKind::Exit { task: TaskId(7) }.subject(), TaskId(7));
    }
}
