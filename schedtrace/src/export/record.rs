//! Raw record copy for polling consumers.
//!
//! Copies a frozen buffer's public shape field-for-field into the
//! `#[repr(C)]` [`CaptureRecord`] from `schedtrace-common`: tick rate,
//! capture start time, monotonic event count, head index, the event slots in
//! their physical order, and the task presence bitmap. Consumers on the other
//! side of a process boundary reconstruct chronological order from
//! `head`/`num_events` exactly the way [`RingBuffer::iter`] does.

use crate::ring::{Event, EventKind, RingBuffer};
use schedtrace_common::{CaptureRecord, RawEvent, EVENT_BEGIN, EVENT_EXIT, EVENT_SWITCH, MAX_EVENTS};

/// Copy `buffer` into an export record.
///
/// Slot storage in the record is fixed at [`MAX_EVENTS`]; buffers built with
/// a larger capacity cannot be represented and are truncated to the record
/// size (the shipped engine capacity equals the record size).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn capture_record(buffer: &RingBuffer, tick_rate: u64) -> CaptureRecord {
    let mut record = CaptureRecord::zeroed();
    record.tick_rate = tick_rate;
    record.started_at_ns = buffer.started_at().0;
    record.num_events = buffer.num_events();
    record.head = buffer.head() as u32;
    record.untracked_tasks = buffer.tasks_seen().untracked();
    record.tasks_seen = *buffer.tasks_seen().words();

    let live = buffer.len().min(MAX_EVENTS);
    for slot in 0..live {
        if let Some(event) = buffer.slot(slot) {
            record.events[slot] = raw_event(event);
        }
    }
    record
}

fn raw_event(event: &Event) -> RawEvent {
    let (kind, task, previous) = match event.kind {
        EventKind::Switch { from, to } => (EVENT_SWITCH, to.0, from.0),
        EventKind::Begin { task } => (EVENT_BEGIN, task.0, 0),
        EventKind::Exit { task } => (EVENT_EXIT, task.0, 0),
    };
    RawEvent {
        kind,
        state: event.context.state.0,
        task,
        previous,
        wait_object: event.context.wait_object,
        priority_current: event.context.priority_current,
        priority_real: event.context.priority_real,
        _padding: [0; 2],
        timestamp_ns: event.timestamp.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskContext, TaskId, Timestamp};

    fn ev(n: u64) -> Event {
        Event {
            timestamp: Timestamp(n),
            context: TaskContext::ready(10),
            kind: EventKind::Switch { from: TaskId(1), to: TaskId(2) },
        }
    }

    #[test]
    fn record_mirrors_buffer_metadata() {
        let mut buf = RingBuffer::new(8, Timestamp(77));
        for n in 0..3 {
            buf.append(ev(n));
            buf.note_task(TaskId(2));
        }
        buf.note_task(TaskId(0x0a01_0001));

        let record = capture_record(&buf, 1_000_000_000);
        assert_eq!(record.tick_rate, 1_000_000_000);
        assert_eq!(record.started_at_ns, 77);
        assert_eq!(record.num_events, 3);
        assert_eq!(record.head, 0);
        assert_eq!(record.live_events(), 3);
        assert_eq!(record.untracked_tasks, 1);
        assert_eq!(record.tasks_seen[0] & (1 << 2), 1 << 2);
        assert_eq!(record.events[3], RawEvent::ZERO);
    }

    #[test]
    fn slots_are_copied_in_physical_order() {
        let mut buf = RingBuffer::new(4, Timestamp(0));
        for n in 0..6 {
            buf.append(ev(n));
        }
        let record = capture_record(&buf, 1);
        // Physical slots after 6 appends into capacity 4: [4, 5, 2, 3].
        let stamps: Vec<u64> = record.events[..4].iter().map(|e| e.timestamp_ns).collect();
        assert_eq!(stamps, vec![4, 5, 2, 3]);
    }

    #[test]
    fn event_fields_round_into_the_raw_layout() {
        let event = Event {
            timestamp: Timestamp(9),
            context: TaskContext::waiting(0x0200, 0x42, 7),
            kind: EventKind::Switch { from: TaskId(10), to: TaskId(11) },
        };
        let raw = raw_event(&event);
        assert_eq!(raw.kind, EVENT_SWITCH);
        assert_eq!(raw.task, 11);
        assert_eq!(raw.previous, 10);
        assert_eq!(raw.state, 0x0200);
        assert_eq!(raw.wait_object, 0x42);
        assert_eq!((raw.priority_current, raw.priority_real), (7, 7));
        assert_eq!(raw.timestamp_ns, 9);
    }
}
