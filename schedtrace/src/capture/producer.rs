//! # Event Producer
//!
//! The three entry points the host scheduler invokes on every task
//! transition. This code runs in the most constrained context in the system:
//! it must return promptly, must not allocate, and has no way to report an
//! error to its caller. Anything that goes wrong internally degrades to
//! dropping the event in flight — stalling the scheduler is never an option,
//! losing one event is.
//!
//! Per invocation: stamp a timestamp, execute any swap the consumer has
//! requested (before appending, so the event lands in the buffer that stays
//! active), append, and in snapshot mode retire quota. When the quota runs
//! out or the buffer fills, the producer performs the final swap itself and
//! downs the session, unprompted — swap first, then disable, so the
//! completed data is always retrievable from the export buffer.

use super::swap::Append;
use super::{Shared, MODE_DISABLED, MODE_SNAPSHOT};
use crate::domain::{TaskContext, TaskId};
use crate::host::SchedulerHooks;
use crate::ring::{Event, EventKind};
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub struct EventProducer {
    shared: Arc<Shared>,
}

impl EventProducer {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    fn record(&self, kind: EventKind, ctx: TaskContext) {
        let mode = self.shared.mode.load(Ordering::Acquire);
        if mode == MODE_DISABLED {
            return;
        }

        let timestamp = self.shared.clock.now();

        if self.shared.coordinator.swap_pending() {
            self.shared.coordinator.execute_swap();
        }

        let event = Event { timestamp, context: ctx, kind };
        let Append::Stored { buffer_full } = self.shared.coordinator.try_append(event) else {
            // Contention: drop-and-continue. The coordinator counts it.
            return;
        };

        if mode == MODE_SNAPSHOT {
            self.retire_snapshot_quota(buffer_full);
        }
    }

    fn retire_snapshot_quota(&self, buffer_full: bool) {
        let previous = self
            .shared
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| Some(r.saturating_sub(1)))
            .unwrap_or(0);
        if previous == 0 {
            // A concurrent invocation already completed the snapshot.
            return;
        }
        if previous == 1 || buffer_full {
            self.shared.coordinator.execute_swap();
            self.shared.mode.store(MODE_DISABLED, Ordering::Release);
            self.shared.auto_completed.store(true, Ordering::Release);
        }
    }
}

impl SchedulerHooks for EventProducer {
    fn on_switch(&self, from: TaskId, to: TaskId, ctx: TaskContext) {
        self.record(EventKind::Switch { from, to }, ctx);
    }

    fn on_begin(&self, task: TaskId, ctx: TaskContext) {
        self.record(EventKind::Begin { task }, ctx);
    }

    fn on_exit(&self, task: TaskId, ctx: TaskContext) {
        self.record(EventKind::Exit { task }, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MODE_CONTINUOUS, Shared};
    use crate::clock::{Clock, ManualClock};
    use std::time::Duration;

    fn producer_with_mode(mode: u8) -> (EventProducer, Arc<Shared>) {
        let clock = Arc::new(ManualClock::new()) as Arc<dyn Clock>;
        let shared = Arc::new(Shared::new(8, clock));
        shared.mode.store(mode, Ordering::Release);
        (EventProducer::new(Arc::clone(&shared)), shared)
    }

    #[test]
    fn disabled_producer_records_nothing() {
        let (producer, shared) = producer_with_mode(MODE_DISABLED);
        producer.on_begin(TaskId(1), TaskContext::ready(5));
        assert_eq!(shared.coordinator.harvest_export().num_events(), 0);
        assert!(shared.coordinator.request_swap(Duration::from_millis(5)).is_err());
    }

    #[test]
    fn events_mark_the_subject_task_seen() {
        let (producer, shared) = producer_with_mode(MODE_CONTINUOUS);
        producer.on_switch(TaskId(3), TaskId(4), TaskContext::ready(5));

        shared.coordinator.execute_swap();
        let frozen = shared.coordinator.harvest_export();
        assert_eq!(frozen.num_events(), 1);
        assert!(frozen.tasks_seen().contains(TaskId(4)));
        assert!(!frozen.tasks_seen().contains(TaskId(3)));
    }

    #[test]
    fn pending_swap_executes_before_the_append() {
        let (producer, shared) = producer_with_mode(MODE_CONTINUOUS);
        producer.on_begin(TaskId(1), TaskContext::ready(5));

        // Arm a request without a waiting consumer, then produce one event:
        // the pre-swap event must freeze, the new one must land afterwards.
        let consumer = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || shared.coordinator.request_swap(Duration::from_secs(5)))
        };
        while !shared.coordinator.swap_pending() {
            std::thread::yield_now();
        }
        producer.on_begin(TaskId(2), TaskContext::ready(5));

        let frozen = consumer.join().unwrap().expect("handoff");
        let frozen_tasks: Vec<u32> = frozen.iter().map(|e| e.subject().0).collect();
        assert_eq!(frozen_tasks, vec![1]);

        shared.coordinator.execute_swap();
        let next = shared.coordinator.harvest_export();
        let next_tasks: Vec<u32> = next.iter().map(|e| e.subject().0).collect();
        assert_eq!(next_tasks, vec![2]);
    }

    #[test]
    fn request_racing_snapshot_completion_gets_the_frozen_window() {
        let (producer, shared) = producer_with_mode(MODE_SNAPSHOT);
        shared.remaining.store(2, Ordering::Release);

        producer.on_begin(TaskId(1), TaskContext::ready(5));

        let consumer = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || shared.coordinator.request_swap(Duration::from_secs(5)))
        };
        while !shared.coordinator.swap_pending() {
            std::thread::yield_now();
        }

        // One upcall honors the request, appends, and exhausts the quota: two
        // swaps back to back. The consumer must still be handed the window
        // frozen for its request, not the snapshot's final one.
        producer.on_begin(TaskId(2), TaskContext::ready(5));

        let frozen = consumer.join().unwrap().expect("handoff");
        let subjects: Vec<u32> = frozen.iter().map(|e| e.subject().0).collect();
        assert_eq!(subjects, vec![1]);

        // The completed snapshot window stays retrievable on the export side.
        assert_eq!(shared.mode.load(Ordering::Acquire), MODE_DISABLED);
        let export: Vec<u32> =
            shared.coordinator.harvest_export().iter().map(|e| e.subject().0).collect();
        assert_eq!(export, vec![2]);
    }

    #[test]
    fn snapshot_quota_swaps_then_disables() {
        let (producer, shared) = producer_with_mode(MODE_SNAPSHOT);
        shared.remaining.store(3, Ordering::Release);

        for n in 0..5 {
            producer.on_begin(TaskId(n), TaskContext::ready(5));
        }

        assert_eq!(shared.mode.load(Ordering::Acquire), MODE_DISABLED);
        assert!(shared.auto_completed.load(Ordering::Acquire));
        // Exactly the quota made it into the export buffer; the two late
        // upcalls were ignored by the disabled producer.
        assert_eq!(shared.coordinator.harvest_export().num_events(), 3);
    }
}
