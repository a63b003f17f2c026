//! Chrome Trace Event Format export.
//!
//! Renders harvested buffers as instant events ("i" phase, thread scope) so
//! the switch cadence can be eyeballed on a timeline in Perfetto,
//! Speedscope, or chrome://tracing. Each subject task becomes a "thread"
//! row; the decoded scheduler state and priorities ride along as args.

use crate::domain::ExportError;
use crate::ring::{EventKind, RingBuffer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::io::Write;

/// Chrome Trace Event format
/// Spec: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU/preview
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChromeTraceEvent {
    /// Event name ("switch", "begin", "exit")
    name: String,
    /// Category for filtering/coloring
    cat: String,
    /// Phase: "i" = instant, "M" = metadata
    ph: String,
    /// Timestamp in microseconds
    ts: f64,
    /// Process ID (always 1; one capture window is one "process")
    pid: u32,
    /// Thread ID (the subject task's identifier)
    tid: u32,
    /// Instant-event scope ("t" = thread)
    #[serde(skip_serializing_if = "Option::is_none")]
    s: Option<String>,
    /// Optional arguments (metadata)
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<HashMap<String, JsonValue>>,
}

/// Chrome Trace Format container
#[derive(Debug, Serialize)]
struct ChromeTrace {
    #[serde(rename = "traceEvents")]
    trace_events: Vec<ChromeTraceEvent>,
    #[serde(rename = "displayTimeUnit")]
    display_time_unit: String,
}

/// Accumulates events across harvests and writes one trace JSON at the end.
pub struct ChromeTraceExporter {
    events: Vec<ChromeTraceEvent>,
    /// First timestamp seen, so the trace starts at t = 0.
    start_timestamp_ns: Option<u64>,
}

impl ChromeTraceExporter {
    #[must_use]
    pub fn new() -> Self {
        Self { events: Vec::new(), start_timestamp_ns: None }
    }

    /// Add every live event of a harvested buffer to the trace.
    pub fn add_buffer(&mut self, buffer: &RingBuffer) {
        for event in buffer.iter() {
            let start = *self.start_timestamp_ns.get_or_insert(event.timestamp.0);
            #[allow(clippy::cast_precision_loss)]
            let ts_us = event.timestamp.0.saturating_sub(start) as f64 / 1000.0;

            let (name, subject) = match event.kind {
                EventKind::Switch { to, .. } => ("switch", to),
                EventKind::Begin { task } => ("begin", task),
                EventKind::Exit { task } => ("exit", task),
            };

            let mut args = HashMap::new();
            args.insert("state".to_string(), serde_json::json!(event.context.state.to_string()));
            args.insert(
                "prio_current".to_string(),
                serde_json::json!(event.context.priority_current),
            );
            args.insert("prio_real".to_string(), serde_json::json!(event.context.priority_real));
            if let EventKind::Switch { from, .. } = event.kind {
                args.insert("from".to_string(), serde_json::json!(from.to_string()));
            }
            if event.context.wait_object != 0 {
                args.insert(
                    "wait_object".to_string(),
                    serde_json::json!(format!("0x{:08x}", event.context.wait_object)),
                );
            }

            self.events.push(ChromeTraceEvent {
                name: name.to_string(),
                cat: "sched".to_string(),
                ph: "i".to_string(),
                ts: ts_us,
                pid: 1,
                tid: subject.0,
                s: Some("t".to_string()),
                args: Some(args),
            });
        }
    }

    /// Write the accumulated trace to any writer.
    ///
    /// # Errors
    /// `ExportError::Serialization` on JSON encoding failure.
    pub fn export<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        // Thread-name metadata rows so the viewer labels each task.
        let mut all_events = self.events.clone();
        let mut tasks: Vec<u32> = self.events.iter().map(|e| e.tid).collect();
        tasks.sort_unstable();
        tasks.dedup();

        for tid in tasks {
            let mut args = HashMap::new();
            args.insert("name".to_string(), serde_json::json!(format!("task 0x{tid:08x}")));
            all_events.push(ChromeTraceEvent {
                name: "thread_name".to_string(),
                cat: String::new(),
                ph: "M".to_string(),
                ts: 0.0,
                pid: 1,
                tid,
                s: None,
                args: Some(args),
            });
        }

        let trace =
            ChromeTrace { trace_events: all_events, display_time_unit: "ms".to_string() };
        serde_json::to_writer_pretty(writer, &trace)?;
        Ok(())
    }

    /// Number of events collected so far.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

impl Default for ChromeTraceExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskContext, TaskId, Timestamp};
    use crate::ring::Event;

    #[test]
    fn export_produces_valid_trace_json() {
        let mut buf = RingBuffer::new(8, Timestamp(0));
        buf.append(Event {
            timestamp: Timestamp(2_000),
            context: TaskContext::ready(10),
            kind: EventKind::Switch { from: TaskId(1), to: TaskId(2) },
        });
        buf.append(Event {
            timestamp: Timestamp(5_000),
            context: TaskContext::ready(10),
            kind: EventKind::Exit { task: TaskId(2) },
        });

        let mut exporter = ChromeTraceExporter::new();
        exporter.add_buffer(&buf);
        assert_eq!(exporter.event_count(), 2);

        let mut out = Vec::new();
        exporter.export(&mut out).expect("export");
        let parsed: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");

        assert_eq!(parsed["displayTimeUnit"], "ms");
        let events = parsed["traceEvents"].as_array().expect("traceEvents array");
        // Two instants plus one thread-name metadata row for task 2.
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["name"], "switch");
        assert_eq!(events[0]["ts"], 0.0);
        assert_eq!(events[1]["name"], "exit");
        assert_eq!(events[1]["ts"], 3.0);
    }

    #[test]
    fn timestamps_are_relative_to_the_first_event_across_buffers() {
        let mut first = RingBuffer::new(4, Timestamp(0));
        first.append(Event {
            timestamp: Timestamp(10_000),
            context: TaskContext::ready(1),
            kind: EventKind::Begin { task: TaskId(1) },
        });
        let mut second = RingBuffer::new(4, Timestamp(0));
        second.append(Event {
            timestamp: Timestamp(40_000),
            context: TaskContext::ready(1),
            kind: EventKind::Exit { task: TaskId(1) },
        });

        let mut exporter = ChromeTraceExporter::new();
        exporter.add_buffer(&first);
        exporter.add_buffer(&second);

        let mut out = Vec::new();
        exporter.export(&mut out).expect("export");
        let parsed: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
        let events = parsed["traceEvents"].as_array().unwrap();
        assert_eq!(events[0]["ts"], 0.0);
        assert_eq!(events[1]["ts"], 30.0);
    }
}
