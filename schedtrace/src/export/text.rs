//! Human-readable trace rendering.
//!
//! One line per event, oldest first:
//!
//! ```text
//!     0.000132  Switch(0x00000001 -> 0x00000003)  prio 100/100  READY
//!     0.000318  Switch(0x00000003 -> 0x00000002)  prio 101/101  WAITING FOR SEMAPHORE, 0x1a010002
//!     0.004771  Exit(0x00000002)  prio 101/101  READY
//! ```
//!
//! Timestamps are seconds since the capture window started; the state text is
//! the decoded condition bitset, with the wait object appended when the task
//! was blocked on one.

use crate::ring::{Event, EventKind, RingBuffer};
use std::io::{self, Write};

/// Write the live events of `buffer` to `out`, one line per event.
///
/// # Errors
/// Propagates writer errors.
pub fn write_trace<W: Write>(out: &mut W, buffer: &RingBuffer) -> io::Result<()> {
    for event in buffer.iter() {
        write_event(out, buffer, event)?;
    }
    Ok(())
}

/// Render the buffer to a string. Convenience wrapper over [`write_trace`].
#[must_use]
pub fn render_trace(buffer: &RingBuffer) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    write_trace(&mut out, buffer).unwrap_or_default();
    String::from_utf8(out).unwrap_or_default()
}

fn write_event<W: Write>(out: &mut W, buffer: &RingBuffer, event: &Event) -> io::Result<()> {
    let elapsed = event.timestamp.0.saturating_sub(buffer.started_at().0);
    #[allow(clippy::cast_precision_loss)]
    let secs = elapsed as f64 / 1_000_000_000.0;

    write!(out, "{secs:>12.6}  ")?;
    match event.kind {
        EventKind::Switch { from, to } => write!(out, "Switch({from} -> {to})")?,
        EventKind::Begin { task } => write!(out, "Begin({task})")?,
        EventKind::Exit { task } => write!(out, "Exit({task})")?,
    }

    let ctx = event.context;
    write!(out, "  prio {}/{}  {}", ctx.priority_current, ctx.priority_real, ctx.state)?;
    if ctx.wait_object != 0 {
        write!(out, ", 0x{:08x}", ctx.wait_object)?;
    }
    writeln!(out)
}
