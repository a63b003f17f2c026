//! Export and formatting of harvested buffers
//!
//! A frozen ring buffer leaves the engine one of three ways: as a
//! human-readable text trace, as a raw `#[repr(C)]` record for polling
//! consumers, or as Chrome Trace Event Format JSON for visualization in
//! Perfetto or chrome://tracing.

pub mod chrome_trace;
pub mod record;
pub mod text;

pub use chrome_trace::ChromeTraceExporter;
pub use record::capture_record;
pub use text::{render_trace, write_trace};
