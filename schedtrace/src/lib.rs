//! # schedtrace - Task-Switch Event Capture Engine
//!
//! schedtrace records every context switch, task start, and task exit a host
//! scheduler reports into a fixed-capacity, double-buffered ring, and lets a
//! lower-urgency consumer periodically harvest a complete, stable buffer for
//! display or export.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Host Scheduler                              │
//! │        (upcalls on switch / begin / exit transitions)           │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ serialized upcalls
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  schedtrace (This Crate)                        │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Producer   │──▶│  Ring (A/B)  │──▶│   Exporter   │         │
//! │  │  (hot path)  │   │ double-buffer│   │ text / json  │         │
//! │  └──────┬───────┘   └──────▲───────┘   └──────────────┘         │
//! │         │ executes swap    │ request + handoff                  │
//! │         ▼                  │                                    │
//! │  ┌──────────────┐   ┌──────┴───────┐                            │
//! │  │  Controller  │   │   Consumer   │                            │
//! │  │ (state mach.)│   │ (harvest)    │                            │
//! │  └──────────────┘   └──────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`capture`]: the engine core — producer entry points, buffer swap
//!   coordinator with the consumer handoff, and the session state machine
//! - [`ring`]: fixed-capacity overwrite-when-full event ring
//! - [`clock`]: monotonic timestamp sources
//! - [`host`]: host scheduler collaborator contracts and the in-process
//!   simulator
//! - [`export`]: text trace, raw `#[repr(C)]` record copy, Chrome Trace JSON
//! - [`domain`]: newtypes and the error taxonomy
//! - [`cli`]: argument parsing for the demo binary
//!
//! ## Key Concepts
//!
//! - **Producer**: runs inside the scheduler upcall; never blocks, never
//!   allocates, drops an event rather than stall
//! - **Swap boundary**: the consumer requests a swap, the producer executes
//!   it; every event lands on exactly one side of the cut
//! - **Snapshot mode**: a capture bounded to an event quota that swaps out
//!   its final buffer and disables itself
//!
//! ## Typical Usage
//!
//! ```no_run
//! use schedtrace::capture::CaptureEngine;
//! use schedtrace::clock::MonotonicClock;
//! use schedtrace::host::SimScheduler;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), schedtrace::domain::CaptureError> {
//! let host = Arc::new(SimScheduler::new());
//! let engine = CaptureEngine::new(
//!     schedtrace::ring::DEFAULT_CAPACITY,
//!     Arc::new(MonotonicClock::new()),
//!     host.clone(),
//! );
//!
//! engine.enable()?;
//! // ... the host drives the producer hooks ...
//! let frozen = engine.request_swap(Duration::from_secs(1))?;
//! print!("{}", schedtrace::export::render_trace(&frozen));
//! engine.disable()?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod cli;
pub mod clock;
pub mod domain;
pub mod export;
pub mod host;
pub mod ring;
