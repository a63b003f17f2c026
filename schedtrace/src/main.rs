//! # schedtrace - Main Entry Point
//!
//! Runs a capture session against the in-process simulated scheduler:
//! - **Continuous** (default): harvest a buffer every `--interval` ms until
//!   Ctrl+C or `--duration` elapses
//! - **Snapshot** (`--snapshot N`): capture exactly N events (0 = one full
//!   buffer), then report the frozen buffer and exit

#![allow(clippy::cast_precision_loss)]

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use schedtrace::capture::{CaptureEngine, CaptureState};
use schedtrace::cli::Args;
use schedtrace::clock::MonotonicClock;
use schedtrace::domain::CaptureError;
use schedtrace::export::{write_trace, ChromeTraceExporter};
use schedtrace::host::{HookRegistry, SimScheduler};
use schedtrace::ring::{RingBuffer, DEFAULT_CAPACITY};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

const SWAP_TIMEOUT: Duration = Duration::from_secs(1);

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_ERROR
        }
    });
}

/// Shared per-harvest reporting: text trace to stdout, events into the
/// exporter if one is attached.
fn report_buffer(
    buffer: &RingBuffer,
    quiet: bool,
    exporter: Option<&mut ChromeTraceExporter>,
) -> Result<u64> {
    if !quiet {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        write_trace(&mut out, buffer).context("Failed to write trace")?;
        out.flush().ok();
    }
    if let Some(exporter) = exporter {
        exporter.add_buffer(buffer);
    }
    Ok(buffer.num_events())
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    // ── Phase 1: Build the engine against the simulated host ────────────
    let host = Arc::new(SimScheduler::new());
    let engine = CaptureEngine::new(
        DEFAULT_CAPACITY,
        Arc::new(MonotonicClock::new()),
        Arc::clone(&host) as Arc<dyn HookRegistry>,
    );

    if !quiet {
        println!("schedtrace v{}", env!("CARGO_PKG_VERSION"));
        println!("capacity: {} events/buffer", engine.capacity());
        println!("tasks: {} (simulated)", args.tasks);
    }

    // ── Phase 2: Start the session, then the workload ───────────────────
    let snapshot_mode = args.snapshot.is_some();
    match args.snapshot {
        Some(n) => {
            let outcome = engine.snapshot(n).context("Failed to arm snapshot")?;
            info!("snapshot session started: {outcome:?}");
        }
        None => {
            let outcome = engine.enable().context("Failed to enable capture")?;
            info!("continuous session started: {outcome:?}");
        }
    }

    let workload = host.spawn_workload(args.tasks, Duration::from_micros(args.pace_us));

    // Initialize trace exporter if export requested
    let mut exporter = args.export.as_ref().map(|_| ChromeTraceExporter::new());

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let session_start = Instant::now();
    let duration_limit =
        if args.duration > 0 { Some(Duration::from_secs(args.duration)) } else { None };

    let mut harvested: u64 = 0;
    let mut harvests: u64 = 0;
    let mut exit_reason = "interrupted";

    // ── Main harvest loop ───────────────────────────────────────────────
    loop {
        if let Some(limit) = duration_limit {
            if session_start.elapsed() >= limit {
                exit_reason = "duration limit reached";
                break;
            }
        }

        // A snapshot session completes on its own; pick up the frozen
        // buffer and stop.
        if snapshot_mode && engine.state() == CaptureState::Disabled {
            let buffer = engine.harvest_export();
            harvested += report_buffer(&buffer, quiet, exporter.as_mut())?;
            harvests += 1;
            exit_reason = "snapshot complete";
            break;
        }

        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(args.interval)) => {
                if snapshot_mode {
                    continue;
                }
                match engine.request_swap(SWAP_TIMEOUT) {
                    Ok(buffer) => {
                        harvested += report_buffer(&buffer, quiet, exporter.as_mut())?;
                        harvests += 1;
                    }
                    Err(CaptureError::Timeout(_)) => {
                        // Quiet window: no producer upcall ran to execute the
                        // swap. The request stays armed for the next one.
                        info!("no events this interval; swap request still pending");
                    }
                    Err(e) => return Err(e).context("Buffer harvest failed"),
                }
            }
            _ = &mut ctrl_c => {
                break;
            }
        }
    }

    // ── Teardown: stop the workload, close the session ──────────────────
    let driven = workload.stop();
    engine.disable().context("Failed to disable capture")?;

    if !quiet || harvests == 0 {
        let elapsed = session_start.elapsed();
        eprintln!(
            "\n{}: {:.1}s, {} harvests, {} events harvested ({} upcalls driven, {} dropped)",
            exit_reason,
            elapsed.as_secs_f64(),
            harvests,
            harvested,
            driven,
            engine.dropped(),
        );
    }

    // Export trace if enabled
    if let (Some(exporter), Some(export_path)) = (exporter, args.export) {
        let file = File::create(&export_path).context("Failed to create trace output file")?;
        let writer = BufWriter::new(file);
        exporter.export(writer).context("Failed to export trace")?;
        if !quiet {
            println!("saved: {} ({} events)", export_path.display(), exporter.event_count());
        }
    }

    Ok(())
}
