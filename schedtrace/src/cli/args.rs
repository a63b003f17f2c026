//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "schedtrace",
    about = "Capture task-switch events from a scheduler hook into a double-buffered ring",
    after_help = "\
EXAMPLES:
    schedtrace                               Continuous capture until Ctrl+C
    schedtrace --snapshot 256                One bounded snapshot of 256 events
    schedtrace --snapshot 0                  Snapshot until one buffer fills
    schedtrace --duration 10 --export t.json Capture 10s and export a trace"
)]
pub struct Args {
    /// Capture a bounded snapshot of N events instead of running
    /// continuously (0 = fill one whole buffer)
    #[arg(long, value_name = "N")]
    pub snapshot: Option<u64>,

    /// Harvest interval for continuous capture, in milliseconds
    #[arg(long, default_value = "500", value_name = "MS")]
    pub interval: u64,

    /// Stop after N seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Export harvested events as Chrome Trace JSON
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Number of tasks in the simulated scheduler workload
    #[arg(long, default_value = "4")]
    pub tasks: u32,

    /// Pace of simulated scheduler transitions, in microseconds
    #[arg(long, default_value = "200", value_name = "US")]
    pub pace_us: u64,

    /// Suppress the per-event text trace
    #[arg(short, long)]
    pub quiet: bool,
}
