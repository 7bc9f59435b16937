/// Comparison report for the TUI visualizer.
///
/// The demo binary runs every policy on the same scenario and writes a JSON
/// report to REPORT_PATH. The viz binary polls this file and re-renders the
/// dashboard. Writes are atomic (write to .tmp then rename) to avoid torn reads.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::Result;
use crate::stats::RunStats;

pub const REPORT_PATH: &str = "/tmp/mtsim_report.json";

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct SimReport {
    /// Scenario name, e.g. the file it was loaded from
    pub scenario: String,
    pub config: SimConfig,
    /// One entry per policy, in the order they ran
    pub runs: Vec<RunStats>,
    /// Unix timestamp in ms when this report was written
    pub timestamp_ms: u64,
}

impl SimReport {
    pub fn new(scenario: &str, config: SimConfig) -> Self {
        SimReport {
            scenario: scenario.to_string(),
            config,
            runs: Vec::new(),
            timestamp_ms: now_ms(),
        }
    }

    pub fn run(&self, policy: &str) -> Option<&RunStats> {
        self.runs.iter().find(|r| r.policy == policy)
    }
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

/// Atomically write a report to `path`.
pub fn write_report_to(path: impl AsRef<Path>, report: &SimReport) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string(report)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, &json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn write_report(report: &SimReport) -> Result<()> {
    write_report_to(REPORT_PATH, report)
}

/// Read a report. Returns None if the file doesn't exist or can't be parsed.
pub fn read_report_from(path: impl AsRef<Path>) -> Option<SimReport> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

pub fn read_report() -> Option<SimReport> {
    read_report_from(REPORT_PATH)
}

/// Returns current Unix time in milliseconds.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
