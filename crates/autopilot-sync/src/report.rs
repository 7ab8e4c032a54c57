use std::path::Path;

use anyhow::{Context, Result};
use autopilot_core::{AutopilotPaths, CycleResult};
use serde::{Deserialize, Serialize};

use crate::machine::CycleState;

/// Diagnostic record of one cycle, written to `last_cycle.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: String,
    pub finished_at: String,
    pub root: String,
    /// Whether an assistant was configured for the cycle.
    pub assistant: bool,
    pub result: CycleResult,
    pub states: Vec<CycleState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolved: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<String>,
}

/// Load the last report. Returns None if the file doesn't exist.
pub fn load_report(paths: &AutopilotPaths) -> Result<Option<CycleReport>> {
    let path = &paths.last_cycle_json;
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading report: {}", path.display()))?;
    let report = serde_json::from_str(&content)
        .with_context(|| format!("parsing report: {}", path.display()))?;
    Ok(Some(report))
}

/// Save the report atomically.
pub fn save_report(paths: &AutopilotPaths, report: &CycleReport) -> Result<()> {
    write_report(&paths.last_cycle_json, report)
}

fn write_report(path: &Path, report: &CycleReport) -> Result<()> {
    let data = serde_json::to_string_pretty(report)?;
    autopilot_core::write_atomic(path, data.as_bytes())
        .with_context(|| format!("saving report: {}", path.display()))?;
    Ok(())
}
