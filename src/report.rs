//! JSON run report.
//!
//! Fail-forward provisioning means the operator must be able to see
//! afterwards exactly which optional installs failed and where an aborted
//! run stopped. Every run, successful or not, writes a report under the
//! installation root with per-stage and per-command outcomes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::pipeline::{PipelineOutcome, StageReport};

const REPORT_FILENAME: &str = "provision-report.json";

/// Everything recorded about one provisioning run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub distribution: String,
    pub package_family: String,
    pub started_at_utc: String,
    pub finished_at_utc: String,
    pub outcome: PipelineOutcome,
    pub stages: Vec<StageReport>,
}

/// Current time as an RFC 3339 UTC timestamp.
pub fn now_utc() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("formatting UTC timestamp")
}

/// Epoch-seconds run identifier, unique enough for sequential runs.
pub fn new_run_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("run-{secs}")
}

/// Write the report under the installation root, returning its path.
pub fn write_report(report: &RunReport, install_dir: &Path) -> Result<PathBuf> {
    let path = install_dir.join(REPORT_FILENAME);
    let bytes = serde_json::to_vec_pretty(report).context("serializing run report")?;
    fs::write(&path, bytes)
        .with_context(|| format!("writing run report '{}'", path.display()))?;
    Ok(path)
}
