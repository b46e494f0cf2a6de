use crate::error::{LineageError, Result};
use crate::session::ReleaseSession;
use crate::types::{ChangeMetricsRecord, InducingRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Everything the session extracted for one release file.
#[derive(Debug, Clone, Serialize)]
pub struct FileFeatures {
    pub metrics: ChangeMetricsRecord,
    pub issues: Vec<InducingRecord>,
    pub issues_six_months_szz: Vec<InducingRecord>,
    pub issues_six_months_szzr: Vec<InducingRecord>,
}

/// The per-release dataset consumers read: one feature block per release
/// file plus the snapshot delta matrix.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReport {
    pub release: String,
    pub release_date: DateTime<Utc>,
    pub file_count: usize,
    pub files: BTreeMap<String, FileFeatures>,
    pub snapshot_deltas: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
}

/// Runs every attribution pass and assembles the dataset for the session's
/// release.
pub fn build_report(session: &mut ReleaseSession) -> Result<ReleaseReport> {
    let issues = session.issues()?;
    let six_months_szz = session.issues_six_months_szz()?;
    let six_months_szzr = session.issues_six_months_szzr()?;
    let metrics = session.change_metrics();

    let mut files: BTreeMap<String, FileFeatures> = BTreeMap::new();
    for file in session.release_files() {
        files.insert(
            file.clone(),
            FileFeatures {
                metrics: metrics.get(file).cloned().unwrap_or_default(),
                issues: issues.get(file).cloned().unwrap_or_default(),
                issues_six_months_szz: six_months_szz.get(file).cloned().unwrap_or_default(),
                issues_six_months_szzr: six_months_szzr.get(file).cloned().unwrap_or_default(),
            },
        );
    }

    Ok(ReleaseReport {
        release: session.release_revision().to_string(),
        release_date: session.release_date(),
        file_count: files.len(),
        files,
        snapshot_deltas: session.dambros_deltas(),
    })
}

/// Outputs the report as JSON. Writes to a file if given, otherwise stdout.
pub fn report_json(report: &ReleaseReport, output_file: Option<&Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                LineageError::Export(format!("failed to open {} for writing: {e}", path.display()))
            })?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, report)
                .map_err(|e| LineageError::Export(format!("JSON serialization failed: {e}")))?;
            writer.write_all(b"\n").map_err(|e| {
                LineageError::Export(format!("failed to finalize {}: {e}", path.display()))
            })?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer_pretty(&mut writer, report)
                .map_err(|e| LineageError::Export(format!("JSON serialization failed: {e}")))?;
            writer
                .write_all(b"\n")
                .map_err(|e| LineageError::Export(format!("failed to write stdout: {e}")))?;
        }
    }
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
