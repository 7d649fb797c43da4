//! JSONL action report for a sync run
//!
//! One line per action, appended as it happens, so an interrupted run
//! still leaves a usable record of what was changed on the device.

use crate::engine::SyncOutcome;
use crate::entry::EntryKind;
use crate::progress::ProgressSink;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Add,
    Remove,
    Update,
    Mismatch,
    Error,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ReportEntry {
    pub timestamp: String,
    pub action: SyncAction,
    pub path: String,
    pub detail: Option<String>,
}

pub struct SyncReport {
    report_path: PathBuf,
}

impl SyncReport {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            report_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn append(&self, action: SyncAction, path: &Path, detail: Option<String>) -> Result<()> {
        let entry = ReportEntry {
            timestamp: Utc::now().to_rfc3339(),
            action,
            path: path.display().to_string(),
            detail,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.report_path)
            .context("Failed to open report file")?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &entry)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn entries(&self) -> Result<Vec<ReportEntry>> {
        if !self.report_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.report_path)
            .context("Failed to open report file for reading")?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}

// Report writes must never fail the sync itself, so the sink swallows
// its own I/O errors.
impl ProgressSink for SyncReport {
    fn adding(&self, _depth: usize, dest: &Path) {
        let _ = self.append(SyncAction::Add, dest, None);
    }

    fn removing(&self, _depth: usize, dest: &Path) {
        let _ = self.append(SyncAction::Remove, dest, None);
    }

    fn updating(&self, _depth: usize, dest: &Path) {
        let _ = self.append(SyncAction::Update, dest, None);
    }

    fn type_mismatch(&self, _depth: usize, dest: &Path, source: EntryKind, dest_kind: EntryKind) {
        let _ = self.append(
            SyncAction::Mismatch,
            dest,
            Some(format!(
                "source is a {}, destination is a {}",
                source.describe(),
                dest_kind.describe()
            )),
        );
    }

    fn completed(&self, _source: &Path, dest: &Path, outcome: &SyncOutcome) {
        for error in &outcome.errors {
            let _ = self.append(SyncAction::Error, dest, Some(error.clone()));
        }
    }
}
