use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::executor::Removed;

pub const HISTORY_FILE: &str = ".history.jsonl";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemovedEntry {
    pub path: String,
    pub blake3: Option<String>,
}

/// One line of the history log: a kept frame and the duplicates removed for it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub retained: String,
    pub removed: Vec<RemovedEntry>,
    pub action: String,
}

pub fn history_path(dir: &Path) -> PathBuf {
    dir.join(HISTORY_FILE)
}

/// Group removed files by the frame they duplicated, one record per group.
///
/// `removed` is expected in plan order, where each kept frame's duplicates
/// are contiguous; records come out in that same order.
pub fn records_for(removed: &[Removed]) -> Vec<HistoryRecord> {
    let timestamp = Utc::now().to_rfc3339();
    let mut records: Vec<HistoryRecord> = Vec::new();
    let mut last_kept: Option<&Path> = None;

    for entry in removed {
        if last_kept != Some(entry.kept.as_path()) {
            last_kept = Some(&entry.kept);
            records.push(HistoryRecord {
                timestamp: timestamp.clone(),
                retained: entry.kept.to_string_lossy().into_owned(),
                removed: Vec::new(),
                action: "deleted".to_string(),
            });
        }
        if let Some(record) = records.last_mut() {
            record.removed.push(RemovedEntry {
                path: entry.path.to_string_lossy().into_owned(),
                blake3: entry.blake3.clone(),
            });
        }
    }
    records
}

pub fn append(dir: &Path, records: &[HistoryRecord]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let mut out = OpenOptions::new()
        .create(true)
        .append(true)
        .open(history_path(dir))?;
    for record in records {
        let line = serde_json::to_string(record).map_err(std::io::Error::from)?;
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// Read every well-formed record; malformed lines are logged and skipped.
pub fn read(dir: &Path) -> Result<Vec<HistoryRecord>> {
    let f = File::open(history_path(dir))?;
    let reader = BufReader::new(f);

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        match serde_json::from_str::<HistoryRecord>(&line) {
            Ok(rec) => records.push(rec),
            Err(err) => log::warn!("skipping malformed history entry {}: {}", i, err),
        }
    }
    Ok(records)
}
