use std::fmt::Write as _;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::cluster::DedupPlan;
use crate::error::{DedupError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    DryRun,
    #[default]
    Execute,
}

/// A dropped frame that is gone from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    pub path: PathBuf,
    pub kept: PathBuf,
    /// blake3 of the file contents, taken just before removal.
    pub blake3: Option<String>,
}

#[derive(Debug, Default)]
pub struct DeletionReport {
    pub removed: Vec<Removed>,
    /// One `DedupError::Deletion` per file that could not be removed.
    pub failures: Vec<DedupError>,
}

impl DeletionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Overall status of the run: an error as soon as one file stayed behind.
    pub fn check(&self) -> Result<()> {
        if self.is_clean() {
            return Ok(());
        }
        Err(DedupError::IncompleteDeletion {
            failed: self.failures.len(),
            attempted: self.failures.len() + self.removed.len(),
        })
    }
}

#[derive(Debug)]
pub enum Outcome {
    DryRun(String),
    Executed(DeletionReport),
}

/// Dispatch on `mode`. Dry-run never touches the filesystem.
pub fn run(plan: &DedupPlan, mode: Mode) -> Outcome {
    match mode {
        Mode::DryRun => Outcome::DryRun(render_report(plan)),
        Mode::Execute => Outcome::Executed(execute(plan)),
    }
}

/// Human-readable description of what a plan keeps and drops.
pub fn render_report(plan: &DedupPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Frames: {} total, {} kept, {} dropped (threshold {})",
        plan.total_frames(),
        plan.kept_count(),
        plan.dropped_count(),
        plan.threshold
    );

    let groups = plan.clusters.iter().filter(|c| !c.dropped.is_empty());
    for (i, cluster) in groups.enumerate() {
        let _ = writeln!(out, "\n✨ Group {}:", i + 1);
        let _ = writeln!(out, "   🏆 Keeping → {}", cluster.kept.name());
        for dup in &cluster.dropped {
            let _ = writeln!(
                out,
                "   🗑️  [dry-run] Would delete {} (duplicate of {}, distance {})",
                dup.frame.name(),
                cluster.kept.name(),
                dup.distance
            );
        }
    }

    if plan.dropped_count() == 0 {
        let _ = writeln!(out, "\nNo duplicates found.");
    } else {
        let _ = writeln!(
            out,
            "\n⚠️  Dry-run only; {} file(s) would be removed.",
            plan.dropped_count()
        );
    }
    out
}

/// Remove every dropped frame. Failures are collected, never fatal.
pub fn execute(plan: &DedupPlan) -> DeletionReport {
    let mut report = DeletionReport::default();

    for (dup, kept) in plan.dropped() {
        let path = &dup.frame.path;
        let digest = content_digest(path);

        match fs::remove_file(path) {
            Ok(()) => {
                log::info!("deleted {}", path.display());
                report.removed.push(Removed {
                    path: path.clone(),
                    kept: kept.path.clone(),
                    blake3: digest,
                });
            }
            Err(source) => {
                log::warn!("could not delete {}: {}", path.display(), source);
                report.failures.push(DedupError::Deletion {
                    path: path.clone(),
                    source,
                });
            }
        }
    }

    report
}

fn content_digest(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(file).ok()?;
    Some(hasher.finalize().to_hex().to_string())
}
