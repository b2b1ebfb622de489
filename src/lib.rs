//! Perceptual deduplication of frames extracted from a video.
//!
//! Frames are listed in natural filename order, fingerprinted with a
//! perceptual hash, and clustered in a single pass: each frame is compared
//! with the most recently kept frame only. The resulting [`DedupPlan`] is
//! either reported (dry-run) or executed by deleting the dropped files.

pub mod cluster;
pub mod config;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod frames;
pub mod history;
pub mod policy;
pub mod watermark;

pub use cluster::{Cluster, DedupPlan, Duplicate, SequentialClusterer, build_plan};
pub use config::DedupConfig;
pub use error::{DedupError, Result};
pub use executor::{DeletionReport, Mode, Outcome};
pub use fingerprint::{Fingerprint, Fingerprinter, HashKind};
pub use frames::{Frame, frames_from_paths, list_frames};
pub use policy::{Threshold, distance, is_duplicate};

/// Fingerprint an ordered frame sequence and cluster it.
///
/// Nothing is deleted here; a decode failure aborts before a plan exists.
pub fn plan_frames(
    frames: &[Frame],
    hash: HashKind,
    threshold: Threshold,
    show_progress: bool,
) -> Result<DedupPlan> {
    let hashed = Fingerprinter::new(hash)
        .with_progress(show_progress)
        .fingerprint_frames(frames)?;
    build_plan(hashed, threshold)
}

/// List the configured directory and plan it.
pub fn plan_directory(config: &DedupConfig, show_progress: bool) -> Result<DedupPlan> {
    let frames = list_frames(&config.directory, &config.extensions)?;
    log::info!(
        "{} frame(s) in {}",
        frames.len(),
        config.directory.display()
    );
    plan_frames(&frames, config.hash, config.threshold, show_progress)
}
