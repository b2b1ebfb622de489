use serde::Serialize;

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::frames::Frame;
use crate::policy::{Threshold, distance};

/// A frame that was dropped, and how far it was from the frame it duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duplicate {
    pub frame: Frame,
    pub distance: u32,
}

/// One kept frame followed by the run of frames it absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub kept: Frame,
    pub dropped: Vec<Duplicate>,
}

impl Cluster {
    fn new(kept: Frame) -> Self {
        Self {
            kept,
            dropped: Vec::new(),
        }
    }

    /// Frames in this cluster, the kept one included.
    pub fn size(&self) -> usize {
        1 + self.dropped.len()
    }
}

/// Keep/drop partition of a frame sequence.
///
/// Every input frame appears exactly once, either as a cluster's `kept`
/// frame or in its `dropped` list. Clusters are in sequence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupPlan {
    pub threshold: Threshold,
    pub clusters: Vec<Cluster>,
}

impl DedupPlan {
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn total_frames(&self) -> usize {
        self.clusters.iter().map(Cluster::size).sum()
    }

    pub fn kept_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn dropped_count(&self) -> usize {
        self.clusters.iter().map(|c| c.dropped.len()).sum()
    }

    pub fn kept(&self) -> impl Iterator<Item = &Frame> {
        self.clusters.iter().map(|c| &c.kept)
    }

    /// Dropped frames paired with the kept frame each one duplicates.
    pub fn dropped(&self) -> impl Iterator<Item = (&Duplicate, &Frame)> {
        self.clusters
            .iter()
            .flat_map(|c| c.dropped.iter().map(move |d| (d, &c.kept)))
    }
}

/// What happened to a single frame pushed into the clusterer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Drop { duplicate_of: usize, distance: u32 },
}

/// Single-pass contiguous-run clustering.
///
/// Each frame is compared only with the most recently kept frame. A frame
/// within the threshold is dropped and the representative stays put;
/// otherwise the frame is kept and becomes the new representative. Frames
/// must be pushed in ascending sequence order.
pub struct SequentialClusterer {
    threshold: Threshold,
    current: Option<(Fingerprint, Cluster)>,
    finished: Vec<Cluster>,
}

impl SequentialClusterer {
    pub fn new(threshold: Threshold) -> Self {
        Self {
            threshold,
            current: None,
            finished: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: Frame, fingerprint: Fingerprint) -> Result<Decision> {
        if let Some((representative, cluster)) = self.current.as_mut() {
            let distance = distance(representative, &fingerprint)?;
            if distance <= self.threshold.0 {
                let duplicate_of = cluster.kept.position;
                log::debug!(
                    "drop {} (distance {} to {})",
                    frame.name(),
                    distance,
                    cluster.kept.name()
                );
                cluster.dropped.push(Duplicate { frame, distance });
                return Ok(Decision::Drop {
                    duplicate_of,
                    distance,
                });
            }
            log::debug!("keep {} (distance {})", frame.name(), distance);
        }

        if let Some((_, done)) = self.current.replace((fingerprint, Cluster::new(frame))) {
            self.finished.push(done);
        }
        Ok(Decision::Keep)
    }

    pub fn finish(mut self) -> DedupPlan {
        if let Some((_, cluster)) = self.current.take() {
            self.finished.push(cluster);
        }
        DedupPlan {
            threshold: self.threshold,
            clusters: self.finished,
        }
    }
}

/// Cluster a fingerprinted sequence, ordering it by position first.
pub fn build_plan<I>(frames: I, threshold: Threshold) -> Result<DedupPlan>
where
    I: IntoIterator<Item = (Frame, Fingerprint)>,
{
    let mut frames: Vec<_> = frames.into_iter().collect();
    frames.sort_by_key(|(frame, _)| frame.position);

    let mut clusterer = SequentialClusterer::new(threshold);
    for (frame, fingerprint) in frames {
        clusterer.push(frame, fingerprint)?;
    }
    Ok(clusterer.finish())
}
