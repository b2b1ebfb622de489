use std::path::PathBuf;

use crate::error::{DedupError, Result};
use crate::executor::Mode;
use crate::fingerprint::HashKind;
use crate::frames::DEFAULT_EXTENSIONS;
use crate::policy::Threshold;

/// Settings for one dedup run over a frames directory.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    pub directory: PathBuf,
    pub threshold: Threshold,
    pub hash: HashKind,
    pub extensions: Vec<String>,
    pub mode: Mode,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("frames"),
            threshold: Threshold::DEFAULT,
            hash: HashKind::default(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            mode: Mode::Execute,
        }
    }
}

impl DedupConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    /// Normalise extensions and reject settings that cannot work.
    pub fn validate(mut self) -> Result<Self> {
        self.extensions = self
            .extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self.extensions.sort();
        self.extensions.dedup();

        if self.extensions.is_empty() {
            return Err(DedupError::InvalidConfig {
                message: "at least one file extension is required".to_string(),
            });
        }
        if self.drops_everything() {
            log::warn!(
                "threshold {} covers the whole {}-bit {:?} hash; every frame after the first will be dropped",
                self.threshold,
                self.hash.bit_len(),
                self.hash
            );
        }
        Ok(self)
    }

    /// True when the threshold is at least the fingerprint width, so every
    /// frame lands in the first cluster.
    pub fn drops_everything(&self) -> bool {
        self.threshold.0 >= self.hash.bit_len()
    }
}
