use std::path::PathBuf;
use thiserror::Error;

use crate::fingerprint::HashKind;

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("Not a directory: {path}")]
    InvalidDirectory { path: PathBuf },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Incompatible fingerprints: {left_kind:?}/{left_bits} bits vs {right_kind:?}/{right_bits} bits")]
    IncompatibleFingerprint {
        left_kind: HashKind,
        left_bits: usize,
        right_kind: HashKind,
        right_bits: usize,
    },

    #[error("Failed to delete {path}: {source}")]
    Deletion {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {attempted} file(s) could not be removed")]
    IncompleteDeletion { failed: usize, attempted: usize },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = DedupError> = std::result::Result<T, E>;
