use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{DedupError, Result};
use crate::fingerprint::Fingerprint;

/// Maximum Hamming distance at which two frames count as duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Threshold(pub u32);

impl Threshold {
    pub const DEFAULT: Threshold = Threshold(5);
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Threshold {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(Threshold)
    }
}

/// Number of differing bits between two fingerprints.
pub fn distance(a: &Fingerprint, b: &Fingerprint) -> Result<u32> {
    if a.kind() != b.kind() || a.bit_len() != b.bit_len() {
        return Err(DedupError::IncompatibleFingerprint {
            left_kind: a.kind(),
            left_bits: a.bit_len(),
            right_kind: b.kind(),
            right_bits: b.bit_len(),
        });
    }

    Ok(a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum())
}

pub fn is_duplicate(a: &Fingerprint, b: &Fingerprint, threshold: Threshold) -> Result<bool> {
    Ok(distance(a, b)? <= threshold.0)
}
