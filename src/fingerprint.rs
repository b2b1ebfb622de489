use image::{DynamicImage, ImageError, ImageReader};
use image_hasher::{HashAlg, Hasher, HasherConfig};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fmt;
use std::path::Path;

use crate::error::{DedupError, Result};
use crate::frames::Frame;

/// Grid every fingerprint is computed on. Most kinds hash one bit per
/// cell; see [`HashKind::bit_len`] for the exceptions.
pub const HASH_WIDTH: u32 = 8;
pub const HASH_HEIGHT: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum HashKind {
    /// Mean hash over DCT coefficients (pHash)
    #[default]
    Perceptual,
    /// Average hash: each cell against the grid mean
    Mean,
    /// Difference hash: each cell against its right neighbour
    Gradient,
    /// Horizontal and vertical difference hash
    DoubleGradient,
    /// Blockhash.io algorithm
    Blockhash,
}

impl HashKind {
    fn algorithm(self) -> HashAlg {
        match self {
            HashKind::Perceptual | HashKind::Mean => HashAlg::Mean,
            HashKind::Gradient => HashAlg::Gradient,
            HashKind::DoubleGradient => HashAlg::DoubleGradient,
            HashKind::Blockhash => HashAlg::Blockhash,
        }
    }

    /// Width in bits of the fingerprints this kind produces on the
    /// [`HASH_WIDTH`]×[`HASH_HEIGHT`] grid.
    pub const fn bit_len(self) -> u32 {
        match self {
            // Gradients over a half-size grid plus one cell, once per axis.
            HashKind::DoubleGradient => {
                let (w, h) = (HASH_WIDTH / 2 + 1, HASH_HEIGHT / 2 + 1);
                (w - 1) * h + w * (h - 1)
            }
            _ => HASH_WIDTH * HASH_HEIGHT,
        }
    }
}

/// Perceptual hash of one frame.
///
/// Only fingerprints of the same [`HashKind`] and bit length can be compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    kind: HashKind,
    bits: Vec<u8>,
}

impl Fingerprint {
    pub fn from_bytes(kind: HashKind, bits: Vec<u8>) -> Self {
        Self { kind, bits }
    }

    /// 64-bit fingerprint from an integer, most significant byte first.
    pub fn from_u64(kind: HashKind, value: u64) -> Self {
        Self::from_bytes(kind, value.to_be_bytes().to_vec())
    }

    pub fn kind(&self) -> HashKind {
        self.kind
    }

    pub fn bit_len(&self) -> usize {
        self.bits.len() * 8
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.bits {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Computes fingerprints for decoded images and image files.
pub struct Fingerprinter {
    kind: HashKind,
    hasher: Hasher,
    show_progress: bool,
}

impl Fingerprinter {
    pub fn new(kind: HashKind) -> Self {
        let config = HasherConfig::new()
            .hash_size(HASH_WIDTH, HASH_HEIGHT)
            .hash_alg(kind.algorithm());
        let config = match kind {
            HashKind::Perceptual => config.preproc_dct(),
            _ => config,
        };

        Self {
            kind,
            hasher: config.to_hasher(),
            show_progress: false,
        }
    }

    /// Draw a progress bar while hashing a sequence of frames.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn kind(&self) -> HashKind {
        self.kind
    }

    pub fn fingerprint_image(&self, image: &DynamicImage) -> Fingerprint {
        let hash = self.hasher.hash_image(image);
        Fingerprint::from_bytes(self.kind, hash.as_bytes().to_vec())
    }

    /// Decode `path` and fingerprint it. The decoded image is dropped on return.
    ///
    /// The format is sniffed from the file contents; the extension is only a
    /// fallback when the contents are not recognised.
    pub fn fingerprint_file(&self, path: &Path) -> Result<Fingerprint> {
        let image = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(ImageError::IoError)
            .and_then(|reader| reader.decode())
            .map_err(|source| DedupError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(self.fingerprint_image(&image))
    }

    /// Fingerprint every frame, in parallel, returning pairs in input order.
    ///
    /// The first frame that fails to decode aborts the whole batch.
    pub fn fingerprint_frames(&self, frames: &[Frame]) -> Result<Vec<(Frame, Fingerprint)>> {
        let bar = if self.show_progress {
            let bar = ProgressBar::new(frames.len() as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("=> "));
            }
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message("hashing");

        let result = frames
            .par_iter()
            .map(|frame| -> Result<(Frame, Fingerprint)> {
                let fingerprint = self.fingerprint_file(&frame.path)?;
                log::debug!("{} -> {}", frame.name(), fingerprint);
                bar.inc(1);
                Ok((frame.clone(), fingerprint))
            })
            .collect::<Result<Vec<_>>>();

        match &result {
            Ok(_) => bar.finish_with_message("hashed"),
            Err(_) => bar.abandon_with_message("failed"),
        }
        result
    }
}
