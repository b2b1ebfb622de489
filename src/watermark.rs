//! Fixed-position watermark removal for the frames that survive dedup.
//!
//! A [`RegionSelector`] supplies the rectangle once, from the first image.
//! Every image then gets the same rectangle masked (plus a small padding)
//! and filled in from the surrounding pixels.

use image::{GrayImage, Luma, Rgb, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::frames::{Frame, list_frames};

/// Extensions accepted as watermark input.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "webp"];

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Frame listing error: {0}")]
    Frames(#[from] crate::error::DedupError),

    #[error("Region prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Not a file or directory: {path}")]
    InvalidInput { path: PathBuf },

    #[error("No images to process")]
    NoImages,
}

pub type Result<T, E = WatermarkError> = std::result::Result<T, E>;

/// Rectangle in pixels, measured from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Clip to an image of the given size. `None` when nothing is left.
    pub fn clamp(self, image_width: u32, image_height: u32) -> Option<Region> {
        let x = self.x.min(image_width);
        let y = self.y.min(image_height);
        let width = self.width.min(image_width - x);
        let height = self.height.min(image_height - y);
        (width > 0 && height > 0).then_some(Region { x, y, width, height })
    }
}

/// Source of the watermark rectangle.
///
/// `sample` is the first image of the batch. Returning `Ok(None)` cancels
/// the run without touching anything.
pub trait RegionSelector {
    fn select(&mut self, sample: &Path) -> Result<Option<Region>>;
}

/// Coordinates given up front, for batch runs.
pub struct FixedRegion(pub Region);

impl RegionSelector for FixedRegion {
    fn select(&mut self, _sample: &Path) -> Result<Option<Region>> {
        Ok(Some(self.0))
    }
}

/// Asks for the rectangle on the terminal.
pub struct PromptRegion;

impl RegionSelector for PromptRegion {
    fn select(&mut self, sample: &Path) -> Result<Option<Region>> {
        let (width, height) = image::image_dimensions(sample)?;
        println!(
            "▶ Watermark region for {} ({}x{}); width or height 0 cancels",
            sample.display(),
            width,
            height
        );

        let ask = |prompt: &str| {
            dialoguer::Input::<u32>::new()
                .with_prompt(prompt)
                .interact_text()
        };
        let region = Region::new(ask("x")?, ask("y")?, ask("width")?, ask("height")?);
        if region.width == 0 || region.height == 0 {
            return Ok(None);
        }

        println!(
            "   TIP: reuse with --coords {} {} {} {}",
            region.x, region.y, region.width, region.height
        );
        Ok(Some(region))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum InpaintMethod {
    /// Known neighbours weighted by inverse distance
    #[default]
    Weighted,
    /// Plain mean of known neighbours
    Mean,
}

#[derive(Debug, Clone)]
pub struct WatermarkOptions {
    pub radius: u32,
    pub method: InpaintMethod,
    pub padding: u32,
    pub out_dir: PathBuf,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            radius: 5,
            method: InpaintMethod::Weighted,
            padding: 2,
            out_dir: PathBuf::from("cleaned"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatermarkReport {
    pub region: Option<Region>,
    pub processed: usize,
    pub failed: usize,
}

/// Images to process: the file itself, or the images directly inside a directory.
pub fn collect_images(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if input.is_dir() {
        let extensions: Vec<String> = IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect();
        let frames = list_frames(input, &extensions)?;
        return Ok(frames.into_iter().map(|f: Frame| f.path).collect());
    }
    Err(WatermarkError::InvalidInput {
        path: input.to_path_buf(),
    })
}

/// Mask with the padded region set to 255, clipped to the image.
pub fn build_mask(width: u32, height: u32, region: Region, padding: u32) -> GrayImage {
    let x1 = region.x.saturating_sub(padding);
    let y1 = region.y.saturating_sub(padding);
    let x2 = region
        .x
        .saturating_add(region.width)
        .saturating_add(padding)
        .min(width);
    let y2 = region
        .y
        .saturating_add(region.height)
        .saturating_add(padding)
        .min(height);

    GrayImage::from_fn(width, height, |x, y| {
        if x >= x1 && x < x2 && y >= y1 && y < y2 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Fill masked pixels from the edge of the hole inwards.
///
/// Each pass fills the masked pixels that touch a known pixel, using the
/// known pixels within `radius`. Filled pixels count as known on the next
/// pass. A fully masked image is returned unchanged.
pub fn inpaint(image: &RgbImage, mask: &GrayImage, radius: u32, method: InpaintMethod) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();
    let mut known: Vec<bool> = mask.pixels().map(|p| p[0] == 0).collect();
    let index = |x: u32, y: u32| (y * width + x) as usize;

    let mut pending: Vec<(u32, u32)> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .filter(|&(x, y)| !known[index(x, y)])
        .collect();
    let r = radius.max(1) as i64;

    while !pending.is_empty() {
        let fills: Vec<((u32, u32), Rgb<u8>)> = pending
            .iter()
            .filter(|&&(x, y)| touches_known(&known, width, height, x, y))
            .filter_map(|&(x, y)| {
                estimate(&out, &known, x, y, r, method).map(|px| ((x, y), px))
            })
            .collect();
        if fills.is_empty() {
            break;
        }

        for ((x, y), px) in fills {
            out.put_pixel(x, y, px);
            known[index(x, y)] = true;
        }
        pending.retain(|&(x, y)| !known[index(x, y)]);
    }

    out
}

fn touches_known(known: &[bool], width: u32, height: u32, x: u32, y: u32) -> bool {
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if (dx, dy) == (0, 0) || nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            if known[(ny as u32 * width + nx as u32) as usize] {
                return true;
            }
        }
    }
    false
}

fn estimate(
    image: &RgbImage,
    known: &[bool],
    x: u32,
    y: u32,
    r: i64,
    method: InpaintMethod,
) -> Option<Rgb<u8>> {
    let (width, height) = image.dimensions();
    let mut sum = [0f64; 3];
    let mut total = 0f64;

    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = dx * dx + dy * dy;
            if d2 == 0 || d2 > r * r {
                continue;
            }
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if !known[(ny * width + nx) as usize] {
                continue;
            }

            let weight = match method {
                InpaintMethod::Weighted => 1.0 / (d2 as f64).sqrt(),
                InpaintMethod::Mean => 1.0,
            };
            let px = image.get_pixel(nx, ny);
            for c in 0..3 {
                sum[c] += px[c] as f64 * weight;
            }
            total += weight;
        }
    }

    (total > 0.0).then(|| {
        Rgb([
            (sum[0] / total).round().clamp(0.0, 255.0) as u8,
            (sum[1] / total).round().clamp(0.0, 255.0) as u8,
            (sum[2] / total).round().clamp(0.0, 255.0) as u8,
        ])
    })
}

fn clean_one(path: &Path, region: Region, options: &WatermarkOptions) -> Result<()> {
    let image = image::open(path)?.to_rgb8();
    let (width, height) = image.dimensions();

    let cleaned = match region.clamp(width, height) {
        Some(region) => {
            let mask = build_mask(width, height, region, options.padding);
            inpaint(&image, &mask, options.radius, options.method)
        }
        None => image,
    };

    let file_name = path.file_name().ok_or_else(|| WatermarkError::InvalidInput {
        path: path.to_path_buf(),
    })?;
    cleaned.save(options.out_dir.join(file_name))?;
    Ok(())
}

/// Erase the selected region from every file, writing copies to `out_dir`.
///
/// Returns `Ok(None)` when the selector cancels. Images that fail to load
/// or save are counted in `failed` and do not stop the batch.
pub fn remove_watermark(
    files: &[PathBuf],
    selector: &mut dyn RegionSelector,
    options: &WatermarkOptions,
) -> Result<Option<WatermarkReport>> {
    let Some(first) = files.first() else {
        return Err(WatermarkError::NoImages);
    };
    let Some(region) = selector.select(first)? else {
        log::info!("watermark region selection cancelled");
        return Ok(None);
    };

    fs::create_dir_all(&options.out_dir)?;
    log::info!(
        "region x={} y={} w={} h={}, {:?} radius {}",
        region.x,
        region.y,
        region.width,
        region.height,
        options.method,
        options.radius
    );

    let bar = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}") {
        bar.set_style(style.progress_chars("=> "));
    }

    let results: Vec<bool> = files
        .par_iter()
        .map(|path| {
            let result = clean_one(path, region, options);
            bar.inc(1);
            match result {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("could not clean {}: {}", path.display(), e);
                    false
                }
            }
        })
        .collect();
    bar.finish_and_clear();

    let processed = results.iter().filter(|ok| **ok).count();
    Ok(Some(WatermarkReport {
        region: Some(region),
        processed,
        failed: results.len() - processed,
    }))
}
