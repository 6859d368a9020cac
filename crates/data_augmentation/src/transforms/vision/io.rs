use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{imageops, DynamicImage, ImageReader, RgbImage};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

// ============================================================================
// LoadImage
// ============================================================================

/// Loads images from file paths.
///
/// Reads the whole file through a buffered reader, then lets `image` guess
/// the format from the content rather than the extension.
///
/// # Example
/// ```ignore
/// let image = LoadImage::new().apply(PathBuf::from("images/elon.jpeg"))?;
/// ```
#[derive(Debug, Clone)]
pub struct LoadImage {
    buffer_size: usize,
}

impl Default for LoadImage {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadImage {
    /// Creates a new image loader with an 8KB read buffer.
    pub fn new() -> Self {
        Self { buffer_size: 8192 }
    }

    fn load(&self, path: &Path) -> Result<DynamicImage> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;

        let file_size = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let mut buffer = Vec::with_capacity(file_size);
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read image: {}", path.display()))?;

        ImageReader::new(Cursor::new(buffer))
            .with_guessed_format()
            .with_context(|| format!("Failed to detect image format: {}", path.display()))?
            .decode()
            .with_context(|| format!("Failed to decode image: {}", path.display()))
    }
}

impl Transform<PathBuf, DynamicImage> for LoadImage {
    fn apply(&self, path: PathBuf) -> Result<DynamicImage> {
        self.load(&path)
    }
}

/// Loads an image and converts it to 8-bit RGB.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage> {
    Ok(LoadImage::new().load(path.as_ref())?.to_rgb8())
}

/// Loads a mask, keeping its native colour type.
pub fn load_mask(path: impl AsRef<Path>) -> Result<DynamicImage> {
    LoadImage::new().load(path.as_ref())
}

/// Splits a side-by-side image into its left and right halves.
///
/// The left half covers columns `[0, split)` and the right half
/// `[split, width)`. Without an explicit `split_at` the image is cut at
/// `width / 2`.
pub fn split_stitched(image: &RgbImage, split_at: Option<u32>) -> Result<(RgbImage, RgbImage)> {
    let (width, height) = image.dimensions();
    ensure!(
        width >= 2,
        "Stitched image must be at least 2 pixels wide (got {})",
        width
    );

    let split = split_at.unwrap_or(width / 2);
    ensure!(
        split > 0 && split < width,
        "Split column {} is outside (0, {})",
        split,
        width
    );

    let left = imageops::crop_imm(image, 0, 0, split, height).to_image();
    let right = imageops::crop_imm(image, split, 0, width - split, height).to_image();
    Ok((left, right))
}
