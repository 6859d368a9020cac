//! Tiling images into a single grid for quick inspection.

use anyhow::{bail, ensure, Context, Result};
use image::{imageops, DynamicImage, RgbImage};
use std::fs;
use std::path::Path;
use tch::{Device, Kind, Tensor};

/// Images per row in [`save_tensor_batch`].
pub const TENSOR_GRID_COLUMNS: u32 = 8;
/// Black border between cells in [`save_tensor_batch`].
pub const TENSOR_GRID_PADDING: u32 = 2;

/// Tiles `images` row by row, `columns` per row, with `padding` black pixels
/// around every cell. Cells take the size of the largest image; smaller
/// images sit in the top-left corner of their cell.
pub fn image_grid(images: &[RgbImage], columns: u32, padding: u32) -> Result<RgbImage> {
    ensure!(!images.is_empty(), "Cannot build a grid from zero images");
    ensure!(columns > 0, "Grid needs at least one column");

    let cell_width = images.iter().map(|i| i.width()).max().unwrap_or(0);
    let cell_height = images.iter().map(|i| i.height()).max().unwrap_or(0);
    let columns = columns.min(images.len() as u32);
    let rows = (images.len() as u32).div_ceil(columns);

    let mut canvas = RgbImage::new(
        columns * (cell_width + padding) + padding,
        rows * (cell_height + padding) + padding,
    );
    for (i, image) in images.iter().enumerate() {
        let (row, col) = (i as u32 / columns, i as u32 % columns);
        let x = padding + col * (cell_width + padding);
        let y = padding + row * (cell_height + padding);
        imageops::replace(&mut canvas, image, x as i64, y as i64);
    }
    Ok(canvas)
}

/// Converts a mask of any colour type to RGB for display.
///
/// Binary masks stored as 0/1 are stretched to 0/255 so they are visible.
pub fn mask_to_rgb(mask: &DynamicImage) -> RgbImage {
    let mut rgb = mask.to_rgb8();
    if rgb.pixels().all(|p| p.0.iter().all(|&v| v <= 1)) {
        for value in rgb.iter_mut() {
            *value *= 255;
        }
    }
    rgb
}

/// Converts one `[3, H, W]` float tensor in `[0, 1]` to an RGB image.
/// Values outside the range are clamped.
pub fn tensor_to_image(tensor: &Tensor) -> Result<RgbImage> {
    let size = tensor.size();
    ensure!(
        size.len() == 3 && size[0] == 3,
        "Expected a [3, H, W] tensor, got {:?}",
        size
    );
    let (height, width) = (size[1] as u32, size[2] as u32);

    let bytes = tensor
        .to_device(Device::Cpu)
        .to_kind(Kind::Float)
        .clamp(0.0, 1.0)
        .f_mul_scalar(255.0)?
        .round()
        .to_kind(Kind::Uint8)
        .permute([1, 2, 0])
        .contiguous()
        .flatten(0, -1);
    let pixels = Vec::<u8>::try_from(&bytes).context("Failed to copy tensor data")?;

    RgbImage::from_raw(width, height, pixels)
        .with_context(|| format!("Tensor data does not fit a {}x{} RGB image", width, height))
}

/// Saves a `[B, 3, H, W]` (or `[3, H, W]`) float tensor in `[0, 1]` as one
/// grid image, 8 per row with 2-pixel padding. Parent directories are created.
pub fn save_tensor_batch(tensor: &Tensor, path: impl AsRef<Path>) -> Result<()> {
    let batch = match tensor.dim() {
        3 => tensor.unsqueeze(0),
        4 => tensor.shallow_clone(),
        d => bail!("Expected a 3D or 4D tensor, got {}D", d),
    };

    let images = (0..batch.size()[0])
        .map(|i| tensor_to_image(&batch.get(i)))
        .collect::<Result<Vec<_>>>()?;
    save_image_grid(&images, TENSOR_GRID_COLUMNS, TENSOR_GRID_PADDING, path)
}

/// Builds an [`image_grid`] and writes it to `path`, creating parent directories.
pub fn save_image_grid(
    images: &[RgbImage],
    columns: u32,
    padding: u32,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let grid = image_grid(images, columns, padding)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    grid.save(path)
        .with_context(|| format!("Failed to save image grid: {}", path.display()))
}
