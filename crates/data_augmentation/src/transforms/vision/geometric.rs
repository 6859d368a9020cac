use crate::dataloader::worker_gen_range;
use crate::transforms::vision::compose::{check_probability, Augmentation};
use crate::transforms::vision::targets::Targets;
use anyhow::{ensure, Context, Result};
use image::{imageops, imageops::FilterType, DynamicImage, ImageBuffer, Pixel};

// ============================================================================
// Resize
// ============================================================================

/// Resizes every target to exactly `width x height`.
///
/// The aspect ratio is not preserved. Image targets are resampled with a
/// bilinear filter, masks with nearest neighbour so label values survive.
///
/// # Example
/// ```ignore
/// let resize = Resize::new(1920, 1080)?;
/// let out = resize.maybe_apply(Targets::new(image))?;
/// assert_eq!(out.dimensions(), (1920, 1080));
/// ```
#[derive(Debug, Clone)]
pub struct Resize {
    width: u32,
    height: u32,
    p: f64,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "Image dimensions must be positive after resizing (got {}x{})",
            width,
            height
        );
        Ok(Self {
            width,
            height,
            p: 1.0,
        })
    }

    pub fn with_probability(mut self, p: f64) -> Result<Self> {
        self.p = check_probability(p)?;
        Ok(self)
    }
}

impl Augmentation for Resize {
    fn name(&self) -> &'static str {
        "Resize"
    }

    fn probability(&self) -> f64 {
        self.p
    }

    fn apply_always(&self, targets: Targets) -> Result<Targets> {
        let (width, height) = (self.width, self.height);
        targets.map_spatial(
            |img| Ok(imageops::resize(&img, width, height, FilterType::Triangle)),
            |mask| Ok(mask.resize_exact(width, height, FilterType::Nearest)),
        )
    }
}

// ============================================================================
// RandomCrop
// ============================================================================

/// Crops a `width x height` window at a uniformly random position.
///
/// The window position is drawn once per call from the primary image size
/// and reused for every target.
#[derive(Debug, Clone)]
pub struct RandomCrop {
    width: u32,
    height: u32,
    p: f64,
}

impl RandomCrop {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "Crop dimensions must be positive (got {}x{})",
            width,
            height
        );
        Ok(Self {
            width,
            height,
            p: 1.0,
        })
    }

    pub fn with_probability(mut self, p: f64) -> Result<Self> {
        self.p = check_probability(p)?;
        Ok(self)
    }
}

impl Augmentation for RandomCrop {
    fn name(&self) -> &'static str {
        "RandomCrop"
    }

    fn probability(&self) -> f64 {
        self.p
    }

    fn apply_always(&self, targets: Targets) -> Result<Targets> {
        let (img_w, img_h) = targets.dimensions();
        ensure!(
            self.width <= img_w && self.height <= img_h,
            "Crop size {}x{} exceeds input size {}x{}",
            self.width,
            self.height,
            img_w,
            img_h
        );

        let x = worker_gen_range(0..=img_w - self.width);
        let y = worker_gen_range(0..=img_h - self.height);
        let (w, h) = (self.width, self.height);

        targets.map_spatial(
            |img| Ok(imageops::crop_imm(&img, x, y, w, h).to_image()),
            |mask| Ok(mask.crop_imm(x, y, w, h)),
        )
    }
}

// ============================================================================
// Rotate
// ============================================================================

/// How pixels that fall outside the source are filled after rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    /// Fill with a constant intensity on every channel.
    Constant(u8),
    /// Mirror without repeating the edge pixel (`dcb|abcd|cba`).
    Reflect101,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interpolation {
    Nearest,
    Bilinear,
}

/// Rotates every target by an angle drawn uniformly from `[-limit, limit]`
/// degrees about the image centre. The canvas size is unchanged.
///
/// Positive angles rotate counter-clockwise. Image targets are sampled
/// bilinearly; masks use nearest neighbour and, in constant mode, are
/// filled with `mask_value` (0 by default).
///
/// # Example
/// ```ignore
/// let rotate = Rotate::new(40.0, 0.9)?.border_mode(BorderMode::Constant(0));
/// ```
#[derive(Debug, Clone)]
pub struct Rotate {
    limit: f64,
    border_mode: BorderMode,
    mask_value: u8,
    p: f64,
}

impl Rotate {
    pub fn new(limit: f64, p: f64) -> Result<Self> {
        ensure!(
            limit.is_finite() && limit >= 0.0,
            "Rotation limit must be a non-negative number of degrees (got {})",
            limit
        );
        Ok(Self {
            limit,
            border_mode: BorderMode::Reflect101,
            mask_value: 0,
            p: check_probability(p)?,
        })
    }

    pub fn border_mode(mut self, mode: BorderMode) -> Self {
        self.border_mode = mode;
        self
    }

    /// Fill value for masks when the border mode is constant.
    pub fn mask_value(mut self, value: u8) -> Self {
        self.mask_value = value;
        self
    }
}

impl Augmentation for Rotate {
    fn name(&self) -> &'static str {
        "Rotate"
    }

    fn probability(&self) -> f64 {
        self.p
    }

    fn apply_always(&self, targets: Targets) -> Result<Targets> {
        let angle = if self.limit > 0.0 {
            worker_gen_range(-self.limit..=self.limit)
        } else {
            0.0
        };

        let image_border = self.border_mode;
        let mask_border = match self.border_mode {
            BorderMode::Constant(_) => BorderMode::Constant(self.mask_value),
            BorderMode::Reflect101 => BorderMode::Reflect101,
        };

        targets.map_spatial(
            |img| rotate_buffer(&img, angle, image_border, Interpolation::Bilinear),
            |mask| rotate_mask(mask, angle, mask_border),
        )
    }
}

fn rotate_mask(mask: DynamicImage, angle: f64, border: BorderMode) -> Result<DynamicImage> {
    let nearest = Interpolation::Nearest;
    Ok(match mask {
        DynamicImage::ImageLuma8(m) => {
            DynamicImage::ImageLuma8(rotate_buffer(&m, angle, border, nearest)?)
        }
        DynamicImage::ImageLumaA8(m) => {
            DynamicImage::ImageLumaA8(rotate_buffer(&m, angle, border, nearest)?)
        }
        DynamicImage::ImageRgb8(m) => {
            DynamicImage::ImageRgb8(rotate_buffer(&m, angle, border, nearest)?)
        }
        DynamicImage::ImageRgba8(m) => {
            DynamicImage::ImageRgba8(rotate_buffer(&m, angle, border, nearest)?)
        }
        other => DynamicImage::ImageRgb8(rotate_buffer(&other.to_rgb8(), angle, border, nearest)?),
    })
}

fn rotate_buffer<P>(
    img: &ImageBuffer<P, Vec<u8>>,
    angle: f64,
    border: BorderMode,
    interpolation: Interpolation,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = img.dimensions();
    let raw = rotate_raw(
        img.as_raw(),
        width,
        height,
        P::CHANNEL_COUNT as usize,
        angle,
        border,
        interpolation,
    );
    ImageBuffer::from_raw(width, height, raw).context("Rotated buffer has an unexpected length")
}

/// Index into `[0, n)` mirrored at both ends without repeating the edge.
fn reflect101(i: i64, n: i64) -> i64 {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let i = i.rem_euclid(period);
    if i >= n {
        period - i
    } else {
        i
    }
}

/// Inverse-maps each output pixel into the source through the rotation.
fn rotate_raw(
    src: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    angle: f64,
    border: BorderMode,
    interpolation: Interpolation,
) -> Vec<u8> {
    let (w, h) = (width as i64, height as i64);
    let cx = (width as f64 - 1.0) / 2.0;
    let cy = (height as f64 - 1.0) / 2.0;
    let (sin, cos) = angle.to_radians().sin_cos();

    let fetch = |x: i64, y: i64, c: usize| -> f64 {
        match border {
            BorderMode::Constant(v) if x < 0 || y < 0 || x >= w || y >= h => v as f64,
            _ => {
                let (x, y) = (reflect101(x, w), reflect101(y, h));
                src[(y * w + x) as usize * channels + c] as f64
            }
        }
    };

    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let sx = cx + cos * dx - sin * dy;
            let sy = cy + sin * dx + cos * dy;
            let base = (y * w + x) as usize * channels;

            match interpolation {
                Interpolation::Nearest => {
                    let (ix, iy) = (sx.round() as i64, sy.round() as i64);
                    for c in 0..channels {
                        out[base + c] = fetch(ix, iy, c) as u8;
                    }
                }
                Interpolation::Bilinear => {
                    let (x0, y0) = (sx.floor(), sy.floor());
                    let (fx, fy) = (sx - x0, sy - y0);
                    let (x0, y0) = (x0 as i64, y0 as i64);
                    for c in 0..channels {
                        let top = fetch(x0, y0, c) * (1.0 - fx) + fetch(x0 + 1, y0, c) * fx;
                        let bottom =
                            fetch(x0, y0 + 1, c) * (1.0 - fx) + fetch(x0 + 1, y0 + 1, c) * fx;
                        let value = top * (1.0 - fy) + bottom * fy;
                        out[base + c] = value.round().clamp(0.0, 255.0) as u8;
                    }
                }
            }
        }
    }
    out
}

// ============================================================================
// Flips
// ============================================================================

/// Mirrors every target left to right.
#[derive(Debug, Clone)]
pub struct HorizontalFlip {
    p: f64,
}

impl HorizontalFlip {
    pub fn new(p: f64) -> Result<Self> {
        Ok(Self {
            p: check_probability(p)?,
        })
    }
}

impl Augmentation for HorizontalFlip {
    fn name(&self) -> &'static str {
        "HorizontalFlip"
    }

    fn probability(&self) -> f64 {
        self.p
    }

    fn apply_always(&self, targets: Targets) -> Result<Targets> {
        targets.map_spatial(
            |mut img| {
                imageops::flip_horizontal_in_place(&mut img);
                Ok(img)
            },
            |mask| Ok(mask.fliph()),
        )
    }
}

/// Mirrors every target top to bottom.
#[derive(Debug, Clone)]
pub struct VerticalFlip {
    p: f64,
}

impl VerticalFlip {
    pub fn new(p: f64) -> Result<Self> {
        Ok(Self {
            p: check_probability(p)?,
        })
    }
}

impl Augmentation for VerticalFlip {
    fn name(&self) -> &'static str {
        "VerticalFlip"
    }

    fn probability(&self) -> f64 {
        self.p
    }

    fn apply_always(&self, targets: Targets) -> Result<Targets> {
        targets.map_spatial(
            |mut img| {
                imageops::flip_vertical_in_place(&mut img);
                Ok(img)
            },
            |mask| Ok(mask.flipv()),
        )
    }
}
