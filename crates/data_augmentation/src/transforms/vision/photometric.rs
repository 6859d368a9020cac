use crate::dataloader::{with_worker_rng, worker_gen_range};
use crate::transforms::vision::compose::{check_probability, Augmentation};
use crate::transforms::vision::targets::Targets;
use anyhow::{ensure, Result};
use image::{imageops, RgbImage};
use rand::seq::SliceRandom;

// Photometric steps only touch image targets. Masks pass through unchanged.

fn luma(p: &[u8]) -> f32 {
    0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ============================================================================
// RgbShift
// ============================================================================

/// Adds an independent random offset to each colour channel.
///
/// Offsets are drawn uniformly from `[-limit, limit]` per channel and
/// saturate at 0 and 255.
#[derive(Debug, Clone)]
pub struct RgbShift {
    limits: [i32; 3],
    p: f64,
}

impl RgbShift {
    pub fn new(r_shift_limit: i32, g_shift_limit: i32, b_shift_limit: i32, p: f64) -> Result<Self> {
        let limits = [r_shift_limit, g_shift_limit, b_shift_limit];
        ensure!(
            limits.iter().all(|&l| (0..=255).contains(&l)),
            "Shift limits must be in [0, 255] (got {:?})",
            limits
        );
        Ok(Self {
            limits,
            p: check_probability(p)?,
        })
    }
}

impl Augmentation for RgbShift {
    fn name(&self) -> &'static str {
        "RgbShift"
    }

    fn probability(&self) -> f64 {
        self.p
    }

    fn apply_always(&self, targets: Targets) -> Result<Targets> {
        let shifts = self.limits.map(|l| worker_gen_range(-l..=l));
        targets.map_images(|mut img| {
            for px in img.pixels_mut() {
                for (c, shift) in shifts.iter().enumerate() {
                    px.0[c] = (px.0[c] as i32 + shift).clamp(0, 255) as u8;
                }
            }
            Ok(img)
        })
    }
}

// ============================================================================
// Blur
// ============================================================================

/// Box blur with a random odd kernel size in `3..=blur_limit`.
#[derive(Debug, Clone)]
pub struct Blur {
    blur_limit: u32,
    p: f64,
}

impl Blur {
    pub fn new(blur_limit: u32, p: f64) -> Result<Self> {
        ensure!(
            blur_limit >= 3,
            "Blur limit must be at least 3 (got {})",
            blur_limit
        );
        Ok(Self {
            blur_limit,
            p: check_probability(p)?,
        })
    }
}

impl Augmentation for Blur {
    fn name(&self) -> &'static str {
        "Blur"
    }

    fn probability(&self) -> f64 {
        self.p
    }

    fn apply_always(&self, targets: Targets) -> Result<Targets> {
        let choices = (self.blur_limit - 3) / 2 + 1;
        let kernel = 3 + 2 * worker_gen_range(0..choices);
        targets.map_images(|img| Ok(box_blur(&img, kernel)))
    }
}

/// Separable mean filter with mirrored edges.
fn box_blur(img: &RgbImage, kernel: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    let radius = (kernel / 2) as i64;
    let mirror = |i: i64, n: u32| -> u32 {
        let n = n as i64;
        if n == 1 {
            return 0;
        }
        let period = 2 * (n - 1);
        let i = i.rem_euclid(period);
        (if i >= n { period - i } else { i }) as u32
    };

    let horizontal = RgbImage::from_fn(width, height, |x, y| {
        let mut sum = [0u32; 3];
        for k in -radius..=radius {
            let px = img.get_pixel(mirror(x as i64 + k, width), y);
            sum.iter_mut().zip(px.0).for_each(|(s, v)| *s += v as u32);
        }
        image::Rgb(sum.map(|s| to_u8(s as f32 / kernel as f32)))
    });

    RgbImage::from_fn(width, height, |x, y| {
        let mut sum = [0u32; 3];
        for k in -radius..=radius {
            let px = horizontal.get_pixel(x, mirror(y as i64 + k, height));
            sum.iter_mut().zip(px.0).for_each(|(s, v)| *s += v as u32);
        }
        image::Rgb(sum.map(|s| to_u8(s as f32 / kernel as f32)))
    })
}

// ============================================================================
// ColorJitter
// ============================================================================

/// Randomly changes brightness, contrast, saturation and hue.
///
/// Brightness, contrast and saturation factors are drawn from
/// `[max(0, 1 - x), 1 + x]`; the hue shift from `[-hue, hue]` of a full turn.
/// The four adjustments are applied in a random order.
///
/// # Example
/// ```ignore
/// let jitter = ColorJitter::new(0.5)?;                          // 0.2 each
/// let strong = ColorJitter::with_factors(0.4, 0.4, 0.4, 0.1, 0.8)?;
/// ```
#[derive(Debug, Clone)]
pub struct ColorJitter {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    hue: f32,
    p: f64,
}

#[derive(Debug, Clone, Copy)]
enum Adjustment {
    Brightness(f32),
    Contrast(f32),
    Saturation(f32),
    Hue(f32),
}

impl ColorJitter {
    pub fn new(p: f64) -> Result<Self> {
        Self::with_factors(0.2, 0.2, 0.2, 0.2, p)
    }

    pub fn with_factors(
        brightness: f32,
        contrast: f32,
        saturation: f32,
        hue: f32,
        p: f64,
    ) -> Result<Self> {
        ensure!(
            brightness >= 0.0 && contrast >= 0.0 && saturation >= 0.0,
            "Brightness, contrast and saturation must be non-negative (got {}, {}, {})",
            brightness,
            contrast,
            saturation
        );
        ensure!(
            (0.0..=0.5).contains(&hue),
            "Hue must be in [0.0, 0.5] range (got {})",
            hue
        );
        Ok(Self {
            brightness,
            contrast,
            saturation,
            hue,
            p: check_probability(p)?,
        })
    }

    fn factor(x: f32) -> f32 {
        worker_gen_range((1.0 - x).max(0.0)..=1.0 + x)
    }

    fn sample_adjustments(&self) -> [Adjustment; 4] {
        let mut adjustments = [
            Adjustment::Brightness(Self::factor(self.brightness)),
            Adjustment::Contrast(Self::factor(self.contrast)),
            Adjustment::Saturation(Self::factor(self.saturation)),
            Adjustment::Hue(worker_gen_range(-self.hue..=self.hue)),
        ];
        with_worker_rng(|rng| adjustments.shuffle(rng));
        adjustments
    }
}

/// Number of pixels in a `width` x `height` image, without `u32` overflow.
fn pixel_count(width: u32, height: u32) -> u64 {
    u64::from(width) * u64::from(height)
}

fn mean_luma(img: &RgbImage) -> f32 {
    let count = pixel_count(img.width(), img.height()).max(1);
    let total: f64 = img.pixels().map(|p| f64::from(luma(&p.0))).sum();
    (total / count as f64) as f32
}

impl Adjustment {
    fn apply(self, mut img: RgbImage) -> RgbImage {
        match self {
            Adjustment::Brightness(f) => {
                for px in img.pixels_mut() {
                    px.0 = px.0.map(|v| to_u8(v as f32 * f));
                }
                img
            }
            Adjustment::Contrast(f) => {
                let mean = mean_luma(&img);
                for px in img.pixels_mut() {
                    px.0 = px.0.map(|v| to_u8(f * v as f32 + (1.0 - f) * mean));
                }
                img
            }
            Adjustment::Saturation(f) => {
                for px in img.pixels_mut() {
                    let gray = luma(&px.0);
                    px.0 = px.0.map(|v| to_u8(f * v as f32 + (1.0 - f) * gray));
                }
                img
            }
            Adjustment::Hue(shift) => {
                let degrees = (shift * 360.0).round() as i32;
                if degrees == 0 {
                    img
                } else {
                    imageops::huerotate(&img, degrees)
                }
            }
        }
    }
}

impl Augmentation for ColorJitter {
    fn name(&self) -> &'static str {
        "ColorJitter"
    }

    fn probability(&self) -> f64 {
        self.p
    }

    fn apply_always(&self, targets: Targets) -> Result<Targets> {
        let adjustments = self.sample_adjustments();
        targets.map_images(|img| Ok(adjustments.iter().fold(img, |img, adj| adj.apply(img))))
    }
}
