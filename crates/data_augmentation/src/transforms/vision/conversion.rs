use crate::sample::Sample;
use crate::transforms::vision::targets::{Targets, IMAGE};
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GenericImageView};
use tch::{Kind, Tensor};

// ============================================================================
// ToTensor
// ============================================================================

/// Converts an `H x W x C` image into a `[C, H, W]` `Uint8` tensor.
///
/// Pixel values are not rescaled; pair with [`Normalize`] to get floats.
///
/// Channel Handling
/// | Input Format  | Output Shape |
/// |---------------|--------------|
/// | Grayscale (L) | `[1, H, W]`  |
/// | Gray + alpha  | `[2, H, W]`  |
/// | RGB           | `[3, H, W]`  |
/// | RGBA          | `[4, H, W]`  |
/// | Other         | `[3, H, W]`  |
#[derive(Debug, Clone, Copy)]
pub struct ToTensor;

impl Transform<DynamicImage, Tensor> for ToTensor {
    fn apply(&self, img: DynamicImage) -> Result<Tensor> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            "Image dimensions must be positive (got {}x{})",
            width,
            height
        );

        let (raw, channels) = match img {
            DynamicImage::ImageLuma8(img) => (img.into_raw(), 1),
            DynamicImage::ImageLumaA8(img) => (img.into_raw(), 2),
            DynamicImage::ImageRgb8(img) => (img.into_raw(), 3),
            DynamicImage::ImageRgba8(img) => (img.into_raw(), 4),
            other => (other.to_rgb8().into_raw(), 3),
        };

        Tensor::from_slice(&raw)
            .f_reshape([height as i64, width as i64, channels])
            .and_then(|t| t.f_permute([2, 0, 1]))
            .map(|t| t.contiguous())
            .context("Failed to lay out image tensor as [C, H, W]")
    }
}

// ============================================================================
// Normalize
// ============================================================================

/// Scales and standardises a `[C, H, W]` tensor channel by channel.
///
/// ```text
/// output[c] = (input[c] / max_pixel_value - mean[c]) / std[c]
/// ```
/// The output is always `Float`.
///
/// # Example
/// ```ignore
/// let norm = Normalize::half(); // maps 0..=255 to -1..=1
/// let normalized = norm.apply(ToTensor.apply(image)?)?;
/// ```
#[derive(Debug, Clone)]
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
    max_pixel_value: f32,
}

impl Normalize {
    pub fn new(mean: &[f32], std: &[f32], max_pixel_value: f32) -> Result<Self> {
        ensure!(!mean.is_empty(), "Normalization mean cannot be empty");
        ensure!(
            mean.len() == std.len(),
            "The mean and standard deviation for normalization must match in dimension. \
             The dimension of mean is {} but the dimension of std is {}.",
            mean.len(),
            std.len()
        );
        ensure!(
            std.iter().all(|&s| s != 0.0),
            "Normalization std cannot contain zeros (got {:?})",
            std
        );
        ensure!(
            max_pixel_value > 0.0,
            "max_pixel_value must be positive (got {})",
            max_pixel_value
        );
        Ok(Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
            max_pixel_value,
        })
    }

    /// Mean 0.5, std 0.5 on RGB with 8-bit input. Output lies in `[-1, 1]`.
    pub fn half() -> Self {
        Self {
            mean: vec![0.5; 3],
            std: vec![0.5; 3],
            max_pixel_value: 255.0,
        }
    }

    /// Inverse of [`half`](Self::half) for a float tensor: maps `[-1, 1]` back to `[0, 1]`.
    pub fn denormalize_half(tensor: &Tensor) -> Tensor {
        tensor * 0.5 + 0.5
    }
}

impl Transform<Tensor, Tensor> for Normalize {
    fn apply(&self, tensor: Tensor) -> Result<Tensor> {
        let (num_channels, _height, _width) = tensor
            .size3()
            .context("Input must be 3D tensor [C, H, W]")?;

        ensure!(
            num_channels as usize == self.mean.len(),
            "Channel count mismatch: input has {} channels but normalization expects {}",
            num_channels,
            self.mean.len()
        );

        let mean_t = Tensor::from_slice(&self.mean).reshape([num_channels, 1, 1]);
        let std_t = Tensor::from_slice(&self.std).reshape([num_channels, 1, 1]);

        let scaled = tensor
            .to_kind(Kind::Float)
            .f_div_scalar(self.max_pixel_value as f64)
            .context("Failed to scale tensor by max_pixel_value")?;
        Ok((scaled - mean_t) / std_t)
    }
}

// ============================================================================
// TargetsToSample
// ============================================================================

/// Turns pipeline output into a [`Sample`].
///
/// Features:
/// - `image_key` (default `"image"`): the primary image, `[3, H, W]`
/// - `mask_{i}`: each mask, `[C, H, W]` `Uint8`
/// - one feature per additional image, named after the target
///
/// When a [`Normalize`] is set it runs on image targets only.
///
/// # Example
/// ```ignore
/// let to_sample = TargetsToSample::new().normalize(Normalize::half()).image_key("input");
/// let sample = pipeline.then(to_sample).apply(Targets::new(image))?;
/// ```
#[derive(Debug, Clone)]
pub struct TargetsToSample {
    normalize: Option<Normalize>,
    image_key: String,
}

impl Default for TargetsToSample {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetsToSample {
    pub fn new() -> Self {
        Self {
            normalize: None,
            image_key: IMAGE.to_string(),
        }
    }

    pub fn normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = Some(normalize);
        self
    }

    /// Feature name used for the primary image.
    pub fn image_key(mut self, key: impl Into<String>) -> Self {
        self.image_key = key.into();
        self
    }

    fn image_tensor(&self, img: image::RgbImage) -> Result<Tensor> {
        let tensor = ToTensor.apply(DynamicImage::ImageRgb8(img))?;
        match &self.normalize {
            Some(norm) => norm.apply(tensor),
            None => Ok(tensor),
        }
    }
}

impl Transform<Targets, Sample> for TargetsToSample {
    fn apply(&self, targets: Targets) -> Result<Sample> {
        let (image, masks, images) = targets.into_parts();

        let mut sample = Sample::from_single(self.image_key.clone(), self.image_tensor(image)?);
        for (i, mask) in masks.into_iter().enumerate() {
            let tensor = ToTensor
                .apply(mask)
                .with_context(|| format!("Failed to convert mask {}", i))?;
            sample = sample.with_feature(format!("mask_{}", i), tensor);
        }
        for (name, img) in images {
            let tensor = self
                .image_tensor(img)
                .with_context(|| format!("Failed to convert image target '{}'", name))?;
            sample = sample.with_feature(name, tensor);
        }
        Ok(sample)
    }
}
