//! The augmentation pipeline shared by the classification and segmentation demos.

use crate::transforms::vision::{
    Augmentation, Blur, BorderMode, ColorJitter, Compose, HorizontalFlip, OneOf, RandomCrop,
    Resize, RgbShift, Rotate, VerticalFlip,
};
use anyhow::Result;

/// Resize to 1920x1080, random 1280x720 crop, rotation up to 40° with a
/// black border, flips, an RGB shift of up to 25 per channel, then either a
/// 3x3 blur or a colour jitter.
pub fn classification_pipeline() -> Result<Compose> {
    Ok(Compose::new()
        .with_step(Resize::new(1920, 1080)?)
        .with_step(RandomCrop::new(1280, 720)?)
        .with_step(Rotate::new(40.0, 0.9)?.border_mode(BorderMode::Constant(0)))
        .with_step(HorizontalFlip::new(0.5)?)
        .with_step(VerticalFlip::new(0.1)?)
        .with_step(RgbShift::new(25, 25, 25, 0.9)?)
        .with_step(OneOf::new(
            vec![
                Box::new(Blur::new(3, 0.5)?) as Box<dyn Augmentation>,
                Box::new(ColorJitter::new(0.5)?),
            ],
            1.0,
        )?))
}

/// [`classification_pipeline`] without the image/mask shape check, so masks
/// of a different resolution are transformed at their own size.
pub fn segmentation_pipeline() -> Result<Compose> {
    Ok(classification_pipeline()?.check_shapes(false))
}
