use anyhow::{bail, Result};
use image::{DynamicImage, GenericImageView, RgbImage};
use std::collections::BTreeMap;

/// Feature name of the primary image target.
pub const IMAGE: &str = "image";

/// The named inputs of one pipeline invocation.
///
/// A pipeline receives `Targets`, transforms every member, and hands back
/// the same names:
/// - `image`: the primary RGB image (`H x W x 3`)
/// - `masks`: segmentation masks, in order. Masks only see geometric steps.
/// - additional images (e.g. `"image0"`), transformed exactly like `image`
///
/// Geometric steps sample their parameters once per call and apply them to
/// every member, so image and masks stay spatially aligned.
///
/// # Example
/// ```ignore
/// let targets = Targets::new(input).with_image("image0", target);
/// let out = both_transform.apply(targets)?;
/// let (input, target) = (out.image(), out.get_image("image0")?);
/// ```
#[derive(Debug, Clone)]
pub struct Targets {
    image: RgbImage,
    masks: Vec<DynamicImage>,
    images: BTreeMap<String, RgbImage>,
}

impl Targets {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            masks: Vec::new(),
            images: BTreeMap::new(),
        }
    }

    /// Replaces the mask list.
    pub fn with_masks(mut self, masks: Vec<DynamicImage>) -> Self {
        self.masks = masks;
        self
    }

    /// Appends one mask.
    pub fn with_mask(mut self, mask: DynamicImage) -> Self {
        self.masks.push(mask);
        self
    }

    /// Adds or overwrites an additional image target.
    pub fn with_image(mut self, name: impl Into<String>, image: RgbImage) -> Self {
        self.images.insert(name.into(), image);
        self
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn masks(&self) -> &[DynamicImage] {
        &self.masks
    }

    /// Looks up an image target by name. `"image"` resolves to the primary image.
    pub fn get_image(&self, name: &str) -> Result<&RgbImage> {
        if name == IMAGE {
            return Ok(&self.image);
        }
        match self.images.get(name) {
            Some(image) => Ok(image),
            None => bail!(
                "Image target '{}' not found (available: {:?})",
                name,
                self.image_names().collect::<Vec<_>>()
            ),
        }
    }

    /// Names of the additional image targets, in sorted order.
    pub fn image_names(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    /// `(width, height)` of the primary image.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Returns every member whose size differs from the primary image,
    /// as `(label, width, height)`.
    pub(crate) fn shape_mismatches(&self) -> Vec<(String, u32, u32)> {
        let expected = self.dimensions();
        let masks = self.masks.iter().enumerate().filter_map(|(i, mask)| {
            let (w, h) = mask.dimensions();
            ((w, h) != expected).then(|| (format!("mask {}", i), w, h))
        });
        let images = self.images.iter().filter_map(|(name, img)| {
            let (w, h) = img.dimensions();
            ((w, h) != expected).then(|| (format!("image '{}'", name), w, h))
        });
        masks.chain(images).collect()
    }

    pub fn into_parts(self) -> (RgbImage, Vec<DynamicImage>, BTreeMap<String, RgbImage>) {
        (self.image, self.masks, self.images)
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Applies `f` to the primary image and every additional image.
    pub(crate) fn map_images<F>(mut self, f: F) -> Result<Self>
    where
        F: Fn(RgbImage) -> Result<RgbImage>,
    {
        self.image = f(self.image)?;
        self.images = self
            .images
            .into_iter()
            .map(|(name, image)| f(image).map(|image| (name, image)))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Applies `f` to every mask.
    pub(crate) fn map_masks<F>(mut self, f: F) -> Result<Self>
    where
        F: Fn(DynamicImage) -> Result<DynamicImage>,
    {
        self.masks = self.masks.into_iter().map(f).collect::<Result<_>>()?;
        Ok(self)
    }

    /// Applies `image_fn` to image targets and `mask_fn` to masks.
    pub(crate) fn map_spatial<F, G>(self, image_fn: F, mask_fn: G) -> Result<Self>
    where
        F: Fn(RgbImage) -> Result<RgbImage>,
        G: Fn(DynamicImage) -> Result<DynamicImage>,
    {
        self.map_images(image_fn)?.map_masks(mask_fn)
    }
}

impl From<RgbImage> for Targets {
    fn from(image: RgbImage) -> Self {
        Self::new(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};

    #[test]
    fn test_lookup_by_name() -> Result<()> {
        let targets = Targets::new(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])))
            .with_image("image0", RgbImage::from_pixel(2, 2, Rgb([9, 9, 9])));

        assert_eq!(targets.get_image("image")?.get_pixel(0, 0), &Rgb([1, 2, 3]));
        assert_eq!(targets.get_image("image0")?.get_pixel(1, 1), &Rgb([9, 9, 9]));
        assert!(targets.get_image("image1").is_err());
        assert_eq!(targets.image_names().collect::<Vec<_>>(), vec!["image0"]);
        Ok(())
    }

    #[test]
    fn test_shape_mismatches() {
        let targets = Targets::new(RgbImage::new(4, 3))
            .with_mask(DynamicImage::ImageLuma8(GrayImage::new(4, 3)))
            .with_mask(DynamicImage::ImageLuma8(GrayImage::new(5, 3)))
            .with_image("image0", RgbImage::new(4, 2));

        let mismatches = targets.shape_mismatches();
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0], ("mask 1".to_string(), 5, 3));
        assert_eq!(mismatches[1], ("image 'image0'".to_string(), 4, 2));
    }

    #[test]
    fn test_map_spatial_keeps_mask_order() -> Result<()> {
        let targets = Targets::new(RgbImage::new(1, 1))
            .with_mask(DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([1]))))
            .with_mask(DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([2]))));

        let out = targets.map_spatial(Ok, |m| Ok(m.brighten(10)))?;
        assert_eq!(out.masks()[0].to_luma8().get_pixel(0, 0), &Luma([11]));
        assert_eq!(out.masks()[1].to_luma8().get_pixel(0, 0), &Luma([12]));
        Ok(())
    }
}
