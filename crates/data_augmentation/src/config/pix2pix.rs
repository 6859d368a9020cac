use crate::readers::{PairedImageDataset, PAIRED_TARGET};
use crate::sample::Sample;
use crate::transforms::vision::{
    ColorJitter, Compose, HorizontalFlip, Normalize, Resize, Targets, TargetsToSample,
};
use crate::transforms::Transform;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tch::Device;

use super::{load_yaml, parse_device, resolve, save_yaml};

/// Hyper-parameters, paths and pipelines for Pix2Pix training on stitched
/// image pairs (e.g. satellite | map).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pix2PixConfig {
    /// `"auto"`, `"cpu"`, `"cuda"` or `"cuda:N"`
    pub device: String,
    pub train_dir: PathBuf,
    pub val_dir: PathBuf,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub num_workers: usize,
    pub image_size: u32,
    pub channels_img: usize,
    pub l1_lambda: f64,
    pub lambda_gp: f64,
    pub num_epochs: usize,
    pub load_model: bool,
    pub save_model: bool,
    pub checkpoint_disc: PathBuf,
    pub checkpoint_gen: PathBuf,
    /// Column where input and target are stitched together; `None` splits
    /// at the midpoint.
    pub split_at: Option<u32>,
}

impl Default for Pix2PixConfig {
    fn default() -> Self {
        Self {
            device: "auto".to_string(),
            train_dir: PathBuf::from("data/maps/maps/train"),
            val_dir: PathBuf::from("data/maps/maps/val"),
            learning_rate: 2e-4,
            batch_size: 16,
            num_workers: 2,
            image_size: 256,
            channels_img: 3,
            l1_lambda: 100.0,
            lambda_gp: 10.0,
            num_epochs: 500,
            load_model: false,
            save_model: false,
            checkpoint_disc: PathBuf::from("checkpoints/disc.ot"),
            checkpoint_gen: PathBuf::from("checkpoints/gen.ot"),
            split_at: None,
        }
    }
}

impl Pix2PixConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        load_yaml(path.as_ref())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_yaml(self, path.as_ref())
    }

    /// Resolves every relative path against `base`.
    pub fn with_base_dir(mut self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        for path in [
            &mut self.train_dir,
            &mut self.val_dir,
            &mut self.checkpoint_disc,
            &mut self.checkpoint_gen,
        ] {
            *path = resolve(base, path);
        }
        self
    }

    pub fn device(&self) -> Result<Device> {
        parse_device(&self.device)
    }

    /// Joint geometry for both halves: resize to `image_size` square.
    pub fn both_transform(&self) -> Result<Compose> {
        Ok(Compose::new()
            .with_step(Resize::new(self.image_size, self.image_size)?)
            .with_additional_target(PAIRED_TARGET))
    }

    /// Input half only: flip, occasional colour jitter, then `[-1, 1]` tensor.
    pub fn transform_only_input(&self) -> Result<impl Transform<Targets, Sample>> {
        Ok(Compose::new()
            .with_step(HorizontalFlip::new(0.5)?)
            .with_step(ColorJitter::new(0.2)?)
            .then(TargetsToSample::new().normalize(Normalize::half())))
    }

    /// Target half only: `[-1, 1]` tensor.
    pub fn transform_only_mask(&self) -> TargetsToSample {
        TargetsToSample::new().normalize(Normalize::half())
    }

    /// Builds the paired dataset over `dir` with this config's pipelines.
    pub fn dataset(&self, dir: impl Into<PathBuf>) -> Result<PairedImageDataset> {
        let dataset = PairedImageDataset::new(
            dir,
            self.both_transform()?,
            self.transform_only_input()?,
            self.transform_only_mask(),
        )?;
        Ok(match self.split_at {
            Some(column) => dataset.split_at(column),
            None => dataset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_defaults_and_yaml() -> Result<()> {
        let config = Pix2PixConfig::default();
        assert_eq!(config.image_size, 256);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.split_at, None);

        let dir = tempdir()?;
        let path = dir.path().join("pix2pix.yaml");
        std::fs::write(&path, "image_size: 64\nsplit_at: 600\n")?;
        let loaded = Pix2PixConfig::from_yaml(&path)?;
        assert_eq!(loaded.image_size, 64);
        assert_eq!(loaded.split_at, Some(600));
        assert_eq!(loaded.l1_lambda, 100.0);

        loaded.save(&path)?;
        assert_eq!(Pix2PixConfig::from_yaml(&path)?, loaded);
        Ok(())
    }

    #[test]
    fn test_dataset_with_fixed_split() -> Result<()> {
        let dir = tempdir()?;
        // 10 columns of input, 6 of target
        RgbImage::from_fn(16, 8, |x, _| if x < 10 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) })
            .save(dir.path().join("pair.png"))?;

        let config = Pix2PixConfig {
            image_size: 32,
            split_at: Some(10),
            ..Default::default()
        };
        let dataset = config.dataset(dir.path())?;
        assert_eq!(dataset.len(), 1);

        let sample = dataset.get(0)?;
        assert_eq!(sample.get("input")?.size(), vec![3, 32, 32]);
        assert!((sample.get("target")?.double_value(&[0, 16, 16]) + 1.0).abs() < 1e-6);
        Ok(())
    }
}
