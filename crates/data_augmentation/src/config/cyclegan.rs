use crate::sample::Sample;
use crate::transforms::vision::{Compose, HorizontalFlip, Normalize, Resize, Targets, TargetsToSample};
use crate::transforms::Transform;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tch::Device;

use super::{load_yaml, parse_device, resolve, save_yaml};

/// Hyper-parameters and paths for CycleGAN training (horse ↔ zebra style
/// unpaired translation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleGanConfig {
    /// `"auto"`, `"cpu"`, `"cuda"` or `"cuda:N"`
    pub device: String,
    pub train_dir: PathBuf,
    pub val_dir: PathBuf,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub lambda_identity: f64,
    pub lambda_cycle: f64,
    pub num_workers: usize,
    pub num_epochs: usize,
    pub load_model: bool,
    pub save_model: bool,
    pub checkpoint_gen_h: PathBuf,
    pub checkpoint_gen_z: PathBuf,
    pub checkpoint_critic_h: PathBuf,
    pub checkpoint_critic_z: PathBuf,
}

impl Default for CycleGanConfig {
    fn default() -> Self {
        Self {
            device: "auto".to_string(),
            train_dir: PathBuf::from("dataset/trainA"),
            val_dir: PathBuf::from("dataset/testA"),
            batch_size: 1,
            learning_rate: 1e-5,
            lambda_identity: 0.0,
            lambda_cycle: 10.0,
            num_workers: 4,
            num_epochs: 10,
            load_model: false,
            save_model: true,
            checkpoint_gen_h: PathBuf::from("checkpoints/genh.ot"),
            checkpoint_gen_z: PathBuf::from("checkpoints/genz.ot"),
            checkpoint_critic_h: PathBuf::from("checkpoints/critich.ot"),
            checkpoint_critic_z: PathBuf::from("checkpoints/criticz.ot"),
        }
    }
}

impl CycleGanConfig {
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
            &mut self.checkpoint_gen_h,
            &mut self.checkpoint_gen_z,
            &mut self.checkpoint_critic_h,
            &mut self.checkpoint_critic_z,
        ] {
            *path = resolve(base, path);
        }
        self
    }

    pub fn device(&self) -> Result<Device> {
        parse_device(&self.device)
    }

    /// Resize to 256x256 then a coin-flip horizontal flip, applied jointly
    /// to `image` and `image0`.
    pub fn augmentations(&self) -> Result<Compose> {
        Ok(Compose::new()
            .with_step(Resize::new(256, 256)?)
            .with_step(HorizontalFlip::new(0.5)?)
            .with_additional_target("image0"))
    }

    /// [`augmentations`](Self::augmentations) followed by conversion to
    /// `[-1, 1]` float tensors.
    pub fn transforms(&self) -> Result<impl Transform<Targets, Sample>> {
        Ok(self
            .augmentations()?
            .then(TargetsToSample::new().normalize(Normalize::half())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = CycleGanConfig::default();
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.learning_rate, 1e-5);
        assert_eq!(config.lambda_cycle, 10.0);
        assert_eq!(config.num_workers, 4);
        assert!(config.save_model && !config.load_model);
    }

    #[test]
    fn test_yaml_save_and_partial_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/cyclegan.yaml");
        let config = CycleGanConfig {
            num_epochs: 3,
            ..Default::default()
        };
        config.save(&path)?;
        assert_eq!(CycleGanConfig::from_yaml(&path)?, config);

        let partial = dir.path().join("partial.yaml");
        std::fs::write(&partial, "batch_size: 8\ndevice: cpu\n")?;
        let loaded = CycleGanConfig::from_yaml(&partial)?;
        assert_eq!(loaded.batch_size, 8);
        assert_eq!(loaded.device()?, Device::Cpu);
        assert_eq!(loaded.lambda_cycle, 10.0);

        assert!(CycleGanConfig::from_yaml(dir.path().join("missing.yaml")).is_err());
        Ok(())
    }

    #[test]
    fn test_base_dir() {
        let config = CycleGanConfig::default().with_base_dir("/data/cyclegan");
        assert_eq!(config.train_dir, PathBuf::from("/data/cyclegan/dataset/trainA"));
        assert_eq!(
            config.checkpoint_critic_z,
            PathBuf::from("/data/cyclegan/checkpoints/criticz.ot")
        );
    }

    #[test]
    fn test_transforms_output() -> Result<()> {
        let transforms = CycleGanConfig::default().transforms()?;
        let targets = Targets::new(RgbImage::from_pixel(64, 48, Rgb([255, 255, 255])))
            .with_image("image0", RgbImage::from_pixel(64, 48, Rgb([0, 0, 0])));
        let sample = transforms.apply(targets)?;

        let image = sample.get("image")?;
        assert_eq!(image.size(), vec![3, 256, 256]);
        assert!((image.double_value(&[0, 10, 10]) - 1.0).abs() < 1e-6);
        assert!((sample.get("image0")?.double_value(&[1, 5, 5]) + 1.0).abs() < 1e-6);
        Ok(())
    }
}
