//! Training configurations for the GAN examples and the YAML helpers they share.
//!
//! Every config derives `Serialize`/`Deserialize` with `#[serde(default)]`,
//! so a YAML file only needs the fields it overrides:
//!
//! ```ignore
//! let config = CycleGanConfig::from_yaml("configs/cyclegan.yaml")?
//!     .with_base_dir(env!("CARGO_MANIFEST_DIR"));
//! let device = config.device()?;
//! ```

pub mod augmentation;
pub mod cyclegan;
pub mod pix2pix;

pub use augmentation::{classification_pipeline, segmentation_pipeline};
pub use cyclegan::CycleGanConfig;
pub use pix2pix::Pix2PixConfig;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tch::Device;

/// Resolves a device name: `"auto"`, `"cpu"`, `"cuda"` or `"cuda:N"`.
///
/// `"auto"` picks the first GPU when one is available. Requesting CUDA on
/// a machine without it is an error.
pub fn parse_device(name: &str) -> Result<Device> {
    let name = name.trim().to_lowercase();
    match name.as_str() {
        "auto" => Ok(Device::cuda_if_available()),
        "cpu" => Ok(Device::Cpu),
        _ => {
            let index = match name.strip_prefix("cuda") {
                Some("") => 0,
                Some(rest) => rest
                    .strip_prefix(':')
                    .and_then(|i| i.parse::<usize>().ok())
                    .with_context(|| format!("Invalid CUDA device '{}'", name))?,
                None => bail!("Unknown device '{}' (expected auto, cpu, cuda or cuda:N)", name),
            };
            if !tch::Cuda::is_available() {
                bail!("Device '{}' requested but CUDA is not available", name);
            }
            Ok(Device::Cuda(index))
        }
    }
}

pub(crate) fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

pub(crate) fn save_yaml<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(value).context("Failed to serialize config")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, yaml).with_context(|| format!("Failed to write config: {}", path.display()))
}

/// Joins relative paths onto `base`; absolute paths are kept.
pub(crate) fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
