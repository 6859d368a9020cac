//! Saving and restoring model parameters.

use anyhow::{ensure, Context, Result};
use std::fs;
use std::path::Path;
use tch::nn::{Optimizer, VarStore};
use tracing::info;

/// Writes every variable of `vs` to `path`, creating parent directories.
pub fn save_checkpoint(vs: &VarStore, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    info!(path = %path.display(), "saving checkpoint");
    vs.save(path)
        .with_context(|| format!("Failed to save checkpoint: {}", path.display()))
}

/// Loads the variables stored at `path` into `vs`.
///
/// Every variable of `vs` must be present in the file with a matching shape.
pub fn load_checkpoint(vs: &mut VarStore, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure!(path.exists(), "Checkpoint not found: {}", path.display());
    info!(path = %path.display(), "loading checkpoint");
    vs.load(path)
        .with_context(|| format!("Failed to load checkpoint: {}", path.display()))
}

/// Loads a checkpoint and resets the optimizer's learning rate.
///
/// Resuming from a checkpoint otherwise keeps whatever rate the optimizer
/// was built with, which may not match the current run's config.
pub fn load_checkpoint_with_lr(
    vs: &mut VarStore,
    optimizer: &mut Optimizer,
    path: impl AsRef<Path>,
    learning_rate: f64,
) -> Result<()> {
    load_checkpoint(vs, path)?;
    optimizer.set_lr(learning_rate);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::nn::OptimizerConfig;
    use tch::{nn, Device, Kind, Tensor};
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("checkpoints/gen.ot");

        let source = VarStore::new(Device::Cpu);
        let weights = source.root().randn("weights", &[2, 3], 0.0, 1.0);
        save_checkpoint(&source, &path)?;
        assert!(path.exists());

        let mut restored = VarStore::new(Device::Cpu);
        let loaded = restored.root().zeros("weights", &[2, 3]);
        load_checkpoint(&mut restored, &path)?;
        assert!(loaded.allclose(&weights, 1e-6, 1e-6, false));
        Ok(())
    }

    #[test]
    fn test_missing_checkpoint() {
        let mut vs = VarStore::new(Device::Cpu);
        let err = load_checkpoint(&mut vs, "/nonexistent/critic.ot").unwrap_err();
        assert!(err.to_string().contains("Checkpoint not found"));
    }

    #[test]
    fn test_load_resets_learning_rate() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("disc.ot");

        let mut vs = VarStore::new(Device::Cpu);
        let bias = vs.root().zeros("bias", &[1]);
        save_checkpoint(&vs, &path)?;

        let mut optimizer = nn::Adam::default().build(&vs, 1.0)?;
        load_checkpoint_with_lr(&mut vs, &mut optimizer, &path, 0.0)?;

        // A zero learning rate leaves the parameter untouched.
        let loss = (&bias - Tensor::ones([1], (Kind::Float, Device::Cpu))).square().sum(Kind::Float);
        optimizer.backward_step(&loss);
        assert_eq!(bias.double_value(&[0]), 0.0);
        Ok(())
    }
}
