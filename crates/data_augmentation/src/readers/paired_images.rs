use crate::dataset::Dataset;
use crate::sample::Sample;
use crate::transforms::vision::{load_rgb, split_stitched, Compose, Targets, IMAGE};
use crate::transforms::Transform;
use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tch::Tensor;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Name of the target half inside the joint pipeline.
pub const PAIRED_TARGET: &str = "image0";

/// A directory of stitched image pairs (input | target side by side), as
/// used by Pix2Pix-style image-to-image datasets.
///
/// `get(i)`:
/// 1. loads file `i` as RGB and splits it into input and target halves,
/// 2. runs the joint pipeline with the input as `image` and the target as
///    `image0`, so both halves get the same random geometry,
/// 3. runs the input-only and target-only transforms,
/// 4. returns `{"input": [3, H, W], "target": [3, H, W]}`.
///
/// The file list is read once and sorted, so indices are stable.
///
/// # Example
/// ```ignore
/// let dataset = PairedImageDataset::new(
///     "data/maps/train",
///     config.both_transform()?,
///     config.transform_only_input()?,
///     config.transform_only_mask(),
/// )?;
/// ```
#[derive(Clone)]
pub struct PairedImageDataset {
    root_dir: PathBuf,
    files: Arc<[PathBuf]>,
    split_at: Option<u32>,
    both_transform: Arc<Compose>,
    input_transform: Arc<dyn Transform<Targets, Sample>>,
    target_transform: Arc<dyn Transform<Targets, Sample>>,
}

impl PairedImageDataset {
    /// Lists the regular files directly inside `root_dir`.
    ///
    /// The input and target transforms receive their half as the `image`
    /// target and must emit it under the `image` feature.
    pub fn new<I, T>(
        root_dir: impl Into<PathBuf>,
        both_transform: Compose,
        input_transform: I,
        target_transform: T,
    ) -> Result<Self>
    where
        I: Transform<Targets, Sample> + 'static,
        T: Transform<Targets, Sample> + 'static,
    {
        let root_dir = root_dir.into();
        let files = list_files(&root_dir)?;
        info!(
            root_dir = %root_dir.display(),
            files = files.len(),
            "indexed paired image dataset"
        );

        Ok(Self {
            root_dir,
            files: files.into(),
            split_at: None,
            both_transform: Arc::new(both_transform.with_additional_target(PAIRED_TARGET)),
            input_transform: Arc::new(input_transform),
            target_transform: Arc::new(target_transform),
        })
    }

    /// Splits every stitched file at a fixed column instead of the midpoint.
    pub fn split_at(mut self, column: u32) -> Self {
        self.split_at = Some(column);
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Files in index order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl Dataset for PairedImageDataset {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let path = self.files.get(index).ok_or_else(|| {
            anyhow!(
                "Index {} out of range for dataset of length {}",
                index,
                self.files.len()
            )
        })?;
        debug!(index, path = %path.display(), "loading stitched pair");

        let stitched = load_rgb(path)?;
        let (input, target) = split_stitched(&stitched, self.split_at)
            .with_context(|| format!("Failed to split {}", path.display()))?;

        let joint = self
            .both_transform
            .apply(Targets::new(input).with_image(PAIRED_TARGET, target))
            .with_context(|| format!("Joint transform failed for {}", path.display()))?;
        let (input, _, mut extra) = joint.into_parts();
        let target = extra
            .remove(PAIRED_TARGET)
            .ok_or_else(|| anyhow!("Joint transform dropped the '{}' target", PAIRED_TARGET))?;

        let input = take_image(self.input_transform.apply(Targets::new(input))?)?;
        let target = take_image(self.target_transform.apply(Targets::new(target))?)?;

        Ok(Sample::from_single("input", input).with_feature("target", target))
    }
}

fn take_image(mut sample: Sample) -> Result<Tensor> {
    sample
        .features
        .remove(IMAGE)
        .ok_or_else(|| anyhow!("Transform output has no '{}' feature", IMAGE))
}

fn list_files(root_dir: &Path) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(root_dir)
        .with_context(|| format!("Failed to access directory: {}", root_dir.display()))?;
    if !metadata.is_dir() {
        bail!("Path is not a directory: {}", root_dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root_dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| {
            format!("Failed to read directory entry in {}", root_dir.display())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
