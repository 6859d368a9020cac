use anyhow::{Context, Result};
use clap::Parser;
use data_augmentation::config::segmentation_pipeline;
use data_augmentation::dataloader::init_worker_rng;
use data_augmentation::logging::init_logging;
use data_augmentation::transforms::vision::{load_mask, load_rgb, Targets};
use data_augmentation::transforms::Transform;
use data_augmentation::visualize::{mask_to_rgb, save_image_grid};
use std::path::PathBuf;
use tracing::info;

/// Augments an image together with two masks, keeping them spatially
/// aligned, and saves every result as a grid (image, mask, second mask per row).
#[derive(Parser, Debug)]
struct Args {
    /// Image to augment
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/images/elon.jpeg"))]
    image: PathBuf,

    /// First mask
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/images/mask.jpeg"))]
    mask: PathBuf,

    /// Second mask
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/images/second_mask.jpeg"))]
    second_mask: PathBuf,

    /// Output grid image
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/results/segmentation.png"))]
    output: PathBuf,

    /// Number of augmented variants
    #[arg(long, default_value_t = 4)]
    iterations: usize,

    /// Seed for reproducible augmentations
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    init_logging("info")?;
    let args = Args::parse();

    if let Some(seed) = args.seed {
        init_worker_rng(0, 0, seed);
    }

    let image = load_rgb(&args.image)?;
    let masks = vec![load_mask(&args.mask)?, load_mask(&args.second_mask)?];
    info!(
        image = ?image.dimensions(),
        masks = ?masks.iter().map(|m| (m.width(), m.height())).collect::<Vec<_>>(),
        "loaded inputs"
    );

    let pipeline = segmentation_pipeline()?;

    let mut grid = vec![image.clone()];
    for i in 0..args.iterations {
        let targets = Targets::new(image.clone()).with_masks(masks.clone());
        let (augmented, augmented_masks, _) = pipeline
            .apply(targets)
            .with_context(|| format!("Augmentation {} failed", i))?
            .into_parts();
        grid.push(augmented);
        grid.extend(augmented_masks.iter().map(mask_to_rgb));
    }

    save_image_grid(&grid, 3, 4, &args.output)?;
    info!(path = %args.output.display(), images = grid.len(), "saved grid");
    Ok(())
}
