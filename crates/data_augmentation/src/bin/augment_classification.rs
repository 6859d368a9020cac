use anyhow::{Context, Result};
use clap::Parser;
use data_augmentation::config::classification_pipeline;
use data_augmentation::dataloader::init_worker_rng;
use data_augmentation::logging::init_logging;
use data_augmentation::transforms::vision::load_rgb;
use data_augmentation::visualize::save_image_grid;
use std::path::PathBuf;
use tracing::info;

/// Applies the classification augmentation pipeline to one image several
/// times and saves the original plus every variant as a grid.
#[derive(Parser, Debug)]
struct Args {
    /// Image to augment
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/images/elon.jpeg"))]
    image: PathBuf,

    /// Output grid image
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/results/classification.png"))]
    output: PathBuf,

    /// Number of augmented variants
    #[arg(long, default_value_t = 15)]
    iterations: usize,

    /// Images per grid row
    #[arg(long, default_value_t = 4)]
    columns: u32,

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
    info!(path = %args.image.display(), size = ?image.dimensions(), "loaded image");

    let pipeline = classification_pipeline()?;
    info!(steps = ?pipeline.step_names(), "built pipeline");

    let mut images = Vec::with_capacity(args.iterations + 1);
    images.push(image.clone());
    for i in 0..args.iterations {
        let augmented = pipeline
            .apply_image(image.clone())
            .with_context(|| format!("Augmentation {} failed", i))?;
        images.push(augmented);
    }

    save_image_grid(&images, args.columns, 4, &args.output)?;
    info!(path = %args.output.display(), images = images.len(), "saved grid");
    Ok(())
}
