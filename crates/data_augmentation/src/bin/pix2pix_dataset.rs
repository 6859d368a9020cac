use anyhow::Result;
use clap::Parser;
use data_augmentation::config::Pix2PixConfig;
use data_augmentation::logging::init_logging;
use data_augmentation::transforms::vision::Normalize;
use data_augmentation::visualize::save_tensor_batch;
use data_augmentation::{DataLoader, DataLoaderConfig};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Batch size used when neither the CLI nor a config file sets one.
const DEFAULT_BATCH_SIZE: usize = 5;

/// Loads one batch of stitched map pairs and saves the inputs and targets
/// as `x.png` and `y.png`.
#[derive(Parser, Debug)]
struct Args {
    /// Optional YAML overriding the Pix2Pix defaults; its relative paths
    /// resolve against the crate directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of stitched input|target images [default: config train_dir]
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Where x.png and y.png are written
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/results/dataset_test"))]
    output_dir: PathBuf,

    /// [default: config batch_size, or 5 without a config]
    #[arg(long)]
    batch_size: Option<usize>,

    /// [default: config num_workers, or 0 without a config]
    #[arg(long)]
    num_workers: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,
}

/// CLI values merged over the config file.
#[derive(Debug)]
struct Settings {
    config: Pix2PixConfig,
    data_dir: PathBuf,
    batch_size: usize,
    num_workers: usize,
}

fn resolve_settings(args: &Args, base_dir: &Path) -> Result<Settings> {
    let (config, batch_size, num_workers) = match &args.config {
        Some(path) => {
            let config = Pix2PixConfig::from_yaml(path)?.with_base_dir(base_dir);
            let (batch, workers) = (config.batch_size, config.num_workers);
            (config, batch, workers)
        }
        None => (
            Pix2PixConfig::default().with_base_dir(base_dir),
            DEFAULT_BATCH_SIZE,
            0,
        ),
    };

    Ok(Settings {
        data_dir: args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.train_dir.clone()),
        batch_size: args.batch_size.unwrap_or(batch_size),
        num_workers: args.num_workers.unwrap_or(num_workers),
        config,
    })
}

fn main() -> Result<()> {
    init_logging("info")?;
    let args = Args::parse();
    let settings = resolve_settings(&args, Path::new(env!("CARGO_MANIFEST_DIR")))?;
    info!(
        data_dir = %settings.data_dir.display(),
        batch_size = settings.batch_size,
        num_workers = settings.num_workers,
        "pix2pix dataset settings"
    );

    let dataset = settings.config.dataset(&settings.data_dir)?;

    let mut loader_config = DataLoaderConfig::builder()
        .batch_size(settings.batch_size)
        .num_workers(settings.num_workers);
    if let Some(seed) = args.seed {
        loader_config = loader_config.seed(seed);
    }
    let dataloader = DataLoader::new(dataset, loader_config.build())?;

    let Some(batch) = dataloader.iter()?.next() else {
        warn!(dir = %settings.data_dir.display(), "no images found");
        return Ok(());
    };
    let batch = batch?;

    let x = batch.get("input")?;
    let y = batch.get("target")?;
    info!(input = ?x.size(), target = ?y.size(), "first batch");

    // Tensors are normalised to [-1, 1]; map back to [0, 1] for saving.
    save_tensor_batch(&Normalize::denormalize_half(x), args.output_dir.join("x.png"))?;
    save_tensor_batch(&Normalize::denormalize_half(y), args.output_dir.join("y.png"))?;
    info!(dir = %args.output_dir.display(), "saved first batch");
    Ok(())
}
