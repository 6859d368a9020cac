use anyhow::Result;
use clap::Parser;
use data_augmentation::dataset::Dataset;
use data_augmentation::logging::init_logging;
use data_augmentation::readers::LabeledCsvDataset;
use data_augmentation::{DataLoader, DataLoaderConfig};
use std::path::PathBuf;
use tracing::info;

/// Iterates the wine dataset with a shuffled, multi-worker DataLoader.
#[derive(Parser, Debug)]
struct Args {
    /// CSV with a header row; column 0 is the class label
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/data/wine.csv"))]
    data: PathBuf,

    #[arg(long, default_value_t = 2)]
    epochs: usize,

    #[arg(long, default_value_t = 4)]
    batch_size: usize,

    #[arg(long, default_value_t = 2)]
    num_workers: usize,

    /// Log every N steps
    #[arg(long, default_value_t = 5)]
    log_every: usize,

    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    init_logging("info")?;
    let args = Args::parse();

    let dataset = LabeledCsvDataset::from_path(&args.data)?;
    if !dataset.is_empty() {
        let first = dataset.get(0)?;
        info!(
            features = ?first.get("features")?.size(),
            label = first.get("label")?.double_value(&[0]),
            "first sample"
        );
    }

    let mut config = DataLoaderConfig::builder()
        .batch_size(args.batch_size)
        .shuffle(true)
        .num_workers(args.num_workers);
    if let Some(seed) = args.seed {
        config = config.seed(seed);
    }
    let dataloader = DataLoader::new(dataset, config.build())?;
    let n_iterations = dataloader.len();
    info!(
        samples = dataloader.dataset().len(),
        batches = n_iterations,
        "dataloader ready"
    );

    for epoch in 0..args.epochs {
        for (i, batch) in dataloader.iter()?.enumerate() {
            let batch = batch?;
            // forward, backward, update
            if (i + 1) % args.log_every.max(1) == 0 {
                info!(
                    "epoch {}/{}, step {}/{}, inputs {:?}",
                    epoch + 1,
                    args.epochs,
                    i + 1,
                    n_iterations,
                    batch.get("features")?.size()
                );
            }
        }
    }
    Ok(())
}
