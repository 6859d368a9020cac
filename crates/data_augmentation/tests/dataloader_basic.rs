//! Basic single-threaded tests for DataLoader functionality.
//!
//! Tests cover:
//! - Labeled CSV tables batched into feature/label tensors
//! - Batch counts with and without drop_last
//! - Shuffling: full coverage, epoch-to-epoch variation, seed reproducibility
//! - Per-batch error propagation

mod common;
use common::{number_dataset, wine_csv};
use data_augmentation::{
    dataloader::{DataLoader, DataLoaderConfig},
    dataset::{Dataset, InMemoryDataset},
    readers::LabeledCsvDataset,
    sample::Sample,
};

use anyhow::{anyhow, Result};
use tch::Kind;

fn collect_values(dataloader: &DataLoader<InMemoryDataset<i64>>) -> Result<Vec<Vec<i64>>> {
    dataloader
        .iter()?
        .map(|batch| {
            let x = batch?.get("x")?.view([-1]);
            Ok(Vec::<i64>::try_from(&x)?)
        })
        .collect()
}

// ============================================================================
// 1. Labeled CSV
// ============================================================================

#[test]
fn test_csv_batches_have_feature_and_label_tensors() -> Result<()> {
    let dataset = LabeledCsvDataset::from_reader(wine_csv(10, 13).as_bytes(), b',')?;
    assert_eq!(dataset.len(), 10);
    assert_eq!(dataset.num_features(), 13);

    let config = DataLoaderConfig::builder().batch_size(4).build();
    let dataloader = DataLoader::new(dataset, config)?;
    assert_eq!(dataloader.len(), 3);

    let batches = dataloader.iter()?.collect::<Result<Vec<_>>>()?;
    assert_eq!(batches.len(), 3);

    let features = batches[0].get("features")?;
    let labels = batches[0].get("label")?;
    assert_eq!(features.size(), vec![4, 13]);
    assert_eq!(features.kind(), Kind::Float);
    assert_eq!(labels.size(), vec![4, 1]);

    // unshuffled: row order is file order
    assert_eq!(features.double_value(&[2, 0]), 2.0);
    assert_eq!(labels.double_value(&[2, 0]), 3.0);
    assert_eq!(batches[2].batch_size()?, 2);
    Ok(())
}

#[test]
fn test_csv_shuffled_epoch_covers_every_row() -> Result<()> {
    let dataset = LabeledCsvDataset::from_reader(wine_csv(17, 3).as_bytes(), b',')?;
    let config = DataLoaderConfig::builder()
        .batch_size(5)
        .shuffle(true)
        .seed(11)
        .build();
    let dataloader = DataLoader::new(dataset, config)?;

    let mut rows = Vec::new();
    for batch in dataloader.iter()? {
        let first_column = batch?.get("features")?.select(1, 0).contiguous();
        rows.extend(Vec::<f32>::try_from(&first_column)?.into_iter().map(|v| v as i64));
    }
    rows.sort_unstable();
    assert_eq!(rows, (0..17).collect::<Vec<_>>());
    Ok(())
}

// ============================================================================
// 2. Batch counts
// ============================================================================

#[test]
fn test_drop_last_controls_partial_batch() -> Result<()> {
    let keep = DataLoader::new(
        number_dataset(10),
        DataLoaderConfig::builder().batch_size(3).build(),
    )?;
    assert_eq!(keep.len(), 4);
    assert_eq!(
        collect_values(&keep)?,
        vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![9]]
    );

    let drop = DataLoader::new(
        number_dataset(10),
        DataLoaderConfig::builder().batch_size(3).drop_last(true).build(),
    )?;
    assert_eq!(drop.len(), 3);
    assert_eq!(collect_values(&drop)?.len(), 3);
    Ok(())
}

#[test]
fn test_empty_dataset_yields_nothing() -> Result<()> {
    let dataloader = DataLoader::new(
        number_dataset(0),
        DataLoaderConfig::builder().batch_size(4).shuffle(true).build(),
    )?;
    assert!(dataloader.is_empty());
    assert_eq!(dataloader.iter()?.count(), 0);
    Ok(())
}

// ============================================================================
// 3. Shuffling
// ============================================================================

#[test]
fn test_shuffle_changes_between_epochs() -> Result<()> {
    let config = || {
        DataLoaderConfig::builder()
            .batch_size(8)
            .shuffle(true)
            .seed(42)
            .build()
    };
    let dataloader = DataLoader::new(number_dataset(64), config())?;

    let epoch0 = collect_values(&dataloader)?;
    let epoch1 = collect_values(&dataloader)?;
    assert_ne!(epoch0, epoch1);
    assert_eq!(dataloader.epoch(), 2);

    // a second loader with the same seed replays the same epochs
    let replay = DataLoader::new(number_dataset(64), config())?;
    assert_eq!(collect_values(&replay)?, epoch0);
    assert_eq!(collect_values(&replay)?, epoch1);
    Ok(())
}

#[test]
fn test_unshuffled_order_is_stable() -> Result<()> {
    let dataloader = DataLoader::new(
        number_dataset(12),
        DataLoaderConfig::builder().batch_size(5).build(),
    )?;
    assert_eq!(collect_values(&dataloader)?, collect_values(&dataloader)?);
    Ok(())
}

// ============================================================================
// 4. Errors
// ============================================================================

#[test]
fn test_failed_sample_fails_only_its_batch() -> Result<()> {
    let dataset = InMemoryDataset::new((0..6).collect::<Vec<i64>>()).with_transform(
        |v: i64| -> Result<Sample> {
            if v == 4 {
                return Err(anyhow!("corrupt record {}", v));
            }
            Ok(Sample::from_single("x", tch::Tensor::from_slice(&[v])))
        },
    );
    let dataloader = DataLoader::new(dataset, DataLoaderConfig::builder().batch_size(2).build())?;

    let results: Vec<_> = dataloader.iter()?.collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());

    let err = results[2].as_ref().unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to load sample 4"), "{}", message);
    assert!(message.contains("corrupt record 4"), "{}", message);
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(DataLoader::new(
        number_dataset(4),
        DataLoaderConfig::builder().batch_size(0).build()
    )
    .is_err());
}
