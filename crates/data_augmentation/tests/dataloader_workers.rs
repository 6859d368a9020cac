//! Worker pool behaviour of the DataLoader.
//!
//! Tests cover:
//! - Batches arrive in sampler order whatever the worker count
//! - Work is spread over every worker
//! - Per-batch errors do not stop the epoch
//! - A stalled worker surfaces as a timeout and ends the epoch
//! - A fresh pool per epoch

mod common;
use common::number_dataset;
use data_augmentation::{
    dataloader::{DataLoader, DataLoaderConfig, WORKER_ID},
    dataset::InMemoryDataset,
    sample::Sample,
};

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tch::Tensor;

fn batch_values(dataloader: &DataLoader<InMemoryDataset<i64>>) -> Result<Vec<Vec<i64>>> {
    dataloader
        .iter()?
        .map(|batch| {
            let x = batch?.get("x")?.view([-1]);
            Ok(Vec::<i64>::try_from(&x)?)
        })
        .collect()
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_workers_preserve_sampler_order() -> Result<()> {
    let config = |workers: usize| {
        DataLoaderConfig::builder()
            .batch_size(3)
            .shuffle(true)
            .seed(7)
            .num_workers(workers)
            .prefetch_factor(2)
            .build()
    };

    let serial = batch_values(&DataLoader::new(number_dataset(50), config(0))?)?;
    for workers in [1, 2, 4] {
        let parallel = batch_values(&DataLoader::new(number_dataset(50), config(workers))?)?;
        assert_eq!(parallel, serial, "num_workers = {}", workers);
    }
    Ok(())
}

#[test]
fn test_slow_early_batch_does_not_reorder() -> Result<()> {
    // batch 0 is the slowest, so later batches finish first
    let dataset = InMemoryDataset::new((0..12).collect::<Vec<i64>>()).with_transform(
        |v: i64| -> Result<Sample> {
            if v == 0 {
                thread::sleep(Duration::from_millis(100));
            }
            Ok(Sample::from_single("x", Tensor::from_slice(&[v])))
        },
    );
    let config = DataLoaderConfig::builder()
        .batch_size(2)
        .num_workers(3)
        .build();
    let dataloader = DataLoader::new(dataset, config)?;

    let firsts: Vec<i64> = batch_values(&dataloader)?.iter().map(|b| b[0]).collect();
    assert_eq!(firsts, vec![0, 2, 4, 6, 8, 10]);
    Ok(())
}

#[test]
fn test_batches_spread_over_workers() -> Result<()> {
    let seen = Arc::new(Mutex::new(HashSet::new()));
    let seen_in_worker = Arc::clone(&seen);
    let dataset = InMemoryDataset::new((0..16).collect::<Vec<i64>>()).with_transform(
        move |v: i64| -> Result<Sample> {
            let worker = WORKER_ID.with(|id| *id.borrow());
            seen_in_worker
                .lock()
                .map_err(|_| anyhow!("poisoned"))?
                .insert(worker);
            Ok(Sample::from_single("x", Tensor::from_slice(&[v])))
        },
    );

    let config = DataLoaderConfig::builder()
        .batch_size(2)
        .num_workers(4)
        .build();
    let dataloader = DataLoader::new(dataset, config)?;
    assert_eq!(dataloader.iter()?.count(), 8);

    let seen = seen.lock().map_err(|_| anyhow!("poisoned"))?;
    assert_eq!(*seen, (0..4).collect::<HashSet<usize>>());
    Ok(())
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_worker_error_fails_only_its_batch() -> Result<()> {
    let dataset = InMemoryDataset::new((0..10).collect::<Vec<i64>>()).with_transform(
        |v: i64| -> Result<Sample> {
            if v == 5 {
                return Err(anyhow!("unreadable record"));
            }
            Ok(Sample::from_single("x", Tensor::from_slice(&[v])))
        },
    );
    let config = DataLoaderConfig::builder()
        .batch_size(2)
        .num_workers(2)
        .build();
    let dataloader = DataLoader::new(dataset, config)?;

    let results: Vec<_> = dataloader.iter()?.collect();
    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.is_err(), i == 2, "batch {}", i);
    }

    let message = format!("{:#}", results[2].as_ref().unwrap_err());
    assert!(message.contains("failed on batch 2"), "{}", message);
    assert!(message.contains("unreadable record"), "{}", message);
    Ok(())
}

#[test]
fn test_stalled_worker_times_out() -> Result<()> {
    let dataset = InMemoryDataset::new(vec![0i64, 1]).with_transform(|v: i64| -> Result<Sample> {
        thread::sleep(Duration::from_millis(300));
        Ok(Sample::from_single("x", Tensor::from_slice(&[v])))
    });
    let config = DataLoaderConfig::builder()
        .batch_size(1)
        .num_workers(1)
        .timeout(Duration::from_millis(20))
        .build();
    let dataloader = DataLoader::new(dataset, config)?;

    let mut iter = dataloader.iter()?;
    let err = match iter.next() {
        Some(Err(e)) => e,
        other => panic!("expected a timeout, got {:?}", other.map(|r| r.is_ok())),
    };
    assert!(err.to_string().contains("Worker timeout"), "{}", err);
    assert!(iter.next().is_none());
    Ok(())
}

// ============================================================================
// Epochs
// ============================================================================

#[test]
fn test_each_epoch_runs_to_completion() -> Result<()> {
    let config = DataLoaderConfig::builder()
        .batch_size(4)
        .num_workers(2)
        .shuffle(true)
        .seed(3)
        .build();
    let dataloader = DataLoader::new(number_dataset(30), config)?;

    for _ in 0..3 {
        let mut values: Vec<i64> = batch_values(&dataloader)?.into_iter().flatten().collect();
        values.sort_unstable();
        assert_eq!(values, (0..30).collect::<Vec<_>>());
    }
    assert_eq!(dataloader.epoch(), 3);
    Ok(())
}

#[test]
fn test_abandoned_epoch_shuts_down_cleanly() -> Result<()> {
    let config = DataLoaderConfig::builder()
        .batch_size(2)
        .num_workers(3)
        .build();
    let dataloader = DataLoader::new(number_dataset(40), config)?;

    {
        let mut iter = dataloader.iter()?;
        assert!(iter.next().is_some());
        // dropping the iterator joins the pool
    }

    assert_eq!(batch_values(&dataloader)?.len(), 20);
    Ok(())
}
