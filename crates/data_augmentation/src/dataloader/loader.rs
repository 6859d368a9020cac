//! src/dataloader/loader.rs
//!
//! DataLoader constructors and per-epoch iteration.
//!
//! # Automatic Sampling
//! DataLoader creates the appropriate sampler based on `config.shuffle`:
//! - If `config.shuffle = false`, DataLoader creates a SequentialSampler.
//! - If `config.shuffle = true`, DataLoader creates a RandomSampler seeded
//!   with `config.seed` (or a random seed when unset).
//!
//! The sampler is wrapped in a `BatchSampler` using the configured
//! `batch_size` and `drop_last`.
//!
//! # Seed Coordination
//! The same seed drives the shuffle order and the augmentation RNGs:
//! - sampler: `seed + epoch`
//! - worker `w` in epoch `e`: `seed + (e << 32) + w`

use crate::collator::{Collator, StackCollator};
use crate::dataset::Dataset;
use crate::sampler::{BatchSampler, RandomSampler, Sampler, SequentialSampler};
use anyhow::{Context, Result};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::config::DataLoaderConfig;
use super::iterator::DataLoaderIter;
use super::workers::batch::spawn_batch_pool;

/// The main DataLoader struct that coordinates data loading
///
/// # Thread safety:
/// - `DataLoader` itself is Send + Sync and can be shared across threads.
/// - Iterators must be used on a single thread.
/// - Each call to `iter()` starts a new epoch.
///
/// # Type parameters:
/// - `D`: Dataset type
/// - `C`: Collator type (defaults to StackCollator)
pub struct DataLoader<D, C = StackCollator> {
    dataset: Arc<D>,
    collator: C,
    config: DataLoaderConfig,
    batch_sampler: BatchSampler<Box<dyn Sampler<Item = usize>>>,
    current_epoch: AtomicUsize,
    runtime_seed: u64,
}

impl<D> DataLoader<D, StackCollator>
where
    D: Dataset + 'static,
{
    /// Creates a new DataLoader with the default StackCollator.
    ///
    /// # Example
    /// ```ignore
    /// let config = DataLoaderConfig::builder()
    ///     .batch_size(4)
    ///     .shuffle(true)
    ///     .num_workers(2)
    ///     .build();
    /// let dataloader = DataLoader::new(dataset, config)?;
    /// for batch in dataloader.iter()? {
    ///     let batch = batch?;
    /// }
    /// ```
    pub fn new(dataset: D, config: DataLoaderConfig) -> Result<Self> {
        Self::new_with_collator(dataset, config, StackCollator)
    }
}

impl<D, C> DataLoader<D, C>
where
    D: Dataset + 'static,
    C: Collator + Clone + Send + Sync + 'static,
{
    /// Creates a new DataLoader with automatic sampling and a custom collator.
    ///
    /// # Errors
    /// - Returns error if `batch_size` is 0
    /// - Returns error if `prefetch_factor` is 0 when using workers
    pub fn new_with_collator(
        dataset: D,
        mut config: DataLoaderConfig,
        collator: C,
    ) -> Result<Self> {
        config.validate()?;
        let batch_size = config.batch_size.unwrap_or(1);
        let drop_last = config.drop_last.unwrap_or(false);
        let shuffle = config.shuffle.unwrap_or(false);
        config.batch_size = Some(batch_size);
        config.drop_last = Some(drop_last);
        config.shuffle = Some(shuffle);

        let runtime_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let dataset_len = dataset.len();

        let sampler: Box<dyn Sampler<Item = usize>> = if shuffle && dataset_len > 0 {
            Box::new(RandomSampler::new(dataset_len, runtime_seed))
        } else {
            if shuffle {
                warn!("shuffle requested on an empty dataset; no batches will be produced");
            }
            Box::new(SequentialSampler::new(dataset_len))
        };

        let batch_sampler = BatchSampler::new(sampler, batch_size, drop_last)
            .context("Failed to wrap sampler with BatchSampler")?;

        debug!(
            dataset_len,
            batch_size,
            drop_last,
            shuffle,
            num_workers = config.num_workers,
            seed = runtime_seed,
            "dataloader created"
        );

        Ok(Self {
            dataset: Arc::new(dataset),
            collator,
            config,
            batch_sampler,
            current_epoch: AtomicUsize::new(0),
            runtime_seed,
        })
    }

    /// Creates an iterator over the batches of the next epoch.
    ///
    /// The epoch counter advances on every call. It changes the shuffle
    /// order (when shuffling) and always changes the augmentation seeds.
    /// With workers, a fresh pool is spawned for the epoch and joined when
    /// the iterator is dropped.
    pub fn iter(&self) -> Result<DataLoaderIter<'_, D, C>> {
        let epoch = self.current_epoch.fetch_add(1, Ordering::SeqCst);
        let sampler_epoch = if self.config.shuffle.unwrap_or(false) {
            epoch
        } else {
            0
        };
        let batch_indices = self.batch_sampler.iter(sampler_epoch);

        if self.config.num_workers == 0 || self.len() == 0 {
            debug!(epoch, batches = self.len(), "starting single-threaded epoch");
            return Ok(DataLoaderIter::single(
                self.dataset.as_ref(),
                &self.collator,
                batch_indices,
                epoch,
                self.runtime_seed,
            ));
        }

        debug!(
            epoch,
            batches = self.len(),
            num_workers = self.config.num_workers,
            "starting multi-worker epoch"
        );
        let pool = spawn_batch_pool(
            self.dataset.clone(),
            self.collator.clone(),
            &self.config,
            epoch,
            self.runtime_seed,
        )?;
        Ok(DataLoaderIter::multi(
            pool,
            batch_indices,
            self.config.timeout,
            self.config.prefetch_factor,
        ))
    }

    /// Number of batches per epoch.
    pub fn len(&self) -> usize {
        let n = self.dataset.len();
        let batch_size = self.config.batch_size.unwrap_or(1);
        if self.config.drop_last.unwrap_or(false) {
            n / batch_size
        } else {
            n.div_ceil(batch_size)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// The effective configuration, with defaults filled in.
    pub fn config(&self) -> &DataLoaderConfig {
        &self.config
    }

    /// The seed in use (drawn at random when the config left it unset).
    pub fn seed(&self) -> u64 {
        self.runtime_seed
    }

    /// Number of epochs started so far.
    pub fn epoch(&self) -> usize {
        self.current_epoch.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemoryDataset;
    use crate::minibatch::MiniBatch;
    use crate::sample::Sample;
    use tch::Tensor;

    fn numbers(n: i64) -> InMemoryDataset<i64> {
        InMemoryDataset::new((0..n).collect()).with_transform(|v: i64| -> Result<Sample> {
            Ok(Sample::from_single("x", Tensor::from_slice(&[v])))
        })
    }

    fn values(batch: &MiniBatch) -> Result<Vec<i64>> {
        Ok(batch.get("x")?.flatten(0, -1).try_into()?)
    }

    #[test]
    fn test_sequential_batches() -> Result<()> {
        let loader = DataLoader::new(numbers(5), DataLoaderConfig::builder().batch_size(2).build())?;
        assert_eq!(loader.len(), 3);

        let batches = loader.iter()?.collect::<Result<Vec<_>>>()?;
        assert_eq!(values(&batches[0])?, vec![0, 1]);
        assert_eq!(values(&batches[2])?, vec![4]);
        assert_eq!(loader.epoch(), 1);
        Ok(())
    }

    #[test]
    fn test_drop_last_and_defaults() -> Result<()> {
        let loader = DataLoader::new(
            numbers(5),
            DataLoaderConfig::builder().batch_size(2).drop_last(true).build(),
        )?;
        assert_eq!(loader.len(), 2);
        assert_eq!(loader.iter()?.count(), 2);

        let default = DataLoader::new(numbers(3), DataLoaderConfig::default())?;
        assert_eq!(default.config().batch_size, Some(1));
        assert_eq!(default.len(), 3);
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        let zero_batch = DataLoaderConfig::builder().batch_size(0).build();
        assert!(DataLoader::new(numbers(3), zero_batch).is_err());

        let zero_prefetch = DataLoaderConfig::builder()
            .num_workers(2)
            .prefetch_factor(0)
            .build();
        assert!(DataLoader::new(numbers(3), zero_prefetch).is_err());
    }

    #[test]
    fn test_empty_dataset_with_shuffle() -> Result<()> {
        let loader = DataLoader::new(
            numbers(0),
            DataLoaderConfig::builder().shuffle(true).num_workers(2).build(),
        )?;
        assert!(loader.is_empty());
        assert_eq!(loader.iter()?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_workers_preserve_sampler_order() -> Result<()> {
        let config = DataLoaderConfig::builder()
            .batch_size(3)
            .shuffle(true)
            .num_workers(3)
            .seed(11)
            .build();
        let parallel = DataLoader::new(numbers(20), config.clone())?;
        let serial = DataLoader::new(
            numbers(20),
            DataLoaderConfig {
                num_workers: 0,
                ..config
            },
        )?;

        for _ in 0..2 {
            let a: Vec<Vec<i64>> = parallel
                .iter()?
                .map(|b| values(&b?))
                .collect::<Result<_>>()?;
            let b: Vec<Vec<i64>> = serial
                .iter()?
                .map(|b| values(&b?))
                .collect::<Result<_>>()?;
            assert_eq!(a, b);
        }
        Ok(())
    }

    #[test]
    fn test_sample_errors_are_per_batch() -> Result<()> {
        let dataset = InMemoryDataset::new((0..6i64).collect()).with_transform(
            |v: i64| -> Result<Sample> {
                anyhow::ensure!(v != 2, "bad record {}", v);
                Ok(Sample::from_single("x", Tensor::from_slice(&[v])))
            },
        );
        let loader = DataLoader::new(
            dataset,
            DataLoaderConfig::builder().batch_size(2).num_workers(2).build(),
        )?;

        let results: Vec<_> = loader.iter()?.collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(format!("{:#}", results[1].as_ref().unwrap_err()).contains("bad record 2"));
        assert!(results[2].is_ok());
        Ok(())
    }
}
