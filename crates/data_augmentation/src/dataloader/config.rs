//! src/dataloader/config.rs
//!
//! Configuration for DataLoader behaviour
//!
//! Example:
//! ```ignore
//! let config = DataLoaderConfig::builder()
//!     .batch_size(4)
//!     .shuffle(true)
//!     .num_workers(2)
//!     .seed(42)
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `num_workers`: More workers can improve throughput but increase memory usage
//! - `prefetch_factor`: Batches queued per worker; higher values smooth out
//!                      slow augmentations at the cost of memory

use anyhow::{ensure, Result};
use std::time::Duration;

/// Configuration for DataLoader
#[derive(Debug, Clone)]
pub struct DataLoaderConfig {
    /// Number of samples per batch (defaults to 1 if not specified)
    pub batch_size: Option<usize>,
    /// Number of parallel workers (0 = single-threaded)
    pub num_workers: usize,
    /// Whether to drop the last incomplete batch (defaults to false if not specified)
    pub drop_last: Option<bool>,
    /// Whether to reshuffle the indices every epoch (defaults to false)
    pub shuffle: Option<bool>,
    /// Random seed for reproducible shuffling and augmentations.
    /// A random seed is drawn when unset.
    pub seed: Option<u64>,
    /// Number of batches queued per worker (must be >0 when using workers)
    pub prefetch_factor: usize,
    /// Maximum time to wait for a batch from workers.
    /// If exceeded, returns an error (assuming workers are stuck). Default: 30s
    pub timeout: Duration,
    /// How often idle workers check for the shutdown signal.
    /// Not an error timeout - just a polling interval. Default: 100ms.
    pub worker_timeout: Duration,
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            num_workers: 0,
            drop_last: None,
            shuffle: None,
            seed: None,
            prefetch_factor: 2,
            timeout: Duration::from_secs(30),
            worker_timeout: Duration::from_millis(100),
        }
    }
}

impl DataLoaderConfig {
    pub fn builder() -> DataLoaderConfigBuilder {
        DataLoaderConfigBuilder::default()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(batch_size) = self.batch_size {
            ensure!(
                batch_size > 0,
                "batch_size must be > 0, but got batch_size={}",
                batch_size
            );
        }
        if self.num_workers > 0 {
            ensure!(
                self.prefetch_factor > 0,
                "prefetch_factor must be > 0 when num_workers > 0 (got num_workers={})",
                self.num_workers
            );
        }
        ensure!(!self.timeout.is_zero(), "timeout must be non-zero");
        ensure!(
            !self.worker_timeout.is_zero(),
            "worker_timeout must be non-zero"
        );
        Ok(())
    }
}

/// Builder for DataLoaderConfig with method chaining
#[derive(Debug, Default)]
pub struct DataLoaderConfigBuilder {
    config: DataLoaderConfig,
}

impl DataLoaderConfigBuilder {
    /// Set the batch size (must be > 0)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = Some(size);
        self
    }

    /// Set the number of workers
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = workers;
        self
    }

    /// Set whether to drop_last
    pub fn drop_last(mut self, drop: bool) -> Self {
        self.config.drop_last = Some(drop);
        self
    }

    /// Set whether to shuffle dataset every epoch
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.config.shuffle = Some(shuffle);
        self
    }

    /// Set the random seed for reproducible data loading.
    ///
    /// When set, this seed controls:
    /// - Index shuffling (if shuffle = true)
    /// - Random augmentations, on the main thread and in workers
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the number of batches queued per worker.
    pub fn prefetch_factor(mut self, factor: usize) -> Self {
        self.config.prefetch_factor = factor;
        self
    }

    /// Set the timeout for receiving a batch.
    ///
    /// - Too low: May fail batches during legitimate heavy processing
    /// - Too high: Delays detection of stuck workers.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the worker polling interval
    pub fn worker_timeout(mut self, worker_timeout: Duration) -> Self {
        self.config.worker_timeout = worker_timeout;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> DataLoaderConfig {
        self.config
    }
}
