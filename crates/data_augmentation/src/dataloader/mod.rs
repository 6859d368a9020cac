//! src/dataloader/mod.rs
//!
//! This module implements the `DataLoader`.
//!
//! The `DataLoader` coordinates the `Dataset`, `Sampler`, and `Collator` to
//! load and batch data for training, optionally on worker threads.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌─────────┐
//!                    │ Dataset │ (get(i) loads + augments one sample)
//!                    └────┬────┘
//!                         │
//!                    ┌─────────┐
//!                    │ Sampler │ (sequential or shuffled, batched)
//!                    └────┬────┘
//!                         │ batch indices
//!                         ↓
//!                  ┌──────────────┐
//!                  │  DataLoader  │ ←───── Config (batch_size, workers, etc.)
//!                  └──────┬───────┘
//!                         │
//!                         ↓
//!                   [Worker Threads] (batch b → worker b % num_workers)
//!                         │
//!                         ↓
//!                    ┌──────────┐
//!                    │ Collator │ (stacks samples)
//!                    └────┬─────┘
//!                         ↓
//!                   ┌───────────┐
//!                   │ MiniBatch │ (in sampler order)
//!                   └───────────┘
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/dataloader/
//! ├── mod.rs             # Public API exports + module-level architecture docs
//! ├── config.rs          # DataLoaderConfig, builder, and validation
//! ├── loader.rs          # DataLoader struct, constructors and iter()
//! ├── iterator.rs        # DataLoaderIter (single-threaded and multi-worker)
//! ├── workers/
//! │   ├── mod.rs
//! │   ├── pool.rs        # Generic `WorkerPool<Task, Output>`
//! │   └── batch.rs       # Batch tasks and the worker loop
//! └── common/
//!     ├── mod.rs
//!     └── thread.rs      # Thread-local worker ID and RNG
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! let dataset = LabeledCsvDataset::from_path("data/wine.csv")?;
//! let config = DataLoaderConfig::builder()
//!     .batch_size(4)
//!     .shuffle(true)
//!     .num_workers(2)
//!     .build();
//!
//! let dataloader = DataLoader::new(dataset, config)?;
//! for epoch in 0..2 {
//!     for batch in dataloader.iter()? {
//!         let batch: MiniBatch = batch?;
//!         // batch.get("features")?, batch.get("label")?
//!     }
//! }
//! ```
//!
//! # Performance Guidelines
//! - `num_workers = 0`: Single-threaded, lowest memory usage but no parallelism
//! - `num_workers > 0`: Multi-threaded loading; memory is
//!   O(num_workers x prefetch_factor x batch_size)
//! - Increase `prefetch_factor` if augmentation cost varies a lot per sample.

mod common;
mod config;
mod iterator;
mod loader;
mod workers;

pub use config::{DataLoaderConfig, DataLoaderConfigBuilder};
pub use iterator::DataLoaderIter;
pub use loader::DataLoader;

pub use common::thread::{
    init_worker_rng, with_worker_rng, worker_gen_bool, worker_gen_range, WORKER_ID, WORKER_RNG,
};
