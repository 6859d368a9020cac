//! src/dataloader/workers/batch.rs
//!
//! Workers that turn a list of dataset indices into a `MiniBatch`.
//!
//! # Architecture:
//! - Workers share the dataset via `Arc` for zero-copy access.
//! - Batch `b` always goes to worker `b % num_workers`.
//! - Every worker seeds its RNG from `(seed, epoch, worker_id)` before its
//!   first batch, so augmentations are reproducible for a fixed seed and
//!   worker count.

use crate::collator::Collator;
use crate::dataset::Dataset;
use crate::minibatch::MiniBatch;
use anyhow::{Context, Result};
use crossbeam_channel::RecvTimeoutError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, trace};

use super::pool::WorkerPool;
use crate::dataloader::common::thread::init_worker_rng;
use crate::dataloader::config::DataLoaderConfig;

/// A mini-batch to build, tagged with its position in the epoch.
#[derive(Debug)]
pub(crate) struct BatchTask {
    pub(crate) batch_index: usize,
    pub(crate) indices: Vec<usize>,
}

/// The built batch (or the error that stopped it) with its position.
pub(crate) type BatchOutput = (usize, Result<MiniBatch>);

/// Fetches every sample and collates them. Shared by the single-threaded
/// iterator and the workers.
pub(crate) fn process_batch<D, C>(dataset: &D, indices: &[usize], collator: &C) -> Result<MiniBatch>
where
    D: Dataset + ?Sized,
    C: Collator,
{
    let samples = indices
        .iter()
        .map(|&index| {
            dataset
                .get(index)
                .with_context(|| format!("Failed to load sample {}", index))
        })
        .collect::<Result<Vec<_>>>()?;
    collator.collate(&samples)
}

/// Spawns a fresh pool for one epoch.
pub(crate) fn spawn_batch_pool<D, C>(
    dataset: Arc<D>,
    collator: C,
    config: &DataLoaderConfig,
    epoch: usize,
    base_seed: u64,
) -> Result<WorkerPool<BatchTask, BatchOutput>>
where
    D: Dataset + 'static,
    C: Collator + Clone + Send + Sync + 'static,
{
    let poll_interval = config.worker_timeout;

    WorkerPool::new(
        config.num_workers,
        config.prefetch_factor,
        move |worker_id, task_rx, output_tx, shutdown| {
            init_worker_rng(worker_id, epoch, base_seed);
            debug!(worker_id, epoch, "worker started");

            while !shutdown.load(Ordering::Relaxed) {
                let task: BatchTask = match task_rx.recv_timeout(poll_interval) {
                    Ok(task) => task,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                };

                trace!(worker_id, batch = task.batch_index, "processing batch");
                let result = process_batch(dataset.as_ref(), &task.indices, &collator)
                    .with_context(|| {
                        format!("Worker {} failed on batch {}", worker_id, task.batch_index)
                    });

                if output_tx.send((task.batch_index, result)).is_err() {
                    break;
                }
            }
            debug!(worker_id, epoch, "worker stopped");
        },
    )
    .context("Failed to start dataloader workers")
}
