//! src/dataloader/iterator.rs
//!
//! Iterator implementation for DataLoader.
//!
//! # Iterator Variants
//! - `Single`: builds every batch on the calling thread.
//! - `Multi`: keeps up to `num_workers * prefetch_factor` batches in flight
//!   on a fresh worker pool and hands them out in sampler order. Batches
//!   that finish early wait in a reorder buffer.

use crate::collator::Collator;
use crate::dataset::Dataset;
use crate::minibatch::MiniBatch;
use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

use crate::dataloader::common::thread::init_worker_rng;
use crate::dataloader::workers::batch::{process_batch, BatchOutput, BatchTask};
use crate::dataloader::workers::pool::WorkerPool;

/// Iterator over the batches of one epoch.
///
/// Created by calling `dataloader.iter()`. Each item is the batch or the
/// error that stopped it; a failed batch does not end the epoch, but a
/// worker timeout or disconnect does.
pub struct DataLoaderIter<'a, D, C> {
    inner: IteratorImpl<'a, D, C>,
}

/// Internal iterator implementation variants.
enum IteratorImpl<'a, D, C> {
    /// Single-threaded iteration.
    /// - `rng_initialized`: whether the calling thread's RNG was seeded for this epoch
    Single {
        dataset: &'a D,
        collator: &'a C,
        batch_indices: Box<dyn Iterator<Item = Vec<usize>> + Send + 'a>,
        epoch: usize,
        seed: u64,
        rng_initialized: bool,
    },

    /// Multi-threaded with fresh workers per epoch.
    /// - `next_to_send`: index of the next batch to hand to a worker
    /// - `next_to_yield`: index of the next batch the caller receives
    /// - `reorder`: finished batches waiting for their turn
    /// - `failed`: set after a timeout or disconnect; the iterator then ends
    Multi {
        pool: WorkerPool<BatchTask, BatchOutput>,
        batch_indices: Box<dyn Iterator<Item = Vec<usize>> + Send + 'a>,
        timeout: Duration,
        max_in_flight: usize,
        next_to_send: usize,
        next_to_yield: usize,
        reorder: HashMap<usize, Result<MiniBatch>>,
        exhausted: bool,
        failed: bool,
    },
}

impl<'a, D, C> DataLoaderIter<'a, D, C>
where
    D: Dataset,
    C: Collator,
{
    pub(crate) fn single(
        dataset: &'a D,
        collator: &'a C,
        batch_indices: Box<dyn Iterator<Item = Vec<usize>> + Send + 'a>,
        epoch: usize,
        seed: u64,
    ) -> Self {
        Self {
            inner: IteratorImpl::Single {
                dataset,
                collator,
                batch_indices,
                epoch,
                seed,
                rng_initialized: false,
            },
        }
    }

    pub(crate) fn multi(
        pool: WorkerPool<BatchTask, BatchOutput>,
        batch_indices: Box<dyn Iterator<Item = Vec<usize>> + Send + 'a>,
        timeout: Duration,
        prefetch_factor: usize,
    ) -> Self {
        let max_in_flight = pool.num_workers() * prefetch_factor;
        Self {
            inner: IteratorImpl::Multi {
                pool,
                batch_indices,
                timeout,
                max_in_flight,
                next_to_send: 0,
                next_to_yield: 0,
                reorder: HashMap::new(),
                exhausted: false,
                failed: false,
            },
        }
    }
}

impl<'a, D, C> Iterator for DataLoaderIter<'a, D, C>
where
    D: Dataset,
    C: Collator,
{
    type Item = Result<MiniBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IteratorImpl::Single {
                dataset,
                collator,
                batch_indices,
                epoch,
                seed,
                rng_initialized,
            } => {
                if !*rng_initialized {
                    init_worker_rng(0, *epoch, *seed);
                    *rng_initialized = true;
                }
                let indices = batch_indices.next()?;
                trace!(batch_size = indices.len(), "building batch");
                Some(process_batch(*dataset, &indices, *collator))
            }

            IteratorImpl::Multi {
                pool,
                batch_indices,
                timeout,
                max_in_flight,
                next_to_send,
                next_to_yield,
                reorder,
                exhausted,
                failed,
            } => {
                if *failed {
                    return None;
                }

                // Batches in flight always form the range [next_to_yield, next_to_send),
                // so each worker holds at most `prefetch_factor` of them.
                while !*exhausted && *next_to_send - *next_to_yield < *max_in_flight {
                    match batch_indices.next() {
                        Some(indices) => {
                            let worker_id = *next_to_send % pool.num_workers();
                            let task = BatchTask {
                                batch_index: *next_to_send,
                                indices,
                            };
                            if let Err(e) = pool.send_to(worker_id, task) {
                                *failed = true;
                                return Some(Err(e));
                            }
                            *next_to_send += 1;
                        }
                        None => *exhausted = true,
                    }
                }

                loop {
                    if let Some(result) = reorder.remove(&*next_to_yield) {
                        *next_to_yield += 1;
                        return Some(result);
                    }
                    if *next_to_yield == *next_to_send {
                        debug!(batches = *next_to_yield, "epoch finished");
                        return None;
                    }
                    match pool.recv_timeout(*timeout) {
                        Ok((batch_index, result)) => {
                            trace!(batch_index, buffered = reorder.len(), "batch received");
                            reorder.insert(batch_index, result);
                        }
                        Err(e) => {
                            *failed = true;
                            return Some(Err(e));
                        }
                    }
                }
            }
        }
    }
}
