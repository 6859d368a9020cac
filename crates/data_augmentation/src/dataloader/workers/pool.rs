//! Worker pool implementation for parallel data loading.
//!
//! Each worker owns a bounded task channel. The main thread routes every
//! task to a specific worker, so the worker that runs a batch (and therefore
//! the RNG stream its augmentations draw from) depends only on the batch
//! index. All workers share one bounded output channel.

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

use crate::dataloader::common::thread::WORKER_ID;

/// Thread pool with per-worker task channels.
///
/// - Task channels: Main thread -> Worker `i` (deterministic routing)
/// - Output channel: Workers -> Main thread
/// - Shutdown flag: set on drop, polled by idle workers
pub(crate) struct WorkerPool<Task, Output> {
    workers: Vec<thread::JoinHandle<()>>,
    worker_task_txs: Vec<Sender<Task>>,
    output_rx: Receiver<Output>,
    shutdown: Arc<AtomicBool>,
}

impl<Task, Output> WorkerPool<Task, Output>
where
    Task: Send + 'static,
    Output: Send + 'static,
{
    /// Spawns `num_workers` threads named `dataloader-worker-{id}`.
    ///
    /// `buffer_size` bounds each task channel; the output channel holds
    /// `buffer_size * num_workers` results so workers never block on it while
    /// the caller keeps at most that many tasks in flight.
    pub(crate) fn new<F>(num_workers: usize, buffer_size: usize, worker_fn: F) -> Result<Self>
    where
        F: Fn(usize, Receiver<Task>, Sender<Output>, Arc<AtomicBool>) + Send + Sync + 'static,
    {
        if num_workers == 0 {
            return Err(anyhow!(
                "Cannot create WorkerPool with 0 workers. \
                Either set num_workers > 0 or use single-threaded mode."
            ));
        }

        if buffer_size == 0 {
            return Err(anyhow!(
                "Cannot create WorkerPool with buffer_size 0. \
                Buffer size must be > 0 to prevent deadlocks."
            ));
        }

        let (output_tx, output_rx) = bounded(buffer_size * num_workers);
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_fn = Arc::new(worker_fn);

        let mut workers = Vec::with_capacity(num_workers);
        let mut worker_task_txs = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (task_tx, task_rx) = bounded(buffer_size);
            let output_tx = output_tx.clone();
            let shutdown = shutdown.clone();
            let worker_fn = worker_fn.clone();

            let handle = thread::Builder::new()
                .name(format!("dataloader-worker-{}", worker_id))
                .spawn(move || {
                    WORKER_ID.with(|id| *id.borrow_mut() = worker_id);
                    worker_fn(worker_id, task_rx, output_tx, shutdown);
                })
                .with_context(|| format!("Failed to spawn worker thread {}", worker_id))?;

            workers.push(handle);
            worker_task_txs.push(task_tx);
        }

        debug!(num_workers, buffer_size, "worker pool started");
        Ok(Self {
            workers,
            worker_task_txs,
            output_rx,
            shutdown,
        })
    }

    pub(crate) fn num_workers(&self) -> usize {
        self.worker_task_txs.len()
    }

    /// Sends a task to one worker, blocking while its queue is full.
    pub(crate) fn send_to(&self, worker_id: usize, task: Task) -> Result<()> {
        let tx = self
            .worker_task_txs
            .get(worker_id)
            .ok_or_else(|| anyhow!("No worker with id {}", worker_id))?;
        tx.send(task)
            .map_err(|_| anyhow!("Worker {} has disconnected", worker_id))
    }

    /// Receives the next output from any worker.
    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Result<Output> {
        self.output_rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => anyhow!(
                "Worker timeout after {:?} - possible deadlock or slow data loading",
                timeout
            ),
            RecvTimeoutError::Disconnected => {
                anyhow!("Worker channel disconnected - workers may have crashed")
            }
        })
    }
}

impl<Task, Output> Drop for WorkerPool<Task, Output> {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // Closing the task channels wakes up workers blocked in recv.
        self.worker_task_txs.clear();

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        debug!("worker pool stopped");
    }
}
