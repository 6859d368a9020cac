//! Worker management for parallel data loading.
//!
//! - `pool`: generic thread pool with per-worker task channels
//! - `batch`: the batch-building worker loop run inside the pool

pub(crate) mod batch;
pub(crate) mod pool;
