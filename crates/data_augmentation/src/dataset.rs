use crate::sample::Sample;
use crate::transforms::Transform;
use anyhow::{anyhow, ensure, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A `Dataset` provides indexed access to samples.
///
/// `get` builds the sample on demand (loading, augmenting and converting
/// to tensors as needed), so two calls with the same index may return
/// different augmentations.
///
/// All implementations must be `Send + Sync` so the DataLoader can share
/// them with its worker threads.
pub trait Dataset: Send + Sync {
    /// Returns total number of samples.
    fn len(&self) -> usize;

    /// Produces the sample at `index`, or an error if `index >= len()`.
    fn get(&self, index: usize) -> Result<Sample>;

    /// Checks if the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: Dataset + ?Sized> Dataset for Arc<D> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        (**self).get(index)
    }
}

/// A dataset that keeps raw records in contiguous memory (`Arc<[Raw]>`)
/// and turns them into [`Sample`]s with a transform on every `get`.
///
/// Cloning only bumps the `Arc` counters.
///
/// # Example
/// ```ignore
/// let dataset = InMemoryDataset::new(paths)
///     .with_transform(LoadImage.then(augment).then(to_sample));
/// let sample = dataset.get(0)?;
/// ```
pub struct InMemoryDataset<Raw> {
    records: Arc<[Raw]>,
    transform: Option<Arc<dyn Transform<Raw, Sample>>>,
    metadata: HashMap<String, String>,
}

impl<Raw> Clone for InMemoryDataset<Raw> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            transform: self.transform.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl<Raw> fmt::Debug for InMemoryDataset<Raw> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryDataset")
            .field("len", &self.records.len())
            .field("has_transform", &self.transform.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl<Raw> InMemoryDataset<Raw> {
    /// Creates a new in-memory dataset from a vector of raw records.
    pub fn new(records: Vec<Raw>) -> Self {
        Self {
            records: records.into(),
            transform: None,
            metadata: HashMap::new(),
        }
    }

    /// Sets the transform that turns one raw record into a `Sample`.
    pub fn with_transform<T>(mut self, transform: T) -> Self
    where
        T: Transform<Raw, Sample> + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Adds/updates metadata and returns the modified dataset.
    /// Enables chaining: `dataset.with_metadata("source", "train")`.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the value of a metadata field, if it exists.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }

    /// Returns the raw records.
    pub fn records(&self) -> &[Raw] {
        &self.records
    }
}

impl<Raw> Dataset for InMemoryDataset<Raw>
where
    Raw: Clone + Send + Sync,
{
    fn len(&self) -> usize {
        self.records.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        ensure!(
            index < self.records.len(),
            "Index {} out of range for dataset of length {}",
            index,
            self.records.len()
        );
        let transform = self
            .transform
            .as_ref()
            .ok_or_else(|| anyhow!("InMemoryDataset has no transform; call with_transform()"))?;
        transform.apply(self.records[index].clone())
    }
}
