use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use tch::Tensor;

/// A single example produced by a dataset.
///
/// It maps feature names (e.g. `"image"`, `"mask_0"`, `"label"`) to their
/// tensors.
///
/// # Examples:
/// - wine row: `{"features": Tensor([13]), "label": Tensor([1])}`
/// - paired image: `{"input": Tensor([3, 256, 256]), "target": Tensor([3, 256, 256])}`
#[derive(Debug)]
pub struct Sample {
    pub features: HashMap<String, Tensor>,
}

/// Creates a shallow clone of the `Sample`
impl Clone for Sample {
    fn clone(&self) -> Self {
        let features = self
            .features
            .iter()
            .map(|(k, v)| (k.clone(), v.shallow_clone()))
            .collect();
        Self { features }
    }
}

/// Safety:
/// `tch::Tensor` is `Send`, and every mutation of a `Sample` goes through
/// `&mut self` or consumes it, so shared references only ever read.
unsafe impl Send for Sample {}
unsafe impl Sync for Sample {}

impl Sample {
    /// Creates a new `Sample` from a full feature map.
    pub fn new(features: HashMap<String, Tensor>) -> Self {
        Self { features }
    }

    /// Creates a `Sample` from a single `(feature_name, tensor)` pair.
    ///
    /// Chain with [`with_feature`](Self::with_feature) to add more features.
    pub fn from_single(name: impl Into<String>, tensor: Tensor) -> Self {
        Self {
            features: HashMap::from([(name.into(), tensor)]),
        }
    }

    /// Adds or overwrites a feature in the `Sample`.
    pub fn with_feature(mut self, name: impl Into<String>, tensor: Tensor) -> Self {
        self.features.insert(name.into(), tensor);
        self
    }

    /// Moves every feature of `other` into `self`. Duplicate names are an error.
    pub fn merge(mut self, other: Sample) -> Result<Self> {
        for (name, tensor) in other.features {
            if self.features.contains_key(&name) {
                bail!("Cannot merge samples: feature '{}' exists in both", name);
            }
            self.features.insert(name, tensor);
        }
        Ok(self)
    }

    /// Returns a reference to the tensor by feature name.
    pub fn get(&self, feature: &str) -> Result<&Tensor> {
        self.features
            .get(feature)
            .ok_or_else(|| anyhow!("Feature {} not found", feature))
    }

    /// Returns an iterator over all feature names in this `Sample`.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }
}
