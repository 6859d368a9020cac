//! Composable image augmentation, datasets and a multi-worker DataLoader
//! built on `tch` tensors.
//!
//! ```text
//! file ──► Dataset::get ──► Transform chain ──► Sample ──► DataLoader ──► MiniBatch
//!          (load, split)    (Compose, OneOf,    (named      (sampler,
//!                            ToTensor, Normalize) tensors)   workers, collator)
//! ```

pub mod checkpoint;
pub mod collator;
pub mod config;
pub mod dataloader;
pub mod dataset;
pub mod logging;
pub mod minibatch;
pub mod readers;
pub mod sample;
pub mod sampler;
pub mod transforms;
pub mod visualize;

pub use collator::{Collator, StackCollator};
pub use dataloader::{DataLoader, DataLoaderConfig};
pub use dataset::{Dataset, InMemoryDataset};
pub use minibatch::MiniBatch;
pub use sample::Sample;
pub use transforms::Transform;
