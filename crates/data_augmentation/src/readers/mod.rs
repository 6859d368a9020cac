//! Datasets backed by files on disk.

pub mod labeled_csv;
pub mod paired_images;

pub use labeled_csv::LabeledCsvDataset;
pub use paired_images::{PairedImageDataset, PAIRED_TARGET};
