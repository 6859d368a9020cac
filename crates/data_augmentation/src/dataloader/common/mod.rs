//! src/dataloader/common/mod.rs
//!
//! Utilities shared by the single-threaded and multi-worker iterators.

pub mod thread;
