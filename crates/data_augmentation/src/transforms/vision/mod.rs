//! src/transforms/vision/mod.rs
//!
//! Image augmentation for classification, segmentation and paired
//! image-to-image data.
//!
//! # Module Organization
//!
//! ```text
//! transforms/vision/
//! ├── targets.rs      → Targets: image + masks + additional images
//! ├── compose.rs      → Augmentation trait, Compose, OneOf
//! ├── geometric.rs    → Resize, RandomCrop, Rotate, flips (all targets)
//! ├── photometric.rs  → RgbShift, Blur, ColorJitter (image targets only)
//! ├── conversion.rs   → ToTensor, Normalize, TargetsToSample
//! └── io.rs           → Image loading and stitched-pair splitting
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use crate::transforms::vision::*;
//!
//! let pipeline = Compose::new()
//!     .with_step(Resize::new(256, 256)?)
//!     .with_step(HorizontalFlip::new(0.5)?)
//!     .with_additional_target("image0");
//!
//! let out = pipeline.apply(Targets::new(input).with_image("image0", target))?;
//! ```

pub mod compose;
pub mod conversion;
pub mod geometric;
pub mod io;
pub mod photometric;
pub mod targets;

pub use compose::{Augmentation, Compose, OneOf};
pub use conversion::{Normalize, TargetsToSample, ToTensor};
pub use geometric::{BorderMode, HorizontalFlip, RandomCrop, Resize, Rotate, VerticalFlip};
pub use io::{load_mask, load_rgb, split_stitched, LoadImage};
pub use photometric::{Blur, ColorJitter, RgbShift};
pub use targets::{Targets, IMAGE};
