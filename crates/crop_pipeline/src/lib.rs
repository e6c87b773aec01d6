//! Per-building crops from pre/post-disaster rasters.
//!
//! This crate provides utilities for:
//! - Indexing image pairs and their label documents in a dataset split
//! - Cropping each labeled feature out of its raster, isolating per-feature failures
//! - Batch processing across pairs, optionally in parallel
//! - Dataset summaries with threshold validation

pub mod batch;
pub mod cropper;
pub mod pairs;
pub mod types;
pub mod validation;

pub use batch::{crop_dataset, BatchOptions};
pub use cropper::{crop_document, crop_feature, crop_features, crop_file_name, crop_image_pair};
pub use pairs::{index_pairs, load_label_document, load_raster};
pub use types::*;
pub use validation::{summarize_pairs, summarize_with_thresholds, validate_summary};
