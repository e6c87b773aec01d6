//! Cropping many image pairs, one pair per task.

use crate::cropper::crop_image_pair;
use crate::types::{BatchReport, CropOptions, CropResult, ImagePairPaths, PairFailure, PairReport};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub crop: CropOptions,
    /// Process pairs on the rayon pool. Features of one pair stay sequential.
    pub parallel: bool,
    /// Write each pair's crops into `<output_dir>/<pair_id>/`.
    pub split_by_pair: bool,
}

impl BatchOptions {
    pub fn pair_output_dir(&self, output_dir: &Path, pair_id: &str) -> PathBuf {
        if self.split_by_pair {
            output_dir.join(pair_id)
        } else {
            output_dir.to_path_buf()
        }
    }
}

/// Crop every pair into `output_dir`. Results keep the input order.
pub fn crop_dataset(pairs: &[ImagePairPaths], output_dir: &Path, opts: &BatchOptions) -> BatchReport {
    let crop_one = |paths: &ImagePairPaths| -> (String, CropResult<PairReport>) {
        let dir = opts.pair_output_dir(output_dir, &paths.pair_id);
        (paths.pair_id.clone(), crop_image_pair(paths, &dir, &opts.crop))
    };
    let results: Vec<(String, CropResult<PairReport>)> = if opts.parallel {
        pairs.par_iter().map(crop_one).collect()
    } else {
        pairs.iter().map(crop_one).collect()
    };

    let mut batch = BatchReport::default();
    for (pair_id, result) in results {
        match result {
            Ok(report) => batch.reports.push(report),
            Err(error) => {
                log::error!("pair {pair_id} failed: {error}");
                batch.failures.push(PairFailure { pair_id, error });
            }
        }
    }
    batch
}
