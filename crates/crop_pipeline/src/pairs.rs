//! Loading and indexing image pairs from a dataset split.

use crate::types::{
    CropError, CropResult, DisasterPhase, ImagePairPaths, MissingPair, PairIndex, PairLayout,
};
use data_contracts::label::LabelDocument;
use std::fs;
use std::path::Path;

/// Scan `root/<images_subdir>` for post-disaster rasters and pair each with
/// its pre-disaster raster and both label documents.
pub fn index_pairs(root: &Path, layout: &PairLayout) -> CropResult<PairIndex> {
    let images_dir = root.join(&layout.images_subdir);
    let entries = fs::read_dir(&images_dir).map_err(|e| CropError::Io {
        path: images_dir.clone(),
        source: e,
    })?;
    let post_suffix = format!(
        "_{}.{}",
        DisasterPhase::Post.suffix(),
        layout.image_extension
    );

    let mut pair_ids: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name();
            name.to_str()?
                .strip_suffix(post_suffix.as_str())
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .collect();
    pair_ids.sort();

    let mut index = PairIndex::default();
    for pair_id in pair_ids {
        let paths = ImagePairPaths::from_layout(root, layout, &pair_id);
        let missing = paths.missing_files();
        if missing.is_empty() {
            index.pairs.push(paths);
        } else {
            log::warn!("pair {pair_id} is incomplete: {} file(s) missing", missing.len());
            index.missing.push(MissingPair { pair_id, missing });
        }
    }
    Ok(index)
}

/// Read one label document. Per-feature checks happen at crop time.
pub fn load_label_document(path: &Path) -> CropResult<LabelDocument> {
    let raw = fs::read(path).map_err(|e| CropError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_slice(&raw).map_err(|e| CropError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Decode a raster fully into memory.
pub fn load_raster(path: &Path) -> CropResult<image::DynamicImage> {
    image::open(path).map_err(|e| CropError::Image {
        path: path.to_path_buf(),
        source: e,
    })
}
