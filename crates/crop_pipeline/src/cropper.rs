//! Cutting per-feature crops out of a decoded raster.

use crate::pairs::{load_label_document, load_raster};
use crate::types::{
    CropError, CropOptions, CropResult, CroppedFeature, DisasterPhase, FeatureFailure,
    ImagePairPaths, PairReport,
};
use data_contracts::label::{FeatureRecord, LabelDocument, ValidationError};
use footprint_core::{CropRect, GeometryResult, ProcessedFeature};
use image::{DynamicImage, GenericImageView};
use std::fs;
use std::path::Path;

/// `{pair}_{uid}_{feature_type}_{pre|post}_disaster.{ext}`
pub fn crop_file_name(
    pair_id: &str,
    feature: &ProcessedFeature,
    phase: DisasterPhase,
    extension: &str,
) -> String {
    format!(
        "{pair_id}_{}_{}_{}.{extension}",
        feature.uid,
        feature.feature_type,
        phase.suffix()
    )
}

/// Crop one feature's box, clamped to the raster bounds. The source is not modified.
pub fn crop_feature(
    raster: &DynamicImage,
    feature: &ProcessedFeature,
) -> GeometryResult<(CropRect, DynamicImage)> {
    let (width, height) = raster.dimensions();
    let rect = feature.bbox.clamp_to_frame(width, height)?;
    Ok((rect, raster.crop_imm(rect.x, rect.y, rect.width, rect.height)))
}

/// Process every feature of one label document against its raster.
///
/// Label and geometry failures are collected per feature; only a missing
/// coordinate system fails the whole document.
pub fn crop_document(
    pair_id: &str,
    phase: DisasterPhase,
    raster: &DynamicImage,
    doc: &LabelDocument,
    output_dir: &Path,
    opts: &CropOptions,
) -> CropResult<(Vec<CroppedFeature>, Vec<FeatureFailure>)> {
    let records = doc
        .features_in(&opts.coordinate_system)
        .ok_or_else(|| CropError::MissingCoordinateSystem {
            pair_id: pair_id.to_string(),
            phase,
            system: opts.coordinate_system.clone(),
        })?;

    let mut invalid = doc.record_errors(&opts.coordinate_system);
    let (width, height) = raster.dimensions();
    let mut crops = Vec::with_capacity(records.len());
    let mut failures = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let outcome = match invalid.remove(&index) {
            Some(source) => Err(label_error(record, source)),
            None => crop_record(pair_id, phase, raster, record, output_dir, opts),
        };
        match outcome {
            Ok(crop) => crops.push(crop),
            Err(error) => {
                log::warn!("{pair_id} {phase}: skipping feature: {error}");
                failures.push(FeatureFailure {
                    phase,
                    uid: record.properties.uid.clone(),
                    feature_type: record.properties.feature_type.clone(),
                    error,
                });
            }
        }
    }
    log::debug!(
        "{pair_id} {phase}: {} crops, {} failures from {width}x{height} raster",
        crops.len(),
        failures.len()
    );
    Ok((crops, failures))
}

fn label_error(record: &FeatureRecord, source: ValidationError) -> CropError {
    CropError::Label {
        uid: record.properties.uid.clone(),
        source,
    }
}

/// Crop a record that already passed label checks.
fn crop_record(
    pair_id: &str,
    phase: DisasterPhase,
    raster: &DynamicImage,
    record: &FeatureRecord,
    output_dir: &Path,
    opts: &CropOptions,
) -> CropResult<CroppedFeature> {
    let geometry_err = |source| CropError::Geometry {
        uid: record.properties.uid.clone(),
        source,
    };
    let feature = ProcessedFeature::from_record(record).map_err(geometry_err)?;
    let (rect, cropped) = crop_feature(raster, &feature).map_err(geometry_err)?;
    let path = output_dir.join(crop_file_name(pair_id, &feature, phase, &opts.extension));
    cropped.save(&path).map_err(|e| CropError::Image {
        path: path.clone(),
        source: e,
    })?;
    Ok(CroppedFeature {
        phase,
        uid: feature.uid,
        feature_type: feature.feature_type,
        rect,
        path,
    })
}

/// Crop both sides of an image pair from already-loaded rasters and documents.
///
/// Pre and post are processed independently: each side is cut from its own
/// raster using its own labels, with no UID matching across sides. A side
/// whose document fails is recorded in `document_failures` and the other side
/// is still cropped. Only an unusable `output_dir` fails the call.
pub fn crop_features(
    pair_id: &str,
    pre_raster: &DynamicImage,
    post_raster: &DynamicImage,
    pre_doc: &LabelDocument,
    post_doc: &LabelDocument,
    output_dir: &Path,
    opts: &CropOptions,
) -> CropResult<PairReport> {
    create_output_dir(output_dir)?;
    let mut report = PairReport::new(pair_id);
    for (phase, raster, doc) in [
        (DisasterPhase::Pre, pre_raster, pre_doc),
        (DisasterPhase::Post, post_raster, post_doc),
    ] {
        report.record_phase(
            phase,
            crop_document(pair_id, phase, raster, doc, output_dir, opts),
        );
    }
    Ok(report)
}

/// Load a pair from disk and crop it, one phase at a time. An unreadable
/// label or raster fails that phase only.
pub fn crop_image_pair(
    paths: &ImagePairPaths,
    output_dir: &Path,
    opts: &CropOptions,
) -> CropResult<PairReport> {
    log::info!("cropping pair {}", paths.pair_id);
    create_output_dir(output_dir)?;
    let mut report = PairReport::new(paths.pair_id.as_str());
    for phase in DisasterPhase::BOTH {
        let outcome = load_label_document(paths.label(phase)).and_then(|doc| {
            let raster = load_raster(paths.image(phase))?;
            crop_document(&paths.pair_id, phase, &raster, &doc, output_dir, opts)
        });
        report.record_phase(phase, outcome);
    }
    Ok(report)
}

fn create_output_dir(output_dir: &Path) -> CropResult<()> {
    fs::create_dir_all(output_dir).map_err(|e| CropError::Io {
        path: output_dir.to_path_buf(),
        source: e,
    })
}
