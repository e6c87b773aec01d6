//! Core types, error definitions, and data structures for crop_pipeline.

use data_contracts::label::ValidationError;
use footprint_core::{CropRect, GeometryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type CropResult<T> = Result<T, CropError>;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("feature {uid}: {source}")]
    Label {
        uid: String,
        #[source]
        source: ValidationError,
    },
    #[error("{pair_id} {phase} labels have no `{system}` features")]
    MissingCoordinateSystem {
        pair_id: String,
        phase: DisasterPhase,
        system: String,
    },
    #[error("feature {uid}: {source}")]
    Geometry {
        uid: String,
        #[source]
        source: GeometryError,
    },
}

impl CropError {
    pub fn geometry(&self) -> Option<&GeometryError> {
        match self {
            CropError::Geometry { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterPhase {
    Pre,
    Post,
}

impl DisasterPhase {
    pub const BOTH: [DisasterPhase; 2] = [DisasterPhase::Pre, DisasterPhase::Post];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisasterPhase::Pre => "pre",
            DisasterPhase::Post => "post",
        }
    }

    /// File-name suffix, e.g. `pre_disaster`.
    pub fn suffix(&self) -> String {
        format!("{}_disaster", self.as_str())
    }
}

impl fmt::Display for DisasterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options controlling how a label document is read and crops are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropOptions {
    /// Coordinate system holding pixel-space polygons.
    pub coordinate_system: String,
    /// Output image extension; also selects the encoder.
    pub extension: String,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            coordinate_system: data_contracts::PIXEL_COORDINATES.to_string(),
            extension: "png".to_string(),
        }
    }
}

/// Directory layout of a dataset split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairLayout {
    pub images_subdir: String,
    pub labels_subdir: String,
    pub image_extension: String,
}

impl Default for PairLayout {
    fn default() -> Self {
        Self {
            images_subdir: "images".to_string(),
            labels_subdir: "labels".to_string(),
            image_extension: "png".to_string(),
        }
    }
}

/// Raster and label paths for one pre/post image pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePairPaths {
    /// Pair identifier, e.g. `socal-fire_00000031`.
    pub pair_id: String,
    pub pre_image: PathBuf,
    pub post_image: PathBuf,
    pub pre_label: PathBuf,
    pub post_label: PathBuf,
}

impl ImagePairPaths {
    pub fn from_layout(root: &Path, layout: &PairLayout, pair_id: &str) -> Self {
        let images = root.join(&layout.images_subdir);
        let labels = root.join(&layout.labels_subdir);
        let image_name =
            |phase: DisasterPhase| format!("{pair_id}_{}.{}", phase.suffix(), layout.image_extension);
        let label_name = |phase: DisasterPhase| format!("{pair_id}_{}.json", phase.suffix());
        Self {
            pair_id: pair_id.to_string(),
            pre_image: images.join(image_name(DisasterPhase::Pre)),
            post_image: images.join(image_name(DisasterPhase::Post)),
            pre_label: labels.join(label_name(DisasterPhase::Pre)),
            post_label: labels.join(label_name(DisasterPhase::Post)),
        }
    }

    pub fn image(&self, phase: DisasterPhase) -> &Path {
        match phase {
            DisasterPhase::Pre => &self.pre_image,
            DisasterPhase::Post => &self.post_image,
        }
    }

    pub fn label(&self, phase: DisasterPhase) -> &Path {
        match phase {
            DisasterPhase::Pre => &self.pre_label,
            DisasterPhase::Post => &self.post_label,
        }
    }

    /// Paths of this pair that do not exist on disk.
    pub fn missing_files(&self) -> Vec<PathBuf> {
        [
            &self.pre_image,
            &self.post_image,
            &self.pre_label,
            &self.post_label,
        ]
        .into_iter()
        .filter(|p| !p.exists())
        .cloned()
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPair {
    pub pair_id: String,
    pub missing: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairIndex {
    pub pairs: Vec<ImagePairPaths>,
    pub missing: Vec<MissingPair>,
}

/// A crop written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CroppedFeature {
    pub phase: DisasterPhase,
    pub uid: String,
    pub feature_type: String,
    pub rect: CropRect,
    pub path: PathBuf,
}

/// A label document (or its raster) that could not be processed. The other
/// phase of the pair is unaffected.
#[derive(Debug)]
pub struct DocumentFailure {
    pub phase: DisasterPhase,
    pub error: CropError,
}

/// A feature that produced no crop.
#[derive(Debug)]
pub struct FeatureFailure {
    pub phase: DisasterPhase,
    pub uid: String,
    pub feature_type: String,
    pub error: CropError,
}

#[derive(Debug, Default)]
pub struct PairReport {
    pub pair_id: String,
    pub crops: Vec<CroppedFeature>,
    pub failures: Vec<FeatureFailure>,
    pub document_failures: Vec<DocumentFailure>,
}

impl PairReport {
    pub fn new(pair_id: impl Into<String>) -> Self {
        Self {
            pair_id: pair_id.into(),
            ..Default::default()
        }
    }

    /// Fold one phase's outcome into the report.
    pub fn record_phase(
        &mut self,
        phase: DisasterPhase,
        outcome: CropResult<(Vec<CroppedFeature>, Vec<FeatureFailure>)>,
    ) {
        match outcome {
            Ok((crops, failures)) => {
                self.crops.extend(crops);
                self.failures.extend(failures);
            }
            Err(error) => {
                log::warn!("{} {phase}: document skipped: {error}", self.pair_id);
                self.document_failures.push(DocumentFailure { phase, error });
            }
        }
    }
}

/// A pair that could not be processed at all, e.g. its output directory
/// could not be created.
#[derive(Debug)]
pub struct PairFailure {
    pub pair_id: String,
    pub error: CropError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<PairReport>,
    pub failures: Vec<PairFailure>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSummary {
    pub pairs_processed: usize,
    pub pairs_failed: usize,
    pub documents_failed: usize,
    pub crops_written: usize,
    pub features_failed: usize,
}

impl BatchReport {
    pub fn summary(&self) -> CropSummary {
        CropSummary {
            pairs_processed: self.reports.len(),
            pairs_failed: self.failures.len(),
            documents_failed: self.reports.iter().map(|r| r.document_failures.len()).sum(),
            crops_written: self.reports.iter().map(|r| r.crops.len()).sum(),
            features_failed: self.reports.iter().map(|r| r.failures.len()).sum(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairSummary {
    pub pair_id: String,
    pub pre_features: usize,
    pub post_features: usize,
    pub invalid_documents: usize,
    pub empty_documents: usize,
    /// Features rejected by label checks or geometry reduction.
    pub feature_failures: usize,
}

impl PairSummary {
    pub fn features(&self) -> usize {
        self.pre_features + self.post_features
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub pairs: Vec<PairSummary>,
    pub missing_pairs: usize,
    pub totals: PairSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Pass,
    Warn,
    Fail,
}

impl ValidationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::Pass => "pass",
            ValidationOutcome::Warn => "warn",
            ValidationOutcome::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationThresholds {
    pub max_invalid: Option<usize>,
    pub max_missing: Option<usize>,
    pub max_empty: Option<usize>,
    pub max_feature_failures: Option<usize>,
    pub max_invalid_ratio: Option<f32>,
    pub max_missing_ratio: Option<f32>,
    pub max_empty_ratio: Option<f32>,
    pub max_feature_failure_ratio: Option<f32>,
}

impl ValidationThresholds {
    pub fn from_env() -> Self {
        fn parse_usize(key: &str) -> Option<usize> {
            std::env::var(key).ok()?.parse().ok()
        }
        fn parse_ratio(key: &str) -> Option<f32> {
            std::env::var(key).ok()?.parse().ok()
        }
        ValidationThresholds {
            max_invalid: parse_usize("XBD_MAX_INVALID"),
            max_missing: parse_usize("XBD_MAX_MISSING"),
            max_empty: parse_usize("XBD_MAX_EMPTY"),
            max_feature_failures: parse_usize("XBD_MAX_FEATURE_FAILURES"),
            max_invalid_ratio: parse_ratio("XBD_MAX_INVALID_RATIO"),
            max_missing_ratio: parse_ratio("XBD_MAX_MISSING_RATIO"),
            max_empty_ratio: parse_ratio("XBD_MAX_EMPTY_RATIO"),
            max_feature_failure_ratio: parse_ratio("XBD_MAX_FEATURE_FAILURE_RATIO"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub reasons: Vec<String>,
    pub summary: DatasetSummary,
}
