//! Shared data contracts for label documents and evaluation results.

pub mod evaluation;
pub mod label;

pub use evaluation::{DamageLevel, EvaluationRecord, ScoredRecord, UnknownDamageLevel};
pub use label::{
    FeatureProperties, FeatureRecord, LabelDocument, LabelMetadata, ValidationError,
    GEO_COORDINATES, PIXEL_COORDINATES,
};
