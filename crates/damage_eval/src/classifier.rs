//! Boundary to the external damage classifier and the evaluation driver.

use crop_pipeline::{load_label_document, CropError, ImagePairPaths};
use data_contracts::evaluation::{DamageLevel, EvaluationRecord};
use data_contracts::label::LabelDocument;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Instruction text sent alongside the pre (first) and post (second) images.
pub const ASSESSMENT_PROMPT: &str = "You are a disaster damage assessment expert analyzing aerial satellite imagery.
Compare the PRE-disaster (first image) and POST-disaster (second image).
Focus ONLY on buildings and structures.

Damage levels:
- no-damage: buildings identical in both images, no visible changes
- minor-damage: slight debris, discoloration, or minor roof damage on 1-2 buildings
- major-damage: clearly collapsed walls, missing roofs, or heavy debris on multiple buildings
- destroyed: buildings completely flattened, foundations only, or entirely gone

IMPORTANT: If you see flooding around intact buildings, that is minor-damage not major-damage.
IMPORTANT: If roofs are visibly missing or walls collapsed, that is major-damage.
IMPORTANT: Only classify as destroyed if the building footprint is gone entirely.

Respond with ONLY one label: no-damage, minor-damage, major-damage, or destroyed";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Request(String),
    #[error("classifier returned an empty response")]
    EmptyResponse,
    #[error("classifier process: {0}")]
    Process(#[from] std::io::Error),
}

/// A model that labels the damage between two encoded images of the same tile.
pub trait DamageClassifier {
    /// Returns the raw label text produced for `(pre, post)`.
    fn assess(&self, pre: &[u8], post: &[u8]) -> Result<String, ClassifierError>;
}

impl<F> DamageClassifier for F
where
    F: Fn(&[u8], &[u8]) -> Result<String, ClassifierError>,
{
    fn assess(&self, pre: &[u8], post: &[u8]) -> Result<String, ClassifierError> {
        self(pre, post)
    }
}

pub fn normalize_prediction(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Most common damage subtype among the document's features in `system`.
///
/// Ties go to the label that comes first in vocabulary order.
pub fn majority_ground_truth(doc: &LabelDocument, system: &str) -> Option<DamageLevel> {
    let mut counts: HashMap<DamageLevel, usize> = HashMap::new();
    for record in doc.features_in(system)? {
        let Some(subtype) = record.properties.subtype.as_deref() else {
            continue;
        };
        match subtype.parse::<DamageLevel>() {
            Ok(level) => *counts.entry(level).or_default() += 1,
            Err(e) => log::debug!("ignoring feature {}: {e}", record.properties.uid),
        }
    }
    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(level, _)| level)
}

#[derive(Debug, Error)]
pub enum PairError {
    #[error(transparent)]
    Label(#[from] CropError),
    #[error("read {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

#[derive(Debug, Default)]
pub struct EvaluationRun {
    pub records: Vec<EvaluationRecord>,
    /// Pairs without any labeled feature.
    pub skipped: Vec<String>,
    pub errors: Vec<(String, PairError)>,
}

/// Classify up to `max_pairs` pairs and record prediction against ground truth.
///
/// Ground truth is the majority subtype of the post-disaster labels in
/// `ground_truth_system`. A failing pair is recorded and the run continues.
pub fn evaluate_pairs<C>(
    pairs: &[ImagePairPaths],
    classifier: &C,
    ground_truth_system: &str,
    max_pairs: Option<usize>,
) -> EvaluationRun
where
    C: DamageClassifier + ?Sized,
{
    let mut run = EvaluationRun::default();
    for paths in pairs.iter().take(max_pairs.unwrap_or(usize::MAX)) {
        match evaluate_pair(paths, classifier, ground_truth_system) {
            Ok(Some(record)) => {
                log::info!("{}: {}", record.image_name, record.vlm_prediction);
                run.records.push(record);
            }
            Ok(None) => run.skipped.push(paths.pair_id.clone()),
            Err(e) => {
                log::warn!("{}: {e}", paths.pair_id);
                run.errors.push((paths.pair_id.clone(), e));
            }
        }
    }
    run
}

fn evaluate_pair<C>(
    paths: &ImagePairPaths,
    classifier: &C,
    ground_truth_system: &str,
) -> Result<Option<EvaluationRecord>, PairError>
where
    C: DamageClassifier + ?Sized,
{
    let doc = load_label_document(&paths.post_label)?;
    let Some(ground_truth) = majority_ground_truth(&doc, ground_truth_system) else {
        return Ok(None);
    };
    let read = |path: &PathBuf| {
        fs::read(path).map_err(|e| PairError::Image {
            path: path.clone(),
            source: e,
        })
    };
    let pre = read(&paths.pre_image)?;
    let post = read(&paths.post_image)?;
    let raw = classifier.assess(&pre, &post)?;
    let prediction = normalize_prediction(&raw);
    if prediction.is_empty() {
        return Err(ClassifierError::EmptyResponse.into());
    }
    let image_name = paths
        .post_image
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| paths.pair_id.clone());
    Ok(Some(EvaluationRecord {
        image_name,
        vlm_prediction: prediction,
        ground_truth: ground_truth.as_str().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_contracts::label::{FeatureProperties, FeatureRecord};

    fn doc(subtypes: &[&str]) -> LabelDocument {
        let records = subtypes
            .iter()
            .enumerate()
            .map(|(i, s)| FeatureRecord {
                wkt: "POLYGON ((0 0, 1 1))".into(),
                properties: FeatureProperties {
                    uid: format!("u{i}"),
                    feature_type: "building".into(),
                    subtype: Some(s.to_string()),
                },
            })
            .collect();
        let mut doc = LabelDocument::default();
        doc.features.insert("lng_lat".into(), records);
        doc
    }

    #[test]
    fn majority_picks_most_common() {
        let d = doc(&["destroyed", "no-damage", "destroyed", "minor-damage"]);
        assert_eq!(majority_ground_truth(&d, "lng_lat"), Some(DamageLevel::Destroyed));
    }

    #[test]
    fn majority_tie_uses_vocabulary_order() {
        let d = doc(&["destroyed", "minor-damage", "destroyed", "minor-damage"]);
        assert_eq!(majority_ground_truth(&d, "lng_lat"), Some(DamageLevel::MinorDamage));
    }

    #[test]
    fn majority_none_without_features() {
        assert_eq!(majority_ground_truth(&doc(&[]), "lng_lat"), None);
        assert_eq!(majority_ground_truth(&doc(&["no-damage"]), "xy"), None);
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_prediction("  Major-Damage\n"), "major-damage");
    }
}
