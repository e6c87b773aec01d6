//! Breakdowns and regression checks built on top of the metrics.

use crate::metrics::MetricsReport;
use crate::{EvalError, EvalResult};
use data_contracts::evaluation::EvaluationRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Disaster name from an image name: everything before the first `_00`.
pub fn disaster_name(image_name: &str) -> &str {
    image_name.split("_00").next().unwrap_or(image_name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterAccuracy {
    pub disaster: String,
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
}

/// Accuracy per disaster, sorted by disaster name.
pub fn disaster_breakdown(records: &[EvaluationRecord]) -> Vec<DisasterAccuracy> {
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for r in records {
        let entry = groups.entry(disaster_name(&r.image_name)).or_default();
        entry.1 += 1;
        if r.is_correct() {
            entry.0 += 1;
        }
    }
    groups
        .into_iter()
        .map(|(disaster, (correct, total))| DisasterAccuracy {
            disaster: disaster.to_string(),
            correct,
            total,
            accuracy: correct as f64 / total as f64,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub ground_truth: String,
    pub predicted: String,
    pub count: usize,
}

/// The `n` most frequent `(ground truth, prediction)` mistakes.
/// Equal counts keep first-seen order.
pub fn top_error_patterns(records: &[EvaluationRecord], n: usize) -> Vec<ErrorPattern> {
    let mut patterns: Vec<ErrorPattern> = Vec::new();
    for r in records.iter().filter(|r| !r.is_correct()) {
        match patterns
            .iter_mut()
            .find(|p| p.ground_truth == r.ground_truth && p.predicted == r.vlm_prediction)
        {
            Some(p) => p.count += 1,
            None => patterns.push(ErrorPattern {
                ground_truth: r.ground_truth.clone(),
                predicted: r.vlm_prediction.clone(),
                count: 1,
            }),
        }
    }
    patterns.sort_by(|a, b| b.count.cmp(&a.count));
    patterns.truncate(n);
    patterns
}

/// Stored reference metrics for regression checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub accuracy: f64,
    pub macro_f1: f64,
    pub created_at_unix: f64,
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

impl Baseline {
    pub fn from_metrics(report: &MetricsReport, created_at_unix: f64) -> Self {
        Self {
            accuracy: round4(report.accuracy),
            macro_f1: round4(report.macro_f1),
            created_at_unix,
        }
    }

    /// `Ok(None)` when no baseline has been stored yet.
    pub fn load(path: &Path) -> EvalResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read(path).map_err(|source| EvalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| EvalError::Json {
                path: path.to_path_buf(),
                line: 1,
                source,
            })
    }

    pub fn save(&self, path: &Path) -> EvalResult<()> {
        let io_err = |source| EvalError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|source| EvalError::Json {
            path: path.to_path_buf(),
            line: 1,
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionThresholds {
    pub max_accuracy_drop: f64,
    pub max_macro_f1_drop: f64,
}

impl Default for RegressionThresholds {
    fn default() -> Self {
        Self {
            max_accuracy_drop: 0.02,
            max_macro_f1_drop: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegressionVerdict {
    AccuracyDrop(f64),
    MacroF1Drop(f64),
    Stable,
}

impl RegressionVerdict {
    pub fn is_regression(&self) -> bool {
        !matches!(self, RegressionVerdict::Stable)
    }
}

/// Accuracy is checked first; a macro-F1 drop is only reported when accuracy held.
pub fn check_regression(
    baseline: &Baseline,
    current: &MetricsReport,
    thresholds: &RegressionThresholds,
) -> RegressionVerdict {
    let acc_drop = baseline.accuracy - current.accuracy;
    let f1_drop = baseline.macro_f1 - current.macro_f1;
    if acc_drop > thresholds.max_accuracy_drop {
        RegressionVerdict::AccuracyDrop(acc_drop)
    } else if f1_drop > thresholds.max_macro_f1_drop {
        RegressionVerdict::MacroF1Drop(f1_drop)
    } else {
        RegressionVerdict::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disaster_name_splits_at_first_id_marker() {
        assert_eq!(
            disaster_name("hurricane-michael_00000239_post_disaster.png"),
            "hurricane-michael"
        );
        assert_eq!(disaster_name("no-marker.png"), "no-marker.png");
    }

    #[test]
    fn round4_rounds_half_away() {
        assert_eq!(round4(0.123_456), 0.1235);
        assert_eq!(round4(0.5), 0.5);
    }
}
