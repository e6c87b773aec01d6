//! Classification metrics over the four assessed damage classes.

use data_contracts::evaluation::{DamageLevel, EvaluationRecord};
use serde::{Deserialize, Serialize};

/// Drop unclassified ground truth and predictions outside the assessed vocabulary.
pub fn filter_scored(records: &[EvaluationRecord]) -> Vec<EvaluationRecord> {
    records
        .iter()
        .filter(|r| r.ground_truth != DamageLevel::Unclassified.as_str())
        .filter(|r| {
            r.vlm_prediction
                .parse::<DamageLevel>()
                .is_ok_and(|l| l.is_assessed())
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: DamageLevel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Rows are ground truth, columns are predictions, both in vocabulary order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 4]; 4],
}

impl ConfusionMatrix {
    pub fn get(&self, truth: DamageLevel, predicted: DamageLevel) -> usize {
        match (truth.index(), predicted.index()) {
            (Some(t), Some(p)) => self.counts[t][p],
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub samples: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub confusion: ConfusionMatrix,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl MetricsReport {
    /// Metrics over already-filtered records; undefined ratios are 0.
    pub fn compute(records: &[EvaluationRecord]) -> Self {
        let mut confusion = ConfusionMatrix::default();
        let mut predicted = [0usize; 4];
        let mut actual = [0usize; 4];
        let mut correct = 0;
        for r in records {
            if r.is_correct() {
                correct += 1;
            }
            let truth = r.ground_truth.parse::<DamageLevel>().ok().and_then(|l| l.index());
            let pred = r.vlm_prediction.parse::<DamageLevel>().ok().and_then(|l| l.index());
            if let Some(t) = truth {
                actual[t] += 1;
            }
            if let Some(p) = pred {
                predicted[p] += 1;
            }
            if let (Some(t), Some(p)) = (truth, pred) {
                confusion.counts[t][p] += 1;
            }
        }

        let classes: Vec<ClassMetrics> = DamageLevel::ALL_ASSESSED
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let tp = confusion.counts[i][i];
                let precision = ratio(tp, predicted[i]);
                let recall = ratio(tp, actual[i]);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support: actual[i],
                }
            })
            .collect();

        let n = classes.len() as f64;
        MetricsReport {
            samples: records.len(),
            correct,
            accuracy: ratio(correct, records.len()),
            macro_precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            macro_recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            macro_f1: classes.iter().map(|c| c.f1).sum::<f64>() / n,
            classes,
            confusion,
        }
    }

    pub fn support_total(&self) -> usize {
        self.classes.iter().map(|c| c.support).sum()
    }
}
