//! Dataset summary and quality checks.

use crate::pairs::load_label_document;
use crate::types::{
    CropOptions, DatasetSummary, DisasterPhase, PairIndex, PairSummary, ValidationOutcome,
    ValidationReport, ValidationThresholds,
};
use footprint_core::ProcessedFeature;

/// One counted defect class and the limits it is held to.
struct DefectCheck<'a> {
    label: &'a str,
    count: usize,
    /// Population the ratio is taken over; clamped to at least 1.
    population: usize,
    max_count: Option<usize>,
    max_ratio: Option<f32>,
}

impl DefectCheck<'_> {
    fn ratio(&self) -> f32 {
        self.count as f32 / self.population.max(1) as f32
    }

    /// Limits exceeded fail the report; any nonzero count at least warns.
    fn apply(&self, report: &mut ValidationReport) {
        let exceeded_count = self.max_count.filter(|&max| self.count > max);
        let exceeded_ratio = self.max_ratio.filter(|&max| self.ratio() > max);
        if let Some(max) = exceeded_count {
            report
                .reasons
                .push(format!("{}: {} exceeds max {max}", self.label, self.count));
        }
        if let Some(max) = exceeded_ratio {
            report.reasons.push(format!(
                "{}: ratio {:.3} exceeds max {max:.3}",
                self.label,
                self.ratio()
            ));
        }
        if exceeded_count.is_some() || exceeded_ratio.is_some() {
            report.outcome = ValidationOutcome::Fail;
        } else if self.count > 0 {
            if report.outcome == ValidationOutcome::Pass {
                report.outcome = ValidationOutcome::Warn;
            }
            report
                .reasons
                .push(format!("{}: {} observed", self.label, self.count));
        }
    }
}

/// Read every label document of the index and count features, unreadable
/// documents, and features that would be rejected at crop time.
pub fn summarize_pairs(index: &PairIndex, opts: &CropOptions) -> DatasetSummary {
    let system = opts.coordinate_system.as_str();
    let mut pairs = Vec::with_capacity(index.pairs.len());
    for paths in &index.pairs {
        let mut summary = PairSummary {
            pair_id: paths.pair_id.clone(),
            ..Default::default()
        };
        for phase in DisasterPhase::BOTH {
            let doc = match load_label_document(paths.label(phase)) {
                Ok(doc) => doc,
                Err(e) => {
                    log::warn!("{}: {e}", paths.pair_id);
                    summary.invalid_documents += 1;
                    continue;
                }
            };
            let records = doc.features_in(system).unwrap_or_default();
            if records.is_empty() {
                summary.empty_documents += 1;
            }
            let invalid = doc.record_errors(system);
            summary.feature_failures += records
                .iter()
                .enumerate()
                .filter(|(i, r)| invalid.contains_key(i) || ProcessedFeature::from_record(r).is_err())
                .count();
            match phase {
                DisasterPhase::Pre => summary.pre_features = records.len(),
                DisasterPhase::Post => summary.post_features = records.len(),
            }
        }
        pairs.push(summary);
    }

    let mut totals = PairSummary::default();
    for pair in &pairs {
        totals.pre_features += pair.pre_features;
        totals.post_features += pair.post_features;
        totals.invalid_documents += pair.invalid_documents;
        totals.empty_documents += pair.empty_documents;
        totals.feature_failures += pair.feature_failures;
    }
    DatasetSummary {
        pairs,
        missing_pairs: index.missing.len(),
        totals,
    }
}

pub fn validate_summary(
    summary: DatasetSummary,
    thresholds: &ValidationThresholds,
) -> ValidationReport {
    let totals = &summary.totals;
    let documents = summary.pairs.len() * 2;
    let checks = [
        DefectCheck {
            label: "missing pairs",
            count: summary.missing_pairs,
            population: summary.pairs.len() + summary.missing_pairs,
            max_count: thresholds.max_missing,
            max_ratio: thresholds.max_missing_ratio,
        },
        DefectCheck {
            label: "invalid documents",
            count: totals.invalid_documents,
            population: documents,
            max_count: thresholds.max_invalid,
            max_ratio: thresholds.max_invalid_ratio,
        },
        DefectCheck {
            label: "empty documents",
            count: totals.empty_documents,
            population: documents,
            max_count: thresholds.max_empty,
            max_ratio: thresholds.max_empty_ratio,
        },
        DefectCheck {
            label: "feature failures",
            count: totals.feature_failures,
            population: totals.features(),
            max_count: thresholds.max_feature_failures,
            max_ratio: thresholds.max_feature_failure_ratio,
        },
    ];

    let mut report = ValidationReport {
        outcome: ValidationOutcome::Pass,
        reasons: Vec::new(),
        summary,
    };
    for check in &checks {
        check.apply(&mut report);
    }
    report
}

pub fn summarize_with_thresholds(
    index: &PairIndex,
    opts: &CropOptions,
    thresholds: &ValidationThresholds,
) -> ValidationReport {
    validate_summary(summarize_pairs(index, opts), thresholds)
}
