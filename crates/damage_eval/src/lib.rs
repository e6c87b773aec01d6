//! Evaluation of a damage classifier against labeled image pairs.

pub mod classifier;
pub mod command;
pub mod metrics;
pub mod report;
pub mod results;

use std::path::PathBuf;
use thiserror::Error;

pub use classifier::{
    evaluate_pairs, majority_ground_truth, normalize_prediction, ClassifierError,
    DamageClassifier, EvaluationRun, PairError, ASSESSMENT_PROMPT,
};
pub use command::CommandClassifier;
pub use metrics::{filter_scored, ClassMetrics, ConfusionMatrix, MetricsReport};
pub use report::{
    check_regression, disaster_breakdown, disaster_name, top_error_patterns, Baseline,
    DisasterAccuracy, ErrorPattern, RegressionThresholds, RegressionVerdict,
};
pub use results::{read_records, scored_records, write_records};

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path} line {line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
