use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Damage severity vocabulary shared by labels and classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DamageLevel {
    NoDamage,
    MinorDamage,
    MajorDamage,
    Destroyed,
    #[serde(rename = "un-classified")]
    Unclassified,
}

impl DamageLevel {
    /// The four assessed classes, in vocabulary order.
    pub const ALL_ASSESSED: [DamageLevel; 4] = [
        DamageLevel::NoDamage,
        DamageLevel::MinorDamage,
        DamageLevel::MajorDamage,
        DamageLevel::Destroyed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DamageLevel::NoDamage => "no-damage",
            DamageLevel::MinorDamage => "minor-damage",
            DamageLevel::MajorDamage => "major-damage",
            DamageLevel::Destroyed => "destroyed",
            DamageLevel::Unclassified => "un-classified",
        }
    }

    pub fn is_assessed(&self) -> bool {
        !matches!(self, DamageLevel::Unclassified)
    }

    /// Position in `ALL_ASSESSED`, if assessed.
    pub fn index(&self) -> Option<usize> {
        Self::ALL_ASSESSED.iter().position(|l| l == self)
    }
}

impl fmt::Display for DamageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDamageLevel(pub String);

impl fmt::Display for UnknownDamageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown damage level: {}", self.0)
    }
}

impl std::error::Error for UnknownDamageLevel {}

impl FromStr for DamageLevel {
    type Err = UnknownDamageLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no-damage" => Ok(DamageLevel::NoDamage),
            "minor-damage" => Ok(DamageLevel::MinorDamage),
            "major-damage" => Ok(DamageLevel::MajorDamage),
            "destroyed" => Ok(DamageLevel::Destroyed),
            "un-classified" => Ok(DamageLevel::Unclassified),
            other => Err(UnknownDamageLevel(other.to_string())),
        }
    }
}

/// One row of the evaluation result table.
///
/// Labels are kept as raw strings: predictions come straight from the
/// classifier and may fall outside the vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationRecord {
    pub image_name: String,
    pub vlm_prediction: String,
    pub ground_truth: String,
}

impl EvaluationRecord {
    pub fn is_correct(&self) -> bool {
        self.vlm_prediction == self.ground_truth
    }
}

/// An evaluation row annotated with its correctness, as written to the per-sample table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: EvaluationRecord,
    pub correct: bool,
}

impl From<EvaluationRecord> for ScoredRecord {
    fn from(record: EvaluationRecord) -> Self {
        let correct = record.is_correct();
        Self { record, correct }
    }
}
