use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Coordinate system whose polygons are expressed in raster pixel space.
pub const PIXEL_COORDINATES: &str = "xy";
/// Coordinate system whose polygons are expressed in longitude/latitude.
pub const GEO_COORDINATES: &str = "lng_lat";

/// One annotated building/structure polygon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureRecord {
    /// Geometry as `POLYGON ((x y, ...))` text.
    pub wkt: String,
    pub properties: FeatureProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureProperties {
    pub uid: String,
    pub feature_type: String,
    /// Damage subtype; present on post-disaster labels only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LabelMetadata {
    #[serde(default)]
    pub img_name: Option<String>,
    #[serde(default)]
    pub disaster: Option<String>,
    #[serde(default)]
    pub disaster_type: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// A pre- or post-disaster label document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LabelDocument {
    /// Feature lists keyed by coordinate system name (`xy`, `lng_lat`).
    pub features: BTreeMap<String, Vec<FeatureRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<LabelMetadata>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("feature {index} in {system} has an empty uid")]
    EmptyUid { system: String, index: usize },
    #[error("feature {uid} in {system} has an empty feature_type")]
    EmptyFeatureType { system: String, uid: String },
    #[error("feature {index} in {system}: {field} {value:?} is not a plain name")]
    UnsafeName {
        system: String,
        index: usize,
        field: &'static str,
        value: String,
    },
    #[error("duplicate uid {uid} in {system}")]
    DuplicateUid { system: String, uid: String },
}

/// `uid` and `feature_type` end up in crop file names, so they must not
/// carry path separators or be a relative path component.
fn is_plain_name(value: &str) -> bool {
    !value.chars().any(|c| matches!(c, '/' | '\\' | '\0')) && value != "." && value != ".."
}

impl FeatureRecord {
    /// Checks that do not depend on sibling records.
    pub fn validate(&self, system: &str, index: usize) -> Result<(), ValidationError> {
        let props = &self.properties;
        if props.uid.trim().is_empty() {
            return Err(ValidationError::EmptyUid {
                system: system.to_string(),
                index,
            });
        }
        if props.feature_type.trim().is_empty() {
            return Err(ValidationError::EmptyFeatureType {
                system: system.to_string(),
                uid: props.uid.clone(),
            });
        }
        for (field, value) in [("uid", &props.uid), ("feature_type", &props.feature_type)] {
            if !is_plain_name(value) {
                return Err(ValidationError::UnsafeName {
                    system: system.to_string(),
                    index,
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

impl LabelDocument {
    pub fn features_in(&self, system: &str) -> Option<&[FeatureRecord]> {
        self.features.get(system).map(Vec::as_slice)
    }

    /// Records of `system` that fail validation, keyed by position.
    ///
    /// A repeated uid only rejects the later record; the first one stays valid.
    pub fn record_errors(&self, system: &str) -> BTreeMap<usize, ValidationError> {
        let Some(records) = self.features_in(system) else {
            return BTreeMap::new();
        };
        let mut seen = BTreeSet::new();
        let mut errors = BTreeMap::new();
        for (index, record) in records.iter().enumerate() {
            if let Err(e) = record.validate(system, index) {
                errors.insert(index, e);
            } else if !seen.insert(record.properties.uid.as_str()) {
                errors.insert(
                    index,
                    ValidationError::DuplicateUid {
                        system: system.to_string(),
                        uid: record.properties.uid.clone(),
                    },
                );
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names() {
        assert!(is_plain_name("9f1c-22ab"));
        assert!(is_plain_name("a..b"));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("x/../escaped"));
        assert!(!is_plain_name("c:\\tmp"));
    }
}
