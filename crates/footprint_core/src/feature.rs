use crate::bbox::{BoundingBox, PixelPoint};
use crate::error::GeometryResult;
use crate::polygon::Polygon;
use data_contracts::label::FeatureRecord;

/// One annotated structure reduced to its bounding box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFeature {
    pub uid: String,
    pub feature_type: String,
    pub bbox: BoundingBox,
}

impl ProcessedFeature {
    pub fn new(uid: impl Into<String>, feature_type: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            uid: uid.into(),
            feature_type: feature_type.into(),
            bbox,
        }
    }

    /// Parse the record's geometry and reduce it to a box.
    pub fn from_record(record: &FeatureRecord) -> GeometryResult<Self> {
        let bbox = Polygon::parse(&record.wkt)?.bounding_box()?;
        Ok(Self::new(
            record.properties.uid.clone(),
            record.properties.feature_type.clone(),
            bbox,
        ))
    }

    pub fn min_corner(&self) -> PixelPoint {
        self.bbox.min
    }

    pub fn max_corner(&self) -> PixelPoint {
        self.bbox.max
    }
}
