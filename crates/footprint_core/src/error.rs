use crate::bbox::BoundingBox;
use thiserror::Error;

pub type GeometryResult<T> = Result<T, GeometryError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("malformed polygon geometry ({reason}): {text:?}")]
    MalformedGeometry { text: String, reason: &'static str },
    #[error("coordinate is not a finite number: {token:?}")]
    NumericParse { token: String },
    #[error("polygon has no vertices")]
    EmptyGeometry,
    #[error("bounding box {bbox} has zero width or height")]
    DegenerateBoundingBox { bbox: BoundingBox },
    #[error("bounding box {bbox} lies outside the {width}x{height} frame")]
    OutOfFrame {
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },
}
