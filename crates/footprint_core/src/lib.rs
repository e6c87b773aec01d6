//! footprint_core: polygon geometry parsing, bounding-box reduction, and processed features.

pub mod bbox;
pub mod error;
pub mod feature;
pub mod polygon;

pub use bbox::{BoundingBox, CropRect, Extent, PixelPoint};
pub use error::{GeometryError, GeometryResult};
pub use feature::ProcessedFeature;
pub use polygon::{Polygon, Vertex};

pub mod prelude {
    pub use crate::bbox::*;
    pub use crate::error::*;
    pub use crate::feature::*;
    pub use crate::polygon::*;
}
