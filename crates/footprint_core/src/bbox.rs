//! Axis-aligned bounding boxes with outward integer rounding.

use crate::error::{GeometryError, GeometryResult};
use crate::polygon::Vertex;
use std::fmt;

/// Real-valued extent of a vertex set, before rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Running min/max seeded from the first vertex.
    pub fn from_vertices(vertices: &[Vertex]) -> GeometryResult<Self> {
        let (first, rest) = vertices.split_first().ok_or(GeometryError::EmptyGeometry)?;
        let seed = Extent {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Ok(rest.iter().fold(seed, |acc, v| Extent {
            min_x: acc.min_x.min(v.x),
            min_y: acc.min_y.min(v.y),
            max_x: acc.max_x.max(v.x),
            max_y: acc.max_y.max(v.y),
        }))
    }

    pub fn contains(&self, v: &Vertex) -> bool {
        v.x >= self.min_x && v.x <= self.max_x && v.y >= self.min_y && v.y <= self.max_y
    }
}

/// Integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i64,
    pub y: i64,
}

impl PixelPoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Smallest integer box containing a polygon: floor on minima, ceiling on maxima.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub min: PixelPoint,
    pub max: PixelPoint,
}

impl BoundingBox {
    pub fn new(min: PixelPoint, max: PixelPoint) -> Self {
        Self { min, max }
    }

    pub fn from_vertices(vertices: &[Vertex]) -> GeometryResult<Self> {
        Extent::from_vertices(vertices).map(Self::from_extent)
    }

    pub fn from_extent(extent: Extent) -> Self {
        Self {
            min: PixelPoint::new(extent.min_x.floor() as i64, extent.min_y.floor() as i64),
            max: PixelPoint::new(extent.max_x.ceil() as i64, extent.max_y.ceil() as i64),
        }
    }

    pub fn width(&self) -> u64 {
        self.max.x.abs_diff(self.min.x)
    }

    pub fn height(&self) -> u64 {
        self.max.y.abs_diff(self.min.y)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains_extent(&self, extent: &Extent) -> bool {
        self.min.x as f64 <= extent.min_x
            && self.min.y as f64 <= extent.min_y
            && self.max.x as f64 >= extent.max_x
            && self.max.y as f64 >= extent.max_y
    }

    /// Clamp to a `width` x `height` raster and return the region to cut.
    ///
    /// Degenerate boxes are rejected before clamping; a box with no area left
    /// inside the frame is out of frame.
    pub fn clamp_to_frame(&self, width: u32, height: u32) -> GeometryResult<CropRect> {
        if self.is_degenerate() {
            return Err(GeometryError::DegenerateBoundingBox { bbox: *self });
        }
        let x0 = self.min.x.clamp(0, width as i64);
        let y0 = self.min.y.clamp(0, height as i64);
        let x1 = self.max.x.clamp(0, width as i64);
        let y1 = self.max.y.clamp(0, height as i64);
        if x0 >= x1 || y0 >= y1 {
            return Err(GeometryError::OutOfFrame {
                bbox: *self,
                width,
                height,
            });
        }
        Ok(CropRect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(({}, {}), ({}, {}))",
            self.min.x, self.min.y, self.max.x, self.max.y
        )
    }
}

/// In-frame region of a raster, origin at the top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
