//! `POLYGON ((x y, ...))` geometry text as stored by the labeling tool.

use crate::bbox::BoundingBox;
use crate::error::{GeometryError, GeometryResult};
use std::fmt;
use std::str::FromStr;

const PREFIX: &str = "POLYGON ((";
const SUFFIX: &str = "))";
const VERTEX_SEPARATOR: &str = ", ";

/// A point in raster pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Vertex {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Ordered ring of vertices. The closing vertex is kept as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vertex>,
}

impl Polygon {
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    pub fn parse(text: &str) -> GeometryResult<Self> {
        let inner = text
            .strip_prefix(PREFIX)
            .ok_or_else(|| malformed(text, "missing `POLYGON ((` prefix"))?
            .strip_suffix(SUFFIX)
            .ok_or_else(|| malformed(text, "missing `))` suffix"))?;
        if inner.is_empty() {
            return Ok(Self::default());
        }
        let vertices = inner
            .split(VERTEX_SEPARATOR)
            .map(|token| parse_vertex(text, token))
            .collect::<GeometryResult<Vec<_>>>()?;
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn bounding_box(&self) -> GeometryResult<BoundingBox> {
        BoundingBox::from_vertices(&self.vertices)
    }

    /// Serialize back to geometry text using shortest round-trip float formatting.
    pub fn to_wkt(&self) -> String {
        let body = self
            .vertices
            .iter()
            .map(|v| format!("{} {}", v.x, v.y))
            .collect::<Vec<_>>()
            .join(VERTEX_SEPARATOR);
        format!("{PREFIX}{body}{SUFFIX}")
    }
}

impl FromStr for Polygon {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wkt())
    }
}

fn parse_vertex(text: &str, token: &str) -> GeometryResult<Vertex> {
    let mut parts = token.split(' ');
    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed(text, "vertex is not exactly `x y`"));
    };
    Ok(Vertex::new(parse_coordinate(x)?, parse_coordinate(y)?))
}

fn parse_coordinate(token: &str) -> GeometryResult<f64> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeometryError::NumericParse {
            token: token.to_string(),
        })
}

fn malformed(text: &str, reason: &'static str) -> GeometryError {
    GeometryError::MalformedGeometry {
        text: text.to_string(),
        reason,
    }
}
