//! Planar geometry for the feature model, on top of `geo`.
//!
//! Coordinates are WGS84 decimal degrees stored as `x = lon`, `y = lat`,
//! matching GeoJSON position order.

use geo::{Euclidean, Length, Line};

pub use geo::{Coord, LineString, MultiLineString, Point, Rect};

/// Coordinates are compared after rounding to this many degrees.
const COORD_PRECISION: f64 = 1e-9;

/// Lat/lon access and the codec's coordinate equality.
pub trait CoordExt: Sized {
    fn from_lat_lon(lat: f64, lon: f64) -> Self;
    fn lat(&self) -> f64;
    fn lon(&self) -> f64;
    fn is_finite(&self) -> bool;
    /// Equality on x/y after normalization. Elevation plays no part.
    fn equals_2d(&self, other: &Self) -> bool;
    /// Build `[lon, lat]`.
    fn to_position(&self) -> Vec<f64>;
    /// Read `[lon, lat, ...]`; extra ordinates are ignored.
    fn from_position(position: &[f64]) -> Option<Self>;
}

impl CoordExt for Coord {
    fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Coord { x: lon, y: lat }
    }

    fn lat(&self) -> f64 {
        self.y
    }

    fn lon(&self) -> f64 {
        self.x
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn equals_2d(&self, other: &Self) -> bool {
        normalize(self.x) == normalize(other.x) && normalize(self.y) == normalize(other.y)
    }

    fn to_position(&self) -> Vec<f64> {
        vec![self.x, self.y]
    }

    fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [x, y, ..] => Some(Coord { x: *x, y: *y }),
            _ => None,
        }
    }
}

fn normalize(v: f64) -> f64 {
    let rounded = (v / COORD_PRECISION).round() * COORD_PRECISION;
    // collapse -0.0 so it compares equal to 0.0 bitwise too
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Planar length of a single step.
pub fn step_length(from: Coord, to: Coord) -> f64 {
    Euclidean.length(&Line::new(from, to))
}

/// Sum of the planar lengths of every line.
pub fn planar_length(lines: &MultiLineString) -> f64 {
    lines.iter().map(|line| Euclidean.length(line)).sum()
}

/// `[min_x, min_y, max_x, max_y]`, the GeoJSON bbox order.
pub fn rect_to_bbox(rect: Rect) -> [f64; 4] {
    [rect.min().x, rect.min().y, rect.max().x, rect.max().y]
}

/// The shapes a feature geometry can take.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    MultiLineString(MultiLineString),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::LineString(_) => GeometryType::LineString,
            Self::MultiLineString(_) => GeometryType::MultiLineString,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Point,
    LineString,
    MultiLineString,
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
        })
    }
}
