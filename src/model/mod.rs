//! In-memory feature model.
//!
//! A [`Feature`] is a closed union of the four feature variants. Each variant
//! owns the only geometry shape it accepts, so a route can never hold a point
//! and a waypoint can never hold a line. Untyped geometry coming from outside
//! goes through [`Feature::from_parts`] or [`Feature::set_geometry`], which
//! reject shapes the variant cannot hold.

mod color;
mod route;
mod track;
mod values;
mod waypoint;

pub use color::DisplayColor;
pub use route::{CalculationHints, Route, RoutePoint, RoutePointProperties, RouteProperties};
pub use track::{Track, TrackProperties};
pub use values::{
    clean_links, clean_phone_numbers, non_blank, Address, CalculationMode, ElevationMode, Link,
    PhoneNumber, TransportationMode,
};
pub use waypoint::{Waypoint, WaypointProperties, DESCRIPTION_SEPARATOR};

use geo::BoundingRect;

use crate::error::{CodecError, Result};
use crate::geometry::{Geometry, GeometryType, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Waypoint,
    RoutePoint,
    Track,
    Route,
}

impl FeatureKind {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Waypoint | Self::RoutePoint => GeometryType::Point,
            Self::Track | Self::Route => GeometryType::MultiLineString,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waypoint => "waypoint",
            Self::RoutePoint => "routePoint",
            Self::Track => "track",
            Self::Route => "route",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "waypoint" => Some(Self::Waypoint),
            "routePoint" => Some(Self::RoutePoint),
            "track" => Some(Self::Track),
            "route" => Some(Self::Route),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Waypoint(Waypoint),
    RoutePoint(RoutePoint),
    Track(Track),
    Route(Route),
}

/// Properties for [`Feature::from_parts`], one shape per variant.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureProperties {
    Waypoint(WaypointProperties),
    RoutePoint(RoutePointProperties),
    Track(TrackProperties),
    Route(RouteProperties),
}

impl FeatureProperties {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::Waypoint(_) => FeatureKind::Waypoint,
            Self::RoutePoint(_) => FeatureKind::RoutePoint,
            Self::Track(_) => FeatureKind::Track,
            Self::Route(_) => FeatureKind::Route,
        }
    }
}

impl Feature {
    /// Assemble a feature from untyped geometry, checking that the geometry
    /// shape matches what the properties' variant requires.
    pub fn from_parts(
        id: Option<String>,
        geometry: Geometry,
        properties: FeatureProperties,
    ) -> Result<Self> {
        let kind = properties.kind();
        let feature = match (properties, geometry) {
            (FeatureProperties::Waypoint(props), Geometry::Point(point)) => {
                Self::Waypoint(Waypoint::new(point, props))
            }
            (FeatureProperties::RoutePoint(props), Geometry::Point(point)) => {
                Self::RoutePoint(RoutePoint::new(point, props))
            }
            (FeatureProperties::Track(props), Geometry::MultiLineString(lines)) => {
                Self::Track(Track::new(lines, props)?)
            }
            (FeatureProperties::Route(props), Geometry::MultiLineString(lines)) => {
                Self::Route(Route::new(lines, props))
            }
            (_, other) => return Err(mismatch(kind, &other)),
        };
        Ok(feature.with_id(id))
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::Waypoint(_) => FeatureKind::Waypoint,
            Self::RoutePoint(_) => FeatureKind::RoutePoint,
            Self::Track(_) => FeatureKind::Track,
            Self::Route(_) => FeatureKind::Route,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Waypoint(w) => w.id.as_deref(),
            Self::RoutePoint(p) => p.id.as_deref(),
            Self::Track(t) => t.id.as_deref(),
            Self::Route(r) => r.id.as_deref(),
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        match &mut self {
            Self::Waypoint(w) => w.id = id,
            Self::RoutePoint(p) => p.id = id,
            Self::Track(t) => t.id = id,
            Self::Route(r) => r.id = id,
        }
        self
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Waypoint(w) => w.properties.name.as_deref(),
            Self::RoutePoint(p) => p.properties.name.as_deref(),
            Self::Track(t) => t.properties().name.as_deref(),
            Self::Route(r) => r.properties.name.as_deref(),
        }
    }

    pub fn geometry(&self) -> Geometry {
        match self {
            Self::Waypoint(w) => Geometry::Point(w.geometry),
            Self::RoutePoint(p) => Geometry::Point(p.geometry),
            Self::Track(t) => Geometry::MultiLineString(t.geometry().clone()),
            Self::Route(r) => Geometry::MultiLineString(r.geometry.clone()),
        }
    }

    /// Stored bounding box; route points carry none and use their position.
    pub fn bbox(&self) -> Option<Rect> {
        match self {
            Self::Waypoint(w) => w.bbox,
            Self::RoutePoint(p) => Some(p.geometry.bounding_rect()),
            Self::Track(t) => t.bbox,
            Self::Route(r) => r.bbox,
        }
    }

    /// Replace the geometry. Track geometry cannot be swapped alone since its
    /// elevation and time lines must follow; use [`Track::set_geometry`].
    pub fn set_geometry(&mut self, geometry: Geometry) -> Result<()> {
        let kind = self.kind();
        match (self, geometry) {
            (Self::Waypoint(w), Geometry::Point(point)) => {
                w.bbox = Some(point.bounding_rect());
                w.geometry = point;
            }
            (Self::RoutePoint(p), Geometry::Point(point)) => p.geometry = point,
            (Self::Route(r), Geometry::MultiLineString(lines)) => {
                r.bbox = lines.bounding_rect();
                r.geometry = lines;
            }
            (Self::Track(t), Geometry::MultiLineString(lines)) => {
                if lines != *t.geometry() {
                    return Err(CodecError::DataIntegrity(
                        "track geometry must be replaced together with its elevation and time lines"
                            .to_string(),
                    ));
                }
            }
            (_, other) => return Err(mismatch(kind, &other)),
        }
        Ok(())
    }
}

fn mismatch(kind: FeatureKind, actual: &Geometry) -> CodecError {
    CodecError::GeometryMismatch {
        kind,
        expected: kind.geometry_type(),
        actual: actual.geometry_type(),
    }
}

impl From<Waypoint> for Feature {
    fn from(w: Waypoint) -> Self {
        Self::Waypoint(w)
    }
}

impl From<Track> for Feature {
    fn from(t: Track) -> Self {
        Self::Track(t)
    }
}

impl From<Route> for Feature {
    fn from(r: Route) -> Self {
        Self::Route(r)
    }
}

impl From<RoutePoint> for Feature {
    fn from(p: RoutePoint) -> Self {
        Self::RoutePoint(p)
    }
}
