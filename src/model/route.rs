use chrono::{DateTime, Utc};
use geo::BoundingRect;
use serde::{Deserialize, Serialize};

use super::color::DisplayColor;
use super::values::{CalculationMode, ElevationMode, Link, TransportationMode};
use super::FeatureKind;
use crate::geometry::{MultiLineString, Point, Rect};

/// A planned route through an ordered list of via points.
///
/// Geometry segment `k` is the path from route point `k` to route point
/// `k + 1`, including any shape points in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: Option<String>,
    pub geometry: MultiLineString,
    pub bbox: Option<Rect>,
    pub properties: RouteProperties,
}

impl Route {
    pub fn new(geometry: MultiLineString, properties: RouteProperties) -> Self {
        Self {
            id: None,
            bbox: geometry.bounding_rect(),
            geometry,
            properties,
        }
    }

    /// Seconds between leaving the first via point and reaching the last,
    /// or `None` when the route points carry no usable times.
    pub fn travel_time_seconds(&self) -> Option<f64> {
        let points = &self.properties.route_points;
        let first = points.first()?;
        let last = points.last()?;
        let start = first
            .properties
            .calculation
            .departure_time
            .or(first.properties.calculation.arrival_time)
            .or(first.properties.time)?;
        let end = last
            .properties
            .calculation
            .arrival_time
            .or(last.properties.calculation.departure_time)
            .or(last.properties.time)?;
        let millis = (end - start).num_milliseconds();
        (millis > 0).then(|| millis as f64 / 1000.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(skip)]
    pub route_points: Vec<RoutePoint>,
    pub color: DisplayColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transportation_mode: Option<TransportationMode>,
}

impl Default for RouteProperties {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            links: Vec::new(),
            route_points: Vec::new(),
            color: DisplayColor::default_for(FeatureKind::Route),
            transportation_mode: None,
        }
    }
}

/// A via point of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePoint {
    pub id: Option<String>,
    pub geometry: Point,
    pub properties: RoutePointProperties,
}

impl RoutePoint {
    pub fn new(geometry: Point, properties: RoutePointProperties) -> Self {
        Self {
            id: None,
            geometry,
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePointProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub calculation: CalculationHints,
}

/// Per-via-point hints for the device that recalculates the route.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_mode: Option<CalculationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_mode: Option<ElevationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_road: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transportation_mode: Option<TransportationMode>,
}

impl CalculationHints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
