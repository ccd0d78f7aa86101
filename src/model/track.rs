use chrono::{DateTime, Utc};
use geo::BoundingRect;
use serde::{Deserialize, Serialize};

use super::color::DisplayColor;
use super::values::Link;
use super::FeatureKind;
use crate::error::{CodecError, Result};
use crate::geometry::{MultiLineString, Rect};

/// A recorded track: one elevation line and one time line per geometry
/// segment, index-aligned with that segment's coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: Option<String>,
    pub bbox: Option<Rect>,
    geometry: MultiLineString,
    properties: TrackProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default)]
    pub ele_lines: Vec<Vec<f64>>,
    #[serde(default)]
    pub time_lines: Vec<Vec<DateTime<Utc>>>,
    pub color: DisplayColor,
}

impl Default for TrackProperties {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            links: Vec::new(),
            ele_lines: Vec::new(),
            time_lines: Vec::new(),
            color: DisplayColor::default_for(FeatureKind::Track),
        }
    }
}

impl Track {
    /// Build a track, rejecting elevation/time lines that do not line up
    /// with the geometry.
    pub fn new(geometry: MultiLineString, properties: TrackProperties) -> Result<Self> {
        check_parallel_lines(&geometry, &properties)?;
        Ok(Self {
            id: None,
            bbox: geometry.bounding_rect(),
            geometry,
            properties,
        })
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    pub fn geometry(&self) -> &MultiLineString {
        &self.geometry
    }

    pub fn properties(&self) -> &TrackProperties {
        &self.properties
    }

    /// Replace the geometry together with matching elevation/time lines.
    pub fn set_geometry(
        &mut self,
        geometry: MultiLineString,
        ele_lines: Vec<Vec<f64>>,
        time_lines: Vec<Vec<DateTime<Utc>>>,
    ) -> Result<()> {
        let properties = TrackProperties {
            ele_lines,
            time_lines,
            ..self.properties.clone()
        };
        check_parallel_lines(&geometry, &properties)?;
        self.bbox = geometry.bounding_rect();
        self.geometry = geometry;
        self.properties = properties;
        Ok(())
    }

    /// First timestamp of the first segment.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.properties.time_lines.first()?.first().copied()
    }

    /// Last timestamp of the last segment.
    pub fn stop_time(&self) -> Option<DateTime<Utc>> {
        self.properties.time_lines.last()?.last().copied()
    }
}

fn check_parallel_lines(geometry: &MultiLineString, props: &TrackProperties) -> Result<()> {
    let segments = geometry.0.len();
    if props.ele_lines.len() != segments || props.time_lines.len() != segments {
        return Err(CodecError::DataIntegrity(format!(
            "track has {segments} segments but {} elevation lines and {} time lines",
            props.ele_lines.len(),
            props.time_lines.len()
        )));
    }

    for (i, ((line, eles), times)) in geometry
        .iter()
        .zip(&props.ele_lines)
        .zip(&props.time_lines)
        .enumerate()
    {
        let n = line.0.len();
        if eles.len() != n || times.len() != n {
            return Err(CodecError::DataIntegrity(format!(
                "segment {i} has {} coordinates, {} elevations and {} times",
                n,
                eles.len(),
                times.len()
            )));
        }
    }

    Ok(())
}
