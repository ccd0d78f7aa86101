use chrono::{DateTime, Utc};

use crate::extensions::Extensions;

/// A GPX document: metadata plus all waypoints, routes, and tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxDocument {
    pub creator: Option<String>,
    pub metadata: GpxMetadata,
    pub waypoints: Vec<GpxPoint>,
    pub routes: Vec<GpxRoute>,
    pub tracks: Vec<GpxTrack>,
}

/// The `<metadata>` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxMetadata {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub author: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub links: Vec<GpxLink>,
}

impl GpxMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A single GPX point (used for wpt, rtept, trkpt).
#[derive(Debug, Clone, PartialEq)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<GpxLink>,
    pub sym: Option<String>,
    pub point_type: Option<String>,
    pub extensions: Extensions,
}

impl GpxPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
            name: None,
            cmt: None,
            desc: None,
            src: None,
            links: Vec::new(),
            sym: None,
            point_type: None,
            extensions: Extensions::new(),
        }
    }
}

/// A GPX link element.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxLink {
    pub href: String,
    pub text: Option<String>,
    pub link_type: Option<String>,
}

/// A GPX route (<rte>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxRoute {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<GpxLink>,
    pub number: Option<u32>,
    pub route_type: Option<String>,
    pub extensions: Extensions,
    pub points: Vec<GpxPoint>,
}

/// A GPX track (<trk>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxTrack {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<GpxLink>,
    pub number: Option<u32>,
    pub track_type: Option<String>,
    pub extensions: Extensions,
    pub segments: Vec<GpxSegment>,
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxSegment {
    pub points: Vec<GpxPoint>,
}
