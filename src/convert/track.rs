use chrono::{DateTime, Utc};

use super::waypoint::{links_from_gpx, links_to_gpx, merge_description, split_description};
use crate::error::{CodecError, Result};
use crate::extensions::{Extensions, TrackExtension};
use crate::geometry::{Coord, CoordExt, LineString, MultiLineString};
use crate::gpx_types::{GpxPoint, GpxSegment, GpxTrack};
use crate::model::{non_blank, DisplayColor, FeatureKind, Track, TrackProperties};

/// Elevation used when a segment carries none at all.
pub const DEFAULT_ELEVATION: f64 = 0.0;

/// Time used when a segment carries none at all.
pub const DEFAULT_TIME: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

pub fn track_to_gpx(track: &Track) -> GpxTrack {
    let props = track.properties();
    let (desc, cmt) = split_description(props.description.as_deref());

    let segments = track
        .geometry()
        .iter()
        .zip(&props.ele_lines)
        .zip(&props.time_lines)
        .map(|((line, eles), times)| GpxSegment {
            points: line
                .coords()
                .zip(eles)
                .zip(times)
                .map(|((c, ele), time)| GpxPoint {
                    ele: Some(*ele),
                    time: Some(*time),
                    ..GpxPoint::new(c.lat(), c.lon())
                })
                .collect(),
        })
        .collect();

    GpxTrack {
        name: non_blank(props.name.as_deref()),
        desc,
        cmt,
        links: links_to_gpx(&props.links),
        extensions: Extensions::new().attach(TrackExtension {
            display_color: Some(props.color.garmin_name().to_string()),
        }),
        segments,
        ..Default::default()
    }
}

/// Convert a wire track. Segments with fewer than two points are dropped;
/// `None` when no segment survives.
pub fn gpx_to_track(gpx: &GpxTrack) -> Result<Option<Track>> {
    let mut lines = Vec::new();
    let mut ele_lines = Vec::new();
    let mut time_lines = Vec::new();

    for (index, segment) in gpx.segments.iter().enumerate() {
        if segment.points.len() < 2 {
            tracing::debug!(
                "Dropping track segment {} with {} point(s)",
                index,
                segment.points.len()
            );
            continue;
        }

        let coords = segment
            .points
            .iter()
            .map(|p| {
                let c = Coord::from_lat_lon(p.lat, p.lon);
                c.is_finite().then_some(c).ok_or(CodecError::MissingPosition)
            })
            .collect::<Result<Vec<_>>>()?;

        let eles: Vec<Option<f64>> = segment
            .points
            .iter()
            .map(|p| p.ele.filter(|e| e.is_finite()))
            .collect();
        let times: Vec<Option<DateTime<Utc>>> = segment.points.iter().map(|p| p.time).collect();

        lines.push(LineString::new(coords));
        ele_lines.push(carry_forward(&eles, DEFAULT_ELEVATION));
        time_lines.push(carry_forward(&times, DEFAULT_TIME));
    }

    if lines.is_empty() {
        tracing::debug!("Dropping track {:?} without a usable segment", gpx.name);
        return Ok(None);
    }

    let color = DisplayColor::from_garmin(
        gpx.extensions
            .find_first::<TrackExtension>()
            .and_then(|ext| ext.display_color.as_deref()),
        DisplayColor::default_for(FeatureKind::Track),
    );

    let props = TrackProperties {
        name: non_blank(gpx.name.as_deref()),
        description: merge_description(gpx.desc.as_deref(), gpx.cmt.as_deref()),
        links: links_from_gpx(&gpx.links),
        ele_lines,
        time_lines,
        color,
    };

    Track::new(MultiLineString::new(lines), props).map(Some)
}

/// Fill gaps with the last value seen. Leading gaps take the first value
/// present anywhere in the sequence, or `default` if there is none.
pub fn carry_forward<T: Copy>(values: &[Option<T>], default: T) -> Vec<T> {
    let mut last = values.iter().flatten().next().copied().unwrap_or(default);
    values
        .iter()
        .map(|value| {
            if let Some(v) = value {
                last = *v;
            }
            last
        })
        .collect()
}
