//! Derive a track from a route that has none.

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::geometry::{planar_length, step_length, Coord};
use crate::model::{Route, Track, TrackProperties};

/// Appended to the route name to name the derived track.
pub const SYNTHESIZED_TRACK_SUFFIX: &str = " (trk)";

/// Roughly 50 km/h, in degrees per second at the equator.
pub const FALLBACK_LENGTH_PER_SECOND: f64 = 50_000.0 / 3600.0 / 111_320.0;

/// Synthesize a track following `route`, timestamped from `start`.
///
/// Elevations are zero. Times advance with the planar distance between
/// consecutive coordinates at the route's average speed.
pub fn route_to_track(route: &Route, start: DateTime<Utc>) -> Result<Track> {
    let length_per_second = length_per_second(route);

    let mut clock = start;
    let mut previous: Option<Coord> = None;
    let mut time_lines = Vec::with_capacity(route.geometry.0.len());
    let mut ele_lines = Vec::with_capacity(route.geometry.0.len());

    for line in route.geometry.iter() {
        let mut times = Vec::with_capacity(line.0.len());
        for coord in line.coords() {
            if let Some(prev) = previous {
                let seconds = step_length(prev, *coord) / length_per_second;
                clock += Duration::milliseconds((seconds * 1000.0).round() as i64);
            }
            times.push(clock);
            previous = Some(*coord);
        }
        ele_lines.push(vec![0.0; line.0.len()]);
        time_lines.push(times);
    }

    let props = &route.properties;
    let properties = TrackProperties {
        name: props
            .name
            .as_ref()
            .map(|name| format!("{name}{SYNTHESIZED_TRACK_SUFFIX}")),
        description: props.description.clone(),
        links: props.links.clone(),
        ele_lines,
        time_lines,
        color: props.color,
    };

    Track::new(route.geometry.clone(), properties)
}

/// [`route_to_track`] starting at the current time.
pub fn route_to_track_now(route: &Route) -> Result<Track> {
    route_to_track(route, Utc::now())
}

fn length_per_second(route: &Route) -> f64 {
    let length = planar_length(&route.geometry);
    route
        .travel_time_seconds()
        .filter(|seconds| *seconds > 0.0)
        .map(|seconds| length / seconds)
        .filter(|lps| lps.is_finite() && *lps > 0.0)
        .unwrap_or(FALLBACK_LENGTH_PER_SECOND)
}
