//! Route ⇄ `<rte>` conversion.
//!
//! On the wire a route is a flat list of via points, each optionally
//! followed by auto-route shape points stored in its `RoutePointExtension`.
//! In the model, geometry segment `k` runs from via point `k` to via point
//! `k + 1` through those shape points.

use super::waypoint::{
    gpx_point_at, links_from_gpx, links_to_gpx, merge_description, point_position, point_time,
    split_description,
};
use crate::error::{CodecError, Result};
use crate::extensions::{
    format_xsd_duration, parse_xsd_duration, Extensions, RouteExtension, RoutePointExtension,
    Schema, TripExtension, ViaPointExtension, WaypointExtension, DISPLAY_MODE_SYMBOL_AND_NAME,
};
use crate::geometry::{Coord, CoordExt, LineString, MultiLineString, Point};
use crate::gpx_types::{GpxPoint, GpxRoute};
use crate::model::{
    non_blank, CalculationHints, CalculationMode, DisplayColor, ElevationMode, FeatureKind, Route,
    RoutePoint, RoutePointProperties, RouteProperties, TransportationMode,
};
use crate::options::ExportSettings;

/// A route on the wire, plus the plain waypoints mirroring its via points.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedRoute {
    pub route: GpxRoute,
    pub waypoints: Vec<GpxPoint>,
}

/// Convert a wire route. `None` when fewer than two via points remain.
pub fn gpx_to_route(gpx: &GpxRoute) -> Result<Option<Route>> {
    let transportation_mode = gpx
        .extensions
        .find_first::<TripExtension>()
        .and_then(|trip| trip.transportation_mode.as_deref())
        .and_then(TransportationMode::from_wire);

    let mut route_points = Vec::with_capacity(gpx.points.len());
    let mut legs: Vec<Vec<Coord>> = Vec::with_capacity(gpx.points.len());

    for point in &gpx.points {
        let route_point = gpx_to_route_point(point, transportation_mode.as_ref())?;

        let mut leg = vec![route_point.geometry.0];
        if let Some(ext) = point.extensions.find_first::<RoutePointExtension>() {
            for shape in ext.shape_points.iter().filter(|c| c.is_finite()) {
                if leg.last().is_some_and(|last| last.equals_2d(shape)) {
                    continue;
                }
                leg.push(*shape);
            }
        }

        legs.push(leg);
        route_points.push(route_point);
    }

    if route_points.len() < 2 {
        tracing::debug!(
            "Dropping route {:?} with {} via point(s)",
            gpx.name,
            route_points.len()
        );
        return Ok(None);
    }

    let lines = legs
        .iter()
        .zip(&route_points[1..])
        .map(|(leg, next)| {
            let mut coords = leg.clone();
            let end = next.geometry.0;
            if !coords.last().is_some_and(|last| last.equals_2d(&end)) {
                coords.push(end);
            }
            LineString::new(coords)
        })
        .collect();

    let color = DisplayColor::from_garmin(
        gpx.extensions
            .find_first::<RouteExtension>()
            .and_then(|ext| ext.display_color.as_deref()),
        DisplayColor::default_for(FeatureKind::Route),
    );

    let props = RouteProperties {
        name: non_blank(gpx.name.as_deref()),
        description: merge_description(gpx.desc.as_deref(), gpx.cmt.as_deref()),
        links: links_from_gpx(&gpx.links),
        route_points,
        color,
        transportation_mode,
    };

    Ok(Some(Route::new(MultiLineString::new(lines), props)))
}

/// Convert one `<rtept>` into a via point. The route's transportation mode
/// applies to every leg.
pub fn gpx_to_route_point(
    point: &GpxPoint,
    transportation_mode: Option<&TransportationMode>,
) -> Result<RoutePoint> {
    let geometry = point_position(point)?;
    let calculation = point
        .extensions
        .find_first::<ViaPointExtension>()
        .map(|via| CalculationHints {
            arrival_time: via.arrival_time,
            departure_time: via.departure_time,
            calculation_mode: via
                .calculation_mode
                .as_deref()
                .and_then(CalculationMode::from_wire),
            elevation_mode: via.elevation_mode.as_deref().and_then(ElevationMode::from_wire),
            named_road: non_blank(via.named_road.as_deref()),
            stop_duration_ms: via.stop_duration.as_deref().and_then(|d| {
                let millis = parse_xsd_duration(d);
                if millis.is_none() {
                    tracing::warn!("Ignoring unparsable stop duration '{}'", d);
                }
                millis
            }),
            transportation_mode: None,
        })
        .unwrap_or_default();

    let props = RoutePointProperties {
        name: non_blank(point.name.as_deref()),
        elevation: point.ele.filter(|e| e.is_finite()),
        time: point_time(point),
        calculation: CalculationHints {
            transportation_mode: transportation_mode.cloned(),
            ..calculation
        },
    };

    Ok(RoutePoint::new(geometry, props))
}

/// A standalone route point written as a plain waypoint.
pub fn route_point_to_gpx(route_point: &RoutePoint) -> Result<GpxPoint> {
    let props = &route_point.properties;
    Ok(GpxPoint {
        name: non_blank(props.name.as_deref()),
        ele: props.elevation.filter(|e| e.is_finite()),
        time: props.time,
        ..gpx_point_at(&route_point.geometry)?
    })
}

/// `"<RouteName> WPT(<seg>_<idx>)"` with both numbers zero-padded.
pub fn via_point_name(
    route_name: Option<&str>,
    segment: usize,
    segment_count: usize,
    index: usize,
    point_count: usize,
) -> String {
    let label = format!(
        "WPT({:0sw$}_{:0iw$})",
        segment,
        index,
        sw = digits(segment_count),
        iw = digits(point_count)
    );
    match non_blank(route_name) {
        Some(name) => format!("{name} {label}"),
        None => label,
    }
}

fn digits(n: usize) -> usize {
    n.max(1).to_string().len()
}

/// A via point being assembled; shape points are collected until the next
/// via point is emitted.
struct PendingVia {
    point: GpxPoint,
    shape_points: Vec<Coord>,
}

pub fn route_to_gpx(route: &Route, settings: &ExportSettings) -> Result<ExportedRoute> {
    let lines = &route.geometry.0;
    if lines.is_empty() {
        return Err(CodecError::DataIntegrity("route has no segments".to_string()));
    }
    // each segment must run from one via point to the next
    if let Some(segment) = lines.iter().position(|line| line.0.len() < 2) {
        return Err(CodecError::DataIntegrity(format!(
            "route segment {segment} has {} coordinate(s)",
            lines[segment].0.len()
        )));
    }

    let props = &route.properties;
    let stride = settings.waypoint_stride();
    let segment_count = lines.len();
    let mut vias: Vec<PendingVia> = Vec::new();

    for (segment, line) in lines.iter().enumerate() {
        let last_segment = segment + 1 == segment_count;
        let n = line.0.len();

        for (index, coord) in line.coords().enumerate() {
            let is_end = index + 1 == n;
            let emit = if is_end {
                last_segment
            } else {
                index == 0 || stride.is_some_and(|step| index % step == 0)
            };

            if emit {
                let source = if index == 0 {
                    props.route_points.get(segment)
                } else if is_end {
                    props.route_points.last()
                } else {
                    None
                };
                let name = via_point_name(props.name.as_deref(), segment, segment_count, index, n);
                vias.push(PendingVia {
                    point: via_point(coord, name, source, settings)?,
                    shape_points: Vec::new(),
                });
            } else if !is_end {
                // the end of an inner segment is the next segment's start
                if let Some(via) = vias.last_mut() {
                    via.shape_points.push(*coord);
                }
            }
        }
    }

    let waypoints = if settings.export_route_waypoints {
        vias.iter()
            .map(|via| mirrored_waypoint(&via.point, settings))
            .collect()
    } else {
        Vec::new()
    };

    let points = vias
        .into_iter()
        .map(|via| {
            let mut point = via.point;
            if !via.shape_points.is_empty() {
                point.extensions.push(RoutePointExtension {
                    subclass: None,
                    shape_points: via.shape_points,
                });
            }
            point
        })
        .collect();

    let mut extensions = Extensions::new().attach(RouteExtension {
        is_auto_named: false,
        display_color: Some(props.color.garmin_name().to_string()),
    });
    if !settings.calculation_mode.is_direct() {
        let mode = props
            .transportation_mode
            .as_ref()
            .unwrap_or(&settings.transportation_mode);
        extensions.push(TripExtension {
            transportation_mode: Some(mode.as_wire().to_string()),
        });
    }

    let (desc, cmt) = split_description(props.description.as_deref());
    let gpx = GpxRoute {
        name: non_blank(props.name.as_deref()),
        desc,
        cmt,
        links: links_to_gpx(&props.links),
        extensions,
        points,
        ..Default::default()
    };

    Ok(ExportedRoute {
        route: gpx,
        waypoints,
    })
}

fn via_point(
    coord: &Coord,
    name: String,
    source: Option<&RoutePoint>,
    settings: &ExportSettings,
) -> Result<GpxPoint> {
    let mut point = gpx_point_at(&Point(*coord))?;
    point.name = Some(name);

    let hints = source.map(|p| &p.properties.calculation);
    if let Some(p) = source {
        point.ele = p.properties.elevation.filter(|e| e.is_finite());
        point.time = p.properties.time;
    }

    let calculation_mode = hints
        .and_then(|h| h.calculation_mode.as_ref())
        .unwrap_or(&settings.calculation_mode);
    let elevation_mode = hints
        .and_then(|h| h.elevation_mode.as_ref())
        .unwrap_or(&settings.elevation_mode);

    point.extensions.push(ViaPointExtension {
        arrival_time: hints.and_then(|h| h.arrival_time),
        departure_time: hints.and_then(|h| h.departure_time),
        stop_duration: hints
            .and_then(|h| h.stop_duration_ms)
            .map(format_xsd_duration),
        calculation_mode: Some(calculation_mode.as_wire().to_string()),
        elevation_mode: Some(elevation_mode.as_wire().to_string()),
        named_road: hints.and_then(|h| h.named_road.clone()),
    });

    Ok(point)
}

fn mirrored_waypoint(via: &GpxPoint, settings: &ExportSettings) -> GpxPoint {
    GpxPoint {
        name: via.name.clone(),
        sym: non_blank(Some(settings.route_waypoint_symbol.as_str())),
        extensions: Extensions::new().attach(WaypointExtension {
            display_mode: Some(DISPLAY_MODE_SYMBOL_AND_NAME.to_string()),
            ..WaypointExtension::new(Schema::GpxxV3)
        }),
        ..GpxPoint::new(via.lat, via.lon)
    }
}
