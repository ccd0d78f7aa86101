//! GeoJSON representation of the feature model.
//!
//! Every feature carries a `featureType` property naming its variant. Track
//! elevations travel as the third ordinate of each position and track times
//! as `coordinateProperties.times`; a route's via points are nested
//! features under `routePoints`.

use chrono::{DateTime, Utc};
use geojson::feature::Id;
use geojson::{FeatureCollection, Geometry as GeoJsonGeometry, Value};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::convert::{carry_forward, FeatureError, ImportOutcome, DEFAULT_ELEVATION, DEFAULT_TIME};
use crate::error::{CodecError, Result};
use crate::extensions::format_time;
use crate::geometry::{
    rect_to_bbox, Coord, CoordExt, Geometry, LineString, MultiLineString, Point,
};
use crate::model::{
    Feature, FeatureKind, FeatureProperties, RoutePoint, RoutePointProperties, RouteProperties,
    Track, TrackProperties, WaypointProperties,
};

pub const FEATURE_TYPE: &str = "featureType";
const ROUTE_POINTS: &str = "routePoints";
const COORDINATE_PROPERTIES: &str = "coordinateProperties";
const MARKDOWN_DESCRIPTION: &str = "markdownDescription";

/// Convert features to a GeoJSON FeatureCollection.
pub fn to_feature_collection(features: &[Feature]) -> Result<FeatureCollection> {
    let features = features
        .iter()
        .map(to_geojson_feature)
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

pub fn to_geojson_feature(feature: &Feature) -> Result<geojson::Feature> {
    let (geometry, mut props) = match feature {
        Feature::Waypoint(w) => {
            let mut props = properties_map(&w.properties)?;
            if let Some(markdown) = w.properties.markdown_description() {
                props.insert(MARKDOWN_DESCRIPTION.to_string(), JsonValue::String(markdown));
            }
            (point_value(&w.geometry, w.properties.elevation), props)
        }
        Feature::RoutePoint(p) => (
            point_value(&p.geometry, p.properties.elevation),
            properties_map(&p.properties)?,
        ),
        Feature::Track(t) => track_parts(t)?,
        Feature::Route(r) => {
            let mut props = properties_map(&r.properties)?;
            let route_points = r
                .properties
                .route_points
                .iter()
                .map(|p| {
                    let nested = to_geojson_feature(&Feature::RoutePoint(p.clone()))?;
                    Ok(serde_json::to_value(nested)?)
                })
                .collect::<Result<Vec<_>>>()?;
            props.insert(ROUTE_POINTS.to_string(), JsonValue::Array(route_points));
            (multi_line_value(&r.geometry, None), props)
        }
    };

    props.insert(
        FEATURE_TYPE.to_string(),
        JsonValue::String(feature.kind().as_str().to_string()),
    );

    Ok(geojson::Feature {
        bbox: feature.bbox().map(|rect| rect_to_bbox(rect).to_vec()),
        geometry: Some(GeoJsonGeometry::new(geometry)),
        id: feature.id().map(|id| Id::String(id.to_string())),
        properties: Some(props),
        foreign_members: None,
    })
}

fn properties_map<T: Serialize>(props: &T) -> Result<Map<String, JsonValue>> {
    match serde_json::to_value(props)? {
        JsonValue::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Build [lon, lat] or [lon, lat, ele].
fn point_value(point: &Point, elevation: Option<f64>) -> Value {
    let mut position = point.0.to_position();
    if let Some(ele) = elevation.filter(|e| e.is_finite()) {
        position.push(ele);
    }
    Value::Point(position)
}

fn multi_line_value(lines: &MultiLineString, ele_lines: Option<&[Vec<f64>]>) -> Value {
    Value::MultiLineString(
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let eles = ele_lines.and_then(|e| e.get(i));
                line.coords()
                    .enumerate()
                    .map(|(j, c)| {
                        let mut position = c.to_position();
                        if let Some(ele) = eles.and_then(|e| e.get(j)) {
                            position.push(*ele);
                        }
                        position
                    })
                    .collect()
            })
            .collect(),
    )
}

fn track_parts(track: &Track) -> Result<(Value, Map<String, JsonValue>)> {
    let props = track.properties();
    let mut map = properties_map(props)?;
    map.remove("eleLines");
    map.remove("timeLines");

    let times: Vec<JsonValue> = props
        .time_lines
        .iter()
        .map(|line| {
            JsonValue::Array(
                line.iter()
                    .map(|t| JsonValue::String(format_time(t)))
                    .collect(),
            )
        })
        .collect();
    let mut coord_props = Map::new();
    coord_props.insert("times".to_string(), JsonValue::Array(times));
    map.insert(
        COORDINATE_PROPERTIES.to_string(),
        JsonValue::Object(coord_props),
    );

    Ok((multi_line_value(track.geometry(), Some(&props.ele_lines)), map))
}

/// Parse a GeoJSON FeatureCollection; features that fail are reported
/// alongside the ones that convert.
pub fn from_feature_collection(fc: &FeatureCollection) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    for (index, f) in fc.features.iter().enumerate() {
        match from_geojson_feature(f) {
            Ok(feature) => outcome.features.push(feature),
            Err(error) => {
                tracing::warn!("Skipping GeoJSON feature #{}: {}", index, error);
                outcome.errors.push(FeatureError {
                    kind: feature_kind(f.properties.as_ref()).ok(),
                    index,
                    error,
                });
            }
        }
    }
    outcome
}

fn feature_kind(props: Option<&Map<String, JsonValue>>) -> Result<FeatureKind> {
    let name = props
        .and_then(|p| p.get(FEATURE_TYPE))
        .and_then(JsonValue::as_str);
    name.and_then(FeatureKind::from_name).ok_or_else(|| {
        CodecError::UnsupportedFeature(format!("unknown {FEATURE_TYPE} {name:?}"))
    })
}

pub fn from_geojson_feature(f: &geojson::Feature) -> Result<Feature> {
    let kind = feature_kind(f.properties.as_ref())?;
    let mut props = f.properties.clone().unwrap_or_default();
    props.remove(FEATURE_TYPE);
    props.remove(MARKDOWN_DESCRIPTION);

    let value = f
        .geometry
        .as_ref()
        .map(|g| &g.value)
        .ok_or(CodecError::MissingPosition)?;
    let geometry = geometry_from_value(value)?;

    let properties = match kind {
        FeatureKind::Waypoint => {
            FeatureProperties::Waypoint(from_map::<WaypointProperties>(props)?)
        }
        FeatureKind::RoutePoint => {
            FeatureProperties::RoutePoint(from_map::<RoutePointProperties>(props)?)
        }
        FeatureKind::Track => {
            let times = props.remove(COORDINATE_PROPERTIES);
            let mut track = from_map::<TrackProperties>(props)?;
            track.ele_lines = elevation_lines(value);
            track.time_lines = time_lines(times.as_ref(), &geometry);
            FeatureProperties::Track(track)
        }
        FeatureKind::Route => {
            let nested = props.remove(ROUTE_POINTS);
            let mut route = from_map::<RouteProperties>(props)?;
            route.route_points = route_points(nested)?;
            FeatureProperties::Route(route)
        }
    };

    let id = f.id.as_ref().map(|id| match id {
        Id::String(s) => s.clone(),
        Id::Number(n) => n.to_string(),
    });

    Feature::from_parts(id, geometry, properties)
}

fn from_map<T: serde::de::DeserializeOwned>(props: Map<String, JsonValue>) -> Result<T> {
    Ok(serde_json::from_value(JsonValue::Object(props))?)
}

fn geometry_from_value(value: &Value) -> Result<Geometry> {
    let line = |positions: &[Vec<f64>]| -> Result<LineString> {
        positions
            .iter()
            .map(|p| Coord::from_position(p).ok_or(CodecError::MissingPosition))
            .collect::<Result<Vec<_>>>()
            .map(LineString::new)
    };

    match value {
        Value::Point(p) => Coord::from_position(p)
            .map(|c| Geometry::Point(Point(c)))
            .ok_or(CodecError::MissingPosition),
        Value::LineString(positions) => Ok(Geometry::LineString(line(positions)?)),
        Value::MultiLineString(lines) => Ok(Geometry::MultiLineString(MultiLineString::new(
            lines
                .iter()
                .map(|l| line(l))
                .collect::<Result<Vec<_>>>()?,
        ))),
        Value::MultiPoint(_) => Err(unsupported_geometry("MultiPoint")),
        Value::Polygon(_) => Err(unsupported_geometry("Polygon")),
        Value::MultiPolygon(_) => Err(unsupported_geometry("MultiPolygon")),
        Value::GeometryCollection(_) => Err(unsupported_geometry("GeometryCollection")),
    }
}

fn unsupported_geometry(name: &str) -> CodecError {
    CodecError::UnsupportedFeature(format!("{name} geometry"))
}

/// Third ordinates of each line, carried forward where missing.
fn elevation_lines(value: &Value) -> Vec<Vec<f64>> {
    match value {
        Value::MultiLineString(lines) => lines
            .iter()
            .map(|line| {
                let eles: Vec<Option<f64>> = line.iter().map(|p| p.get(2).copied()).collect();
                carry_forward(&eles, DEFAULT_ELEVATION)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `coordinateProperties.times`, or default times when absent. A present
/// but misaligned array is kept as is so the track rejects it.
fn time_lines(coord_props: Option<&JsonValue>, geometry: &Geometry) -> Vec<Vec<DateTime<Utc>>> {
    let times = coord_props
        .and_then(|c| c.get("times"))
        .and_then(JsonValue::as_array);

    match (times, geometry) {
        (Some(lines), _) => lines
            .iter()
            .map(|line| {
                let values: Vec<Option<DateTime<Utc>>> = line
                    .as_array()
                    .map(|ts| ts.iter().map(parse_json_time).collect())
                    .unwrap_or_default();
                carry_forward(&values, DEFAULT_TIME)
            })
            .collect(),
        (None, Geometry::MultiLineString(lines)) => lines
            .iter()
            .map(|l| vec![DEFAULT_TIME; l.0.len()])
            .collect(),
        (None, _) => Vec::new(),
    }
}

fn parse_json_time(value: &JsonValue) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

fn route_points(nested: Option<JsonValue>) -> Result<Vec<RoutePoint>> {
    let Some(JsonValue::Array(items)) = nested else {
        return Ok(Vec::new());
    };
    items
        .into_iter()
        .map(|item| {
            let f: geojson::Feature = serde_json::from_value(item)?;
            match from_geojson_feature(&f)? {
                Feature::RoutePoint(p) => Ok(p),
                other => Err(CodecError::UnsupportedFeature(format!(
                    "{} inside {ROUTE_POINTS}",
                    other.kind()
                ))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{import_document, ImportOutcome};
    use crate::model::DisplayColor;
    use crate::options::ImportSettings;
    use crate::parser::parse_gpx;

    fn import(xml: &str) -> Vec<Feature> {
        let doc = parse_gpx(xml).unwrap();
        let ImportOutcome { features, errors } = import_document(&doc, &ImportSettings::default());
        assert!(errors.is_empty());
        features
    }

    #[test]
    fn test_waypoint_conversion() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.6762" lon="139.6503">
    <ele>40.5</ele>
    <name>Tokyo</name>
  </wpt>
</gpx>"#;
        let fc = to_feature_collection(&import(xml)).unwrap();

        assert_eq!(fc.features.len(), 1);
        let f = &fc.features[0];
        let geom = f.geometry.as_ref().unwrap();

        // Check [lon, lat, ele] order
        if let Value::Point(coords) = &geom.value {
            assert!((coords[0] - 139.6503).abs() < 1e-10); // lon
            assert!((coords[1] - 35.6762).abs() < 1e-10); // lat
            assert!((coords[2] - 40.5).abs() < 1e-10); // ele
        } else {
            panic!("Expected Point geometry");
        }

        let props = f.properties.as_ref().unwrap();
        assert_eq!(props["featureType"], "waypoint");
        assert_eq!(props["name"], "Tokyo");
        assert_eq!(props["elevation"], 40.5);
        assert_eq!(f.bbox, Some(vec![139.6503, 35.6762, 139.6503, 35.6762]));
    }

    #[test]
    fn test_track_with_times() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <name>Run</name>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"><time>2025-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="35.001" lon="139.001"><time>2025-01-01T00:01:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let fc = to_feature_collection(&import(xml)).unwrap();

        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["featureType"], "track");
        assert_eq!(props["name"], "Run");
        assert_eq!(props["color"], "DARK_GRAY");
        assert!(props.get("timeLines").is_none());

        let coord_props = props["coordinateProperties"].as_object().unwrap();
        let times = coord_props["times"].as_array().unwrap();
        assert_eq!(times.len(), 1);
        assert_eq!(times[0][0], "2025-01-01T00:00:00Z");
        assert_eq!(times[0][1], "2025-01-01T00:01:00Z");
    }

    #[test]
    fn test_multi_segment_track() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"><ele>10</ele></trkpt>
      <trkpt lat="35.001" lon="139.001"/>
    </trkseg>
    <trkseg>
      <trkpt lat="36.0" lon="140.0"/>
      <trkpt lat="36.001" lon="140.001"/>
    </trkseg>
  </trk>
</gpx>"#;
        let fc = to_feature_collection(&import(xml)).unwrap();

        assert_eq!(fc.features.len(), 1);
        let geom = fc.features[0].geometry.as_ref().unwrap();
        match &geom.value {
            Value::MultiLineString(lines) => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[0][1], vec![139.001, 35.001, 10.0]);
                assert_eq!(lines[1][0], vec![140.0, 36.0, 0.0]);
            }
            _ => panic!("Expected MultiLineString"),
        }
    }

    #[test]
    fn test_route_with_nested_points() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <rte>
    <name>Errand</name>
    <rtept lat="35.0" lon="139.0"><name>Home</name></rtept>
    <rtept lat="36.0" lon="140.0"><name>Shop</name></rtept>
  </rte>
</gpx>"#;
        let features = import(xml);
        let fc = to_feature_collection(&features).unwrap();
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["featureType"], "route");
        assert_eq!(props["color"], "MAGENTA");
        let nested = props["routePoints"].as_array().unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[1]["properties"]["name"], "Shop");
        assert_eq!(nested[1]["properties"]["featureType"], "routePoint");

        let back = from_feature_collection(&fc);
        assert!(back.errors.is_empty());
        assert_eq!(back.features, features);
    }

    #[test]
    fn test_features_round_trip_through_json() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.0" lon="139.0"><name>A</name><desc>d</desc><cmt>c</cmt></wpt>
  <trk>
    <extensions>
      <gpxx:TrackExtension xmlns:gpxx="http://www.garmin.com/xmlschemas/GpxExtensions/v3">
        <gpxx:DisplayColor>Blue</gpxx:DisplayColor>
      </gpxx:TrackExtension>
    </extensions>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"><ele>1.5</ele><time>2025-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="35.1" lon="139.1"><ele>2.5</ele><time>2025-01-01T00:00:01.500Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let features = import(xml);
        let json = serde_json::to_string(&to_feature_collection(&features).unwrap()).unwrap();
        let fc: FeatureCollection = json.parse::<geojson::GeoJson>().unwrap().try_into().unwrap();
        let back = from_feature_collection(&fc);
        assert!(back.errors.is_empty());
        assert_eq!(back.features, features);
        match &back.features[1] {
            Feature::Track(t) => assert_eq!(t.properties().color, DisplayColor::Blue),
            other => panic!("Expected track, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_geometry_mismatch_rejected() {
        let f = geojson::Feature {
            bbox: None,
            geometry: Some(GeoJsonGeometry::new(Value::Point(vec![139.0, 35.0]))),
            id: None,
            properties: Some(
                serde_json::json!({"featureType": "route"})
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
            foreign_members: None,
        };
        assert!(matches!(
            from_geojson_feature(&f),
            Err(CodecError::GeometryMismatch {
                kind: FeatureKind::Route,
                ..
            })
        ));
    }

    #[test]
    fn test_line_string_is_not_coerced() {
        let f = geojson::Feature {
            bbox: None,
            geometry: Some(GeoJsonGeometry::new(Value::LineString(vec![
                vec![139.0, 35.0],
                vec![139.1, 35.1],
            ]))),
            id: Some(Id::String("t1".to_string())),
            properties: Some(
                serde_json::json!({"featureType": "track"})
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
            foreign_members: None,
        };
        let fc = FeatureCollection {
            bbox: None,
            features: vec![f],
            foreign_members: None,
        };
        let outcome = from_feature_collection(&fc);
        assert!(outcome.features.is_empty());
        assert_eq!(outcome.errors[0].kind, Some(FeatureKind::Track));
    }

    #[test]
    fn test_misaligned_times_rejected() {
        let f = geojson::Feature {
            bbox: None,
            geometry: Some(GeoJsonGeometry::new(Value::MultiLineString(vec![vec![
                vec![139.0, 35.0],
                vec![139.1, 35.1],
            ]]))),
            id: None,
            properties: Some(
                serde_json::json!({
                    "featureType": "track",
                    "coordinateProperties": {"times": [["2025-01-01T00:00:00Z"]]}
                })
                .as_object()
                .unwrap()
                .clone(),
            ),
            foreign_members: None,
        };
        assert!(matches!(
            from_geojson_feature(&f),
            Err(CodecError::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_unknown_feature_type() {
        let f = geojson::Feature {
            bbox: None,
            geometry: Some(GeoJsonGeometry::new(Value::Point(vec![139.0, 35.0]))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        assert!(matches!(
            from_geojson_feature(&f),
            Err(CodecError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_empty_collection() {
        let fc = to_feature_collection(&[]).unwrap();
        assert!(fc.features.is_empty());
    }
}
