//! Whole-document import and export.
//!
//! A feature that fails to convert is reported and skipped; it never aborts
//! the rest of the document.

use chrono::{DateTime, Utc};

use super::route::{gpx_to_route, route_point_to_gpx, route_to_gpx};
use super::synth::route_to_track;
use super::track::{gpx_to_track, track_to_gpx};
use super::waypoint::{gpx_to_waypoint, waypoint_to_gpx};
use crate::error::CodecError;
use crate::gpx_types::{GpxDocument, GpxMetadata};
use crate::model::{non_blank, Feature, FeatureKind};
use crate::options::{ExportSettings, GpxElementType, ImportSettings};
use crate::writer::DEFAULT_CREATOR;

/// A feature that could not be converted.
#[derive(Debug)]
pub struct FeatureError {
    /// Kind of the failing feature, when it could be determined.
    pub kind: Option<FeatureKind>,
    /// Position of the feature among its siblings in the input.
    pub index: usize,
    pub error: CodecError,
}

impl std::fmt::Display for FeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{kind} #{}: {}", self.index, self.error),
            None => write!(f, "feature #{}: {}", self.index, self.error),
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub features: Vec<Feature>,
    pub errors: Vec<FeatureError>,
}

#[derive(Debug, Default)]
pub struct ExportOutcome {
    pub document: GpxDocument,
    pub errors: Vec<FeatureError>,
}

impl ImportOutcome {
    fn record(&mut self, kind: FeatureKind, index: usize, result: Result<Option<Feature>, CodecError>) {
        match result {
            Ok(Some(feature)) => self.features.push(feature),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!("Skipping {} #{}: {}", kind, index, error);
                self.errors.push(FeatureError {
                    kind: Some(kind),
                    index,
                    error,
                });
            }
        }
    }
}

/// Convert every waypoint, route and track of `doc`, in that order.
pub fn import_document(doc: &GpxDocument, settings: &ImportSettings) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();

    if settings.should_include(GpxElementType::Waypoint) {
        for (index, wpt) in doc.waypoints.iter().enumerate() {
            let result = gpx_to_waypoint(wpt).map(|w| Some(Feature::from(w)));
            outcome.record(FeatureKind::Waypoint, index, result);
        }
    }

    if settings.should_include(GpxElementType::Route) {
        for (index, rte) in doc.routes.iter().enumerate() {
            let result = gpx_to_route(rte).map(|r| r.map(Feature::from));
            outcome.record(FeatureKind::Route, index, result);
        }
    }

    if settings.should_include(GpxElementType::Track) {
        for (index, trk) in doc.tracks.iter().enumerate() {
            let result = gpx_to_track(trk).map(|t| t.map(Feature::from));
            outcome.record(FeatureKind::Track, index, result);
        }
    }

    tracing::debug!(
        "Imported {} feature(s), {} failure(s)",
        outcome.features.len(),
        outcome.errors.len()
    );
    outcome
}

/// Build a GPX document from `features`.
pub fn export_features(features: &[Feature], settings: &ExportSettings) -> ExportOutcome {
    export_features_at(features, settings, Utc::now())
}

/// Like [`export_features`], with synthesized tracks starting at `now`.
pub fn export_features_at(
    features: &[Feature],
    settings: &ExportSettings,
    now: DateTime<Utc>,
) -> ExportOutcome {
    let mut outcome = ExportOutcome {
        document: GpxDocument {
            creator: Some(DEFAULT_CREATOR.to_string()),
            metadata: GpxMetadata {
                name: non_blank(settings.name.as_deref()),
                desc: non_blank(settings.description.as_deref()),
                author: non_blank(settings.author.as_deref()),
                ..Default::default()
            },
            ..Default::default()
        },
        errors: Vec::new(),
    };

    let mut route_waypoints = Vec::new();
    let mut synthesized = Vec::new();
    let doc = &mut outcome.document;

    for (index, feature) in features.iter().enumerate() {
        let result: Result<(), CodecError> = match feature {
            Feature::Waypoint(w) => waypoint_to_gpx(w).map(|p| doc.waypoints.push(p)),
            Feature::RoutePoint(p) => route_point_to_gpx(p).map(|p| doc.waypoints.push(p)),
            Feature::Track(t) => {
                doc.tracks.push(track_to_gpx(t));
                Ok(())
            }
            Feature::Route(r) => route_to_gpx(r, settings).and_then(|exported| {
                if settings.export_route_as_track {
                    synthesized.push(track_to_gpx(&route_to_track(r, now)?));
                }
                doc.routes.push(exported.route);
                route_waypoints.extend(exported.waypoints);
                Ok(())
            }),
        };

        if let Err(error) = result {
            tracing::warn!("Skipping {} #{}: {}", feature.kind(), index, error);
            outcome.errors.push(FeatureError {
                kind: Some(feature.kind()),
                index,
                error,
            });
        }
    }

    let doc = &mut outcome.document;
    doc.waypoints.extend(route_waypoints);
    for track in synthesized {
        let exists = track.name.is_some() && doc.tracks.iter().any(|t| t.name == track.name);
        if exists {
            tracing::debug!("Track {:?} already exported, not synthesizing", track.name);
            continue;
        }
        doc.tracks.push(track);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Coord, LineString, MultiLineString, Point};
    use crate::gpx_types::{GpxPoint, GpxRoute, GpxSegment, GpxTrack};
    use crate::model::{
        Route, RouteProperties, Track, TrackProperties, Waypoint, WaypointProperties,
    };

    fn named_route(name: &str) -> Route {
        Route::new(
            MultiLineString::new(vec![LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 1.0, y: 1.0 },
            ])]),
            RouteProperties {
                name: Some(name.to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_import_isolates_failures() {
        let doc = GpxDocument {
            waypoints: vec![GpxPoint::new(f64::NAN, 0.0), GpxPoint::new(1.0, 2.0)],
            routes: vec![GpxRoute {
                points: vec![GpxPoint::new(1.0, 1.0)],
                ..Default::default()
            }],
            tracks: vec![GpxTrack {
                segments: vec![GpxSegment {
                    points: vec![GpxPoint::new(1.0, 1.0), GpxPoint::new(2.0, 2.0)],
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let outcome = import_document(&doc, &ImportSettings::default());
        let kinds: Vec<_> = outcome.features.iter().map(Feature::kind).collect();
        assert_eq!(kinds, vec![FeatureKind::Waypoint, FeatureKind::Track]);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, Some(FeatureKind::Waypoint));
        assert_eq!(outcome.errors[0].index, 0);
        assert!(matches!(outcome.errors[0].error, CodecError::MissingPosition));
    }

    #[test]
    fn test_import_type_filter() {
        let doc = GpxDocument {
            waypoints: vec![GpxPoint::new(1.0, 2.0)],
            ..Default::default()
        };
        let settings = ImportSettings {
            types: Some(vec![GpxElementType::Track]),
        };
        assert!(import_document(&doc, &settings).features.is_empty());
    }

    #[test]
    fn test_export_metadata_and_order() {
        let features = vec![
            Feature::from(named_route("Ride")),
            Feature::from(Waypoint::new(
                Point::new(5.0, 5.0),
                WaypointProperties {
                    name: Some("Cafe".to_string()),
                    ..Default::default()
                },
            )),
        ];
        let settings = ExportSettings {
            export_route_waypoints: true,
            name: Some("Weekend".to_string()),
            author: Some("  ".to_string()),
            ..Default::default()
        };
        let outcome = export_features(&features, &settings);
        let doc = &outcome.document;
        assert!(outcome.errors.is_empty());
        assert_eq!(doc.metadata.name.as_deref(), Some("Weekend"));
        assert_eq!(doc.metadata.author, None);
        let names: Vec<_> = doc.waypoints.iter().filter_map(|w| w.name.as_deref()).collect();
        assert_eq!(names, vec!["Cafe", "Ride WPT(0_0)", "Ride WPT(0_1)"]);
    }

    #[test]
    fn test_export_route_as_track() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let existing = Track::new(
            MultiLineString::new(vec![LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 1.0, y: 1.0 },
            ])]),
            TrackProperties {
                name: Some("Known (trk)".to_string()),
                ele_lines: vec![vec![0.0, 0.0]],
                time_lines: vec![vec![now, now]],
                ..Default::default()
            },
        )
        .unwrap();
        let features = vec![
            Feature::from(named_route("Fresh")),
            Feature::from(named_route("Known")),
            Feature::from(existing),
        ];
        let settings = ExportSettings {
            export_route_as_track: true,
            ..Default::default()
        };
        let outcome = export_features_at(&features, &settings, now);
        let names: Vec<_> = outcome
            .document
            .tracks
            .iter()
            .filter_map(|t| t.name.as_deref())
            .collect();
        assert_eq!(names, vec!["Known (trk)", "Fresh (trk)"]);
        let synthesized = &outcome.document.tracks[1];
        assert_eq!(synthesized.segments[0].points[0].time, Some(now));
    }

    #[test]
    fn test_export_isolates_failures() {
        let broken = Route::new(MultiLineString::new(vec![]), RouteProperties::default());
        let features = vec![Feature::from(broken), Feature::from(named_route("Ok"))];
        let outcome = export_features(&features, &ExportSettings::default());
        assert_eq!(outcome.document.routes.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, 0);
        assert_eq!(outcome.errors[0].kind, Some(FeatureKind::Route));
    }
}
