//! Converters between the feature model and the GPX wire model.

mod document;
mod route;
mod synth;
mod track;
mod waypoint;

pub use document::{
    export_features, export_features_at, import_document, ExportOutcome, FeatureError,
    ImportOutcome,
};
pub use route::{
    gpx_to_route, gpx_to_route_point, route_point_to_gpx, route_to_gpx, via_point_name,
    ExportedRoute,
};
pub use synth::{
    route_to_track, route_to_track_now, FALLBACK_LENGTH_PER_SECOND, SYNTHESIZED_TRACK_SUFFIX,
};
pub use track::{carry_forward, gpx_to_track, track_to_gpx, DEFAULT_ELEVATION, DEFAULT_TIME};
pub use waypoint::{gpx_to_waypoint, merge_description, split_description, waypoint_to_gpx};
