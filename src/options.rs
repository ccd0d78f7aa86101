use serde::Deserialize;

use crate::model::{CalculationMode, ElevationMode, TransportationMode};

/// Options for GPX import.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    /// Which GPX element types to convert (default: all)
    #[serde(default)]
    pub types: Option<Vec<GpxElementType>>,
}

impl ImportSettings {
    pub fn should_include(&self, element_type: GpxElementType) -> bool {
        match &self.types {
            None => true,
            Some(types) => types.contains(&element_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpxElementType {
    Waypoint,
    Route,
    Track,
}

/// Options for GPX export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    /// Share of route coordinates emitted as via points, in percent.
    /// Unset or <= 0 keeps only the first point of each segment and the
    /// route's final point.
    #[serde(default)]
    pub waypoints_percent: Option<f64>,

    /// Also write each route as a synthesized track (default: false)
    #[serde(default)]
    pub export_route_as_track: bool,

    /// Mirror every emitted via point as a plain waypoint (default: false)
    #[serde(default)]
    pub export_route_waypoints: bool,

    /// Symbol of mirrored route waypoints (default: "Flag, Blue")
    #[serde(default = "default_route_waypoint_symbol")]
    pub route_waypoint_symbol: String,

    /// Used when a route carries no transportation mode of its own
    #[serde(default = "default_transportation_mode")]
    pub transportation_mode: TransportationMode,

    /// Used for via points without a calculation mode; `Direct` also
    /// suppresses the trip extension
    #[serde(default = "default_calculation_mode")]
    pub calculation_mode: CalculationMode,

    #[serde(default = "default_elevation_mode")]
    pub elevation_mode: ElevationMode,

    /// Document metadata overrides
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            waypoints_percent: None,
            export_route_as_track: false,
            export_route_waypoints: false,
            route_waypoint_symbol: default_route_waypoint_symbol(),
            transportation_mode: default_transportation_mode(),
            calculation_mode: default_calculation_mode(),
            elevation_mode: default_elevation_mode(),
            author: None,
            description: None,
            name: None,
        }
    }
}

impl ExportSettings {
    /// Via point stride for the configured percentage; `None` means only
    /// the mandatory points are emitted.
    pub fn waypoint_stride(&self) -> Option<usize> {
        match self.waypoints_percent {
            Some(percent) if percent > 0.0 => Some(((100.0 / percent) as usize).max(1)),
            _ => None,
        }
    }
}

fn default_route_waypoint_symbol() -> String {
    "Flag, Blue".to_string()
}

fn default_transportation_mode() -> TransportationMode {
    TransportationMode::Automotive
}

fn default_calculation_mode() -> CalculationMode {
    CalculationMode::FasterTime
}

fn default_elevation_mode() -> ElevationMode {
    ElevationMode::Standard
}
