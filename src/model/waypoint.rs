use chrono::{DateTime, Utc};
use geo::BoundingRect;
use serde::{Deserialize, Serialize};

use super::values::{Address, Link, PhoneNumber};
use crate::geometry::{Point, Rect};

/// Separator between the two wire description fields inside the merged text.
pub const DESCRIPTION_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub id: Option<String>,
    pub geometry: Point,
    pub bbox: Option<Rect>,
    pub properties: WaypointProperties,
}

impl Waypoint {
    pub fn new(geometry: Point, properties: WaypointProperties) -> Self {
        Self {
            id: None,
            bbox: Some(geometry.bounding_rect()),
            geometry,
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Plain text; two wire fields are merged with [`DESCRIPTION_SEPARATOR`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    /// Meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl WaypointProperties {
    /// Markdown rendering of the description and links.
    ///
    /// The description separator becomes a thematic break, remaining line
    /// breaks become hard breaks, and each link is listed on its own line.
    pub fn markdown_description(&self) -> Option<String> {
        let mut blocks: Vec<String> = Vec::new();

        if let Some(text) = self.description.as_deref().filter(|t| !t.trim().is_empty()) {
            let parts: Vec<String> = text
                .split(DESCRIPTION_SEPARATOR)
                .map(|part| part.lines().collect::<Vec<_>>().join("  \n"))
                .collect();
            blocks.push(parts.join("\n\n---\n\n"));
        }

        let links: Vec<String> = self
            .links
            .iter()
            .map(|l| format!("[{}]({})", l.text.as_deref().unwrap_or(&l.href), l.href))
            .collect();
        if !links.is_empty() {
            blocks.push(links.join("  \n"));
        }

        (!blocks.is_empty()).then(|| blocks.join("\n\n"))
    }
}
