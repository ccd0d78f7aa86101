//! Typed Garmin extension blocks.
//!
//! Values stay close to the wire: colors and modes are kept as the raw
//! tokens and interpreted by the converters, which own the fallback policy.

use chrono::{DateTime, SecondsFormat, Utc};

use super::{Schema, XmlElement};
use crate::geometry::{Coord, CoordExt};
use crate::model::{Address, PhoneNumber};

/// Garmin display mode showing both the symbol and the name.
pub const DISPLAY_MODE_SYMBOL_AND_NAME: &str = "SymbolAndName";

fn parse_time(text: Option<&str>) -> Option<DateTime<Utc>> {
    let text = text?;
    match DateTime::parse_from_rfc3339(text) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Ignoring unparsable extension time '{}': {}", text, e);
            None
        }
    }
}

pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Address and phone block, shared by GPX extensions v3 and the legacy
/// waypoint extension v1. Both use the same element names.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointExtension {
    pub schema: Schema,
    pub display_mode: Option<String>,
    pub categories: Vec<String>,
    pub address: Option<Address>,
    pub phone_numbers: Vec<PhoneNumber>,
}

impl WaypointExtension {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            display_mode: None,
            categories: Vec::new(),
            address: None,
            phone_numbers: Vec::new(),
        }
    }

    pub(super) fn decode(el: &XmlElement, schema: Schema) -> Self {
        let address = el.child("Address").and_then(|a| {
            Address {
                street_address: a
                    .children_named("StreetAddress")
                    .map(|s| s.text.clone())
                    .collect(),
                city: a.child_text("City").map(str::to_string),
                state: a.child_text("State").map(str::to_string),
                country: a.child_text("Country").map(str::to_string),
                postal_code: a.child_text("PostalCode").map(str::to_string),
            }
            .cleaned()
        });

        let phone_numbers = el
            .children_named("PhoneNumber")
            .filter_map(|p| PhoneNumber::new(&p.text, p.attribute("Category")))
            .collect();

        let categories = el
            .child("Categories")
            .map(|c| {
                c.children_named("Category")
                    .map(|cat| cat.text.trim().to_string())
                    .filter(|cat| !cat.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            schema,
            display_mode: el.child_text("DisplayMode").map(str::to_string),
            categories,
            address,
            phone_numbers,
        }
    }

    pub(super) fn encode(&self) -> XmlElement {
        let mut root = XmlElement::in_schema(self.schema, "WaypointExtension");
        root.push_text_child("DisplayMode", self.display_mode.as_deref());

        if !self.categories.is_empty() {
            let mut categories = root.sibling_schema_child("Categories");
            for cat in &self.categories {
                categories.push_text_child("Category", Some(cat));
            }
            root.push_child(categories);
        }

        if let Some(address) = &self.address {
            let mut a = root.sibling_schema_child("Address");
            for street in &address.street_address {
                a.push_text_child("StreetAddress", Some(street));
            }
            a.push_text_child("City", address.city.as_deref());
            a.push_text_child("State", address.state.as_deref());
            a.push_text_child("Country", address.country.as_deref());
            a.push_text_child("PostalCode", address.postal_code.as_deref());
            root.push_child(a);
        }

        for phone in &self.phone_numbers {
            let mut p = root.sibling_schema_child("PhoneNumber").with_text(&phone.number);
            if let Some(category) = &phone.category {
                p = p.with_attribute("Category", category.as_str());
            }
            root.push_child(p);
        }

        root
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreationTimeExtension {
    pub creation_time: DateTime<Utc>,
}

impl CreationTimeExtension {
    pub(super) fn decode(el: &XmlElement) -> Option<Self> {
        parse_time(el.child_text("CreationTime")).map(|creation_time| Self { creation_time })
    }

    pub(super) fn encode(&self) -> XmlElement {
        let mut root = XmlElement::in_schema(Schema::CreationTimeV1, "CreationTimeExtension");
        root.push_text_child("CreationTime", Some(&format_time(&self.creation_time)));
        root
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteExtension {
    pub is_auto_named: bool,
    pub display_color: Option<String>,
}

impl RouteExtension {
    pub(super) fn decode(el: &XmlElement) -> Self {
        Self {
            is_auto_named: el
                .child_text("IsAutoNamed")
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            display_color: el.child_text("DisplayColor").map(str::to_string),
        }
    }

    pub(super) fn encode(&self) -> XmlElement {
        let mut root = XmlElement::in_schema(Schema::GpxxV3, "RouteExtension");
        root.push_text_child("IsAutoNamed", Some(if self.is_auto_named { "true" } else { "false" }));
        root.push_text_child("DisplayColor", self.display_color.as_deref());
        root
    }
}

/// Auto-route shape points following a via point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutePointExtension {
    pub subclass: Option<String>,
    pub shape_points: Vec<Coord>,
}

impl RoutePointExtension {
    pub(super) fn decode(el: &XmlElement) -> Self {
        let shape_points = el
            .children_named("rpt")
            .filter_map(|rpt| {
                let lat = rpt.attribute("lat")?.trim().parse::<f64>().ok()?;
                let lon = rpt.attribute("lon")?.trim().parse::<f64>().ok()?;
                Some(Coord::from_lat_lon(lat, lon))
            })
            .collect();

        Self {
            subclass: el.child_text("Subclass").map(str::to_string),
            shape_points,
        }
    }

    pub(super) fn encode(&self) -> XmlElement {
        let mut root = XmlElement::in_schema(Schema::GpxxV3, "RoutePointExtension");
        root.push_text_child("Subclass", self.subclass.as_deref());
        for c in &self.shape_points {
            let rpt = root
                .sibling_schema_child("rpt")
                .with_attribute("lat", c.lat().to_string())
                .with_attribute("lon", c.lon().to_string());
            root.push_child(rpt);
        }
        root
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackExtension {
    pub display_color: Option<String>,
}

impl TrackExtension {
    pub(super) fn decode(el: &XmlElement) -> Self {
        Self {
            display_color: el.child_text("DisplayColor").map(str::to_string),
        }
    }

    pub(super) fn encode(&self) -> XmlElement {
        let mut root = XmlElement::in_schema(Schema::GpxxV3, "TrackExtension");
        root.push_text_child("DisplayColor", self.display_color.as_deref());
        root
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TripExtension {
    pub transportation_mode: Option<String>,
}

impl TripExtension {
    pub(super) fn decode(el: &XmlElement) -> Self {
        Self {
            transportation_mode: el.child_text("TransportationMode").map(str::to_string),
        }
    }

    pub(super) fn encode(&self) -> XmlElement {
        let mut root = XmlElement::in_schema(Schema::TripV1, "Trip");
        root.push_text_child("TransportationMode", self.transportation_mode.as_deref());
        root
    }
}

/// Calculation hints of a via point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViaPointExtension {
    pub arrival_time: Option<DateTime<Utc>>,
    pub departure_time: Option<DateTime<Utc>>,
    /// Raw `xsd:duration`.
    pub stop_duration: Option<String>,
    pub calculation_mode: Option<String>,
    pub elevation_mode: Option<String>,
    pub named_road: Option<String>,
}

impl ViaPointExtension {
    pub(super) fn decode(el: &XmlElement) -> Self {
        // NamedRoad is either plain text or a block with a Name child
        let named_road = el.child("NamedRoad").and_then(|road| {
            road.child_text("Name")
                .or_else(|| Some(road.text.trim()).filter(|t| !t.is_empty()))
                .map(str::to_string)
        });

        Self {
            arrival_time: parse_time(el.child_text("ArrivalTime")),
            departure_time: parse_time(el.child_text("DepartureTime")),
            stop_duration: el.child_text("StopDuration").map(str::to_string),
            calculation_mode: el.child_text("CalculationMode").map(str::to_string),
            elevation_mode: el.child_text("ElevationMode").map(str::to_string),
            named_road,
        }
    }

    pub(super) fn encode(&self) -> XmlElement {
        let mut root = XmlElement::in_schema(Schema::TripV1, "ViaPoint");
        root.push_text_child("ArrivalTime", self.arrival_time.map(|t| format_time(&t)).as_deref());
        root.push_text_child(
            "DepartureTime",
            self.departure_time.map(|t| format_time(&t)).as_deref(),
        );
        root.push_text_child("StopDuration", self.stop_duration.as_deref());
        root.push_text_child("CalculationMode", self.calculation_mode.as_deref());
        root.push_text_child("ElevationMode", self.elevation_mode.as_deref());
        root.push_text_child("NamedRoad", self.named_road.as_deref());
        root
    }
}

/// Parse an `xsd:duration` into milliseconds.
///
/// Years and months have no fixed length and are rejected, as are malformed
/// values.
pub fn parse_xsd_duration(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, rest) = match text.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, text),
    };
    let rest = rest.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => {
            if t.is_empty() {
                return None;
            }
            (d, t)
        }
        None => (rest, ""),
    };
    if date_part.is_empty() && time_part.is_empty() {
        return None;
    }

    let mut millis = 0.0_f64;
    for (value, unit) in duration_fields(date_part)? {
        millis += value
            * match unit {
                'W' => 7.0 * 86_400_000.0,
                'D' => 86_400_000.0,
                _ => return None,
            };
    }
    for (value, unit) in duration_fields(time_part)? {
        millis += value
            * match unit {
                'H' => 3_600_000.0,
                'M' => 60_000.0,
                'S' => 1000.0,
                _ => return None,
            };
    }

    let millis = millis.round() as i64;
    Some(if negative { -millis } else { millis })
}

fn duration_fields(part: &str) -> Option<Vec<(f64, char)>> {
    let mut fields = Vec::new();
    let mut number = String::new();
    for ch in part.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            number.push(ch);
        } else {
            if number.is_empty() {
                return None;
            }
            fields.push((number.parse::<f64>().ok()?, ch));
            number.clear();
        }
    }
    number.is_empty().then_some(fields)
}

/// Format milliseconds as an `xsd:duration` (`PT1H2M3.5S`).
pub fn format_xsd_duration(millis: i64) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let millis = millis.unsigned_abs();
    let hours = millis / 3_600_000;
    let minutes = millis % 3_600_000 / 60_000;
    let secs = millis % 60_000 / 1000;
    let frac = millis % 1000;

    let mut out = format!("{sign}PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if frac > 0 {
        let frac = format!("{frac:03}");
        out.push_str(&format!("{secs}.{}S", frac.trim_end_matches('0')));
    } else if secs > 0 || (hours == 0 && minutes == 0) {
        out.push_str(&format!("{secs}S"));
    }
    out
}
