use chrono::{DateTime, Utc};

use crate::error::{CodecError, Result};
use crate::extensions::{CreationTimeExtension, Extensions, Schema, WaypointExtension};
use crate::geometry::{Coord, CoordExt, Point};
use crate::gpx_types::{GpxLink, GpxPoint};
use crate::model::{
    clean_links, clean_phone_numbers, non_blank, Link, Waypoint, WaypointProperties,
    DESCRIPTION_SEPARATOR,
};

/// Split a stored description into the wire `(desc, cmt)` pair.
///
/// Text holding the separator is cut in two before either half is
/// trimmed; any other text fills both fields.
pub fn split_description(description: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(raw) = description else {
        return (None, None);
    };
    match raw.split_once(DESCRIPTION_SEPARATOR) {
        Some((desc, cmt)) => (non_blank(Some(desc)), non_blank(Some(cmt))),
        None => {
            let text = non_blank(Some(raw));
            (text.clone(), text)
        }
    }
}

/// Merge the wire `desc` and `cmt` fields into one stored description.
pub fn merge_description(desc: Option<&str>, cmt: Option<&str>) -> Option<String> {
    match (non_blank(desc), non_blank(cmt)) {
        (Some(desc), Some(cmt)) if desc == cmt => Some(desc),
        (Some(desc), Some(cmt)) => Some(format!("{desc}{DESCRIPTION_SEPARATOR}{cmt}")),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}

pub fn waypoint_to_gpx(waypoint: &Waypoint) -> Result<GpxPoint> {
    let props = &waypoint.properties;
    let mut point = gpx_point_at(&waypoint.geometry)?;

    let (desc, cmt) = split_description(props.description.as_deref());
    point.name = non_blank(props.name.as_deref());
    point.desc = desc;
    point.cmt = cmt;
    point.links = links_to_gpx(&props.links);
    point.ele = props.elevation.filter(|e| e.is_finite());
    point.sym = non_blank(props.symbol.as_deref());

    let mut extensions = Extensions::new();
    if let Some(creation_time) = props.created {
        extensions.push(CreationTimeExtension { creation_time });
    }

    let address = props.address.as_ref().and_then(|a| a.cleaned());
    let phone_numbers = clean_phone_numbers(&props.phone_numbers);
    if address.is_some() || !phone_numbers.is_empty() {
        // older devices only read the v1 block
        for schema in [Schema::GpxxV3, Schema::WptxV1] {
            extensions.push(WaypointExtension {
                address: address.clone(),
                phone_numbers: phone_numbers.clone(),
                ..WaypointExtension::new(schema)
            });
        }
    }
    point.extensions = extensions;

    Ok(point)
}

pub fn gpx_to_waypoint(point: &GpxPoint) -> Result<Waypoint> {
    let geometry = point_position(point)?;

    let contact = point
        .extensions
        .find_first_preferring::<WaypointExtension>(Schema::GpxxV3);

    let props = WaypointProperties {
        name: non_blank(point.name.as_deref()),
        description: merge_description(point.desc.as_deref(), point.cmt.as_deref()),
        links: links_from_gpx(&point.links),
        elevation: point.ele.filter(|e| e.is_finite()),
        address: contact.and_then(|c| c.address.as_ref()).and_then(|a| a.cleaned()),
        phone_numbers: contact
            .map(|c| clean_phone_numbers(&c.phone_numbers))
            .unwrap_or_default(),
        symbol: non_blank(point.sym.as_deref()),
        created: point_time(point),
        modified: None,
    };

    Ok(Waypoint::new(geometry, props))
}

/// A bare wire point at `position`.
pub(super) fn gpx_point_at(position: &Point) -> Result<GpxPoint> {
    let coord = position.0;
    if !coord.is_finite() {
        return Err(CodecError::MissingPosition);
    }
    Ok(GpxPoint::new(coord.lat(), coord.lon()))
}

pub(super) fn point_position(point: &GpxPoint) -> Result<Point> {
    let coord = Coord::from_lat_lon(point.lat, point.lon);
    if !coord.is_finite() {
        return Err(CodecError::MissingPosition);
    }
    Ok(Point(coord))
}

/// Creation-time extension first, then the native timestamp.
pub(super) fn point_time(point: &GpxPoint) -> Option<DateTime<Utc>> {
    point
        .extensions
        .find_first::<CreationTimeExtension>()
        .map(|ext| ext.creation_time)
        .or(point.time)
}

pub(super) fn links_to_gpx(links: &[Link]) -> Vec<GpxLink> {
    clean_links(links)
        .into_iter()
        .map(|link| GpxLink {
            href: link.href,
            text: link.text,
            link_type: link.mime_type,
        })
        .collect()
}

pub(super) fn links_from_gpx(links: &[GpxLink]) -> Vec<Link> {
    links
        .iter()
        .filter_map(|l| Link::new(&l.href, l.text.as_deref(), l.link_type.as_deref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Address, PhoneNumber};

    fn waypoint(props: WaypointProperties) -> Waypoint {
        Waypoint::new(Point::new(139.6503, 35.6762), props)
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_merge_description() {
        assert_eq!(merge_description(Some("a"), Some("b")).as_deref(), Some("a\n---\nb"));
        assert_eq!(merge_description(Some("a"), Some("a")).as_deref(), Some("a"));
        assert_eq!(merge_description(None, Some("b")).as_deref(), Some("b"));
        assert_eq!(merge_description(Some("a"), Some("  ")).as_deref(), Some("a"));
        assert_eq!(merge_description(None, None), None);
    }

    #[test]
    fn test_split_description() {
        assert_eq!(
            split_description(Some("a\n---\nb")),
            (Some("a".to_string()), Some("b".to_string()))
        );
        assert_eq!(
            split_description(Some("same")),
            (Some("same".to_string()), Some("same".to_string()))
        );
        assert_eq!(split_description(Some("")), (None, None));
        assert_eq!(split_description(None), (None, None));
    }

    #[test]
    fn test_split_description_with_empty_half() {
        assert_eq!(split_description(Some("\n---\nb")), (None, Some("b".to_string())));
        assert_eq!(split_description(Some("a\n---\n")), (Some("a".to_string()), None));
        assert_eq!(
            split_description(Some("  a  \n---\n  b ")),
            (Some("a".to_string()), Some("b".to_string()))
        );
    }

    #[test]
    fn test_distinct_descriptions_round_trip() {
        let original = waypoint(WaypointProperties {
            description: Some("Opening hours\n---\nBring cash".to_string()),
            ..Default::default()
        });
        let gpx = waypoint_to_gpx(&original).unwrap();
        assert_eq!(gpx.desc.as_deref(), Some("Opening hours"));
        assert_eq!(gpx.cmt.as_deref(), Some("Bring cash"));
        let back = gpx_to_waypoint(&gpx).unwrap();
        assert_eq!(back.properties.description, original.properties.description);
    }

    #[test]
    fn test_contact_written_to_both_schemas() {
        let w = waypoint(WaypointProperties {
            address: Some(Address {
                city: Some("Tokyo".to_string()),
                ..Default::default()
            }),
            phone_numbers: vec![PhoneNumber {
                number: "03-1234".to_string(),
                category: None,
            }],
            ..Default::default()
        });
        let gpx = waypoint_to_gpx(&w).unwrap();
        let schemas: Vec<_> = gpx.extensions.iter().filter_map(|e| e.schema()).collect();
        assert_eq!(schemas, vec![Schema::GpxxV3, Schema::WptxV1]);
    }

    #[test]
    fn test_no_empty_contact_blocks() {
        let w = waypoint(WaypointProperties {
            address: Some(Address {
                city: Some("   ".to_string()),
                ..Default::default()
            }),
            phone_numbers: vec![PhoneNumber {
                number: "".to_string(),
                category: Some("Work".to_string()),
            }],
            ..Default::default()
        });
        let gpx = waypoint_to_gpx(&w).unwrap();
        assert!(gpx.extensions.is_empty());
    }

    #[test]
    fn test_import_prefers_v3_contact() {
        let mut gpx = GpxPoint::new(1.0, 2.0);
        gpx.extensions.push(WaypointExtension {
            address: Some(Address {
                city: Some("Legacy".to_string()),
                ..Default::default()
            }),
            ..WaypointExtension::new(Schema::WptxV1)
        });
        gpx.extensions.push(WaypointExtension {
            address: Some(Address {
                city: Some("Current".to_string()),
                ..Default::default()
            }),
            ..WaypointExtension::new(Schema::GpxxV3)
        });
        let w = gpx_to_waypoint(&gpx).unwrap();
        assert_eq!(w.properties.address.unwrap().city.as_deref(), Some("Current"));
        assert!(w.properties.phone_numbers.is_empty());
    }

    #[test]
    fn test_time_resolution_order() {
        let mut gpx = GpxPoint::new(1.0, 2.0);
        assert_eq!(gpx_to_waypoint(&gpx).unwrap().properties.created, None);

        gpx.time = Some(ts("2024-01-01T00:00:00Z"));
        assert_eq!(gpx_to_waypoint(&gpx).unwrap().properties.created, gpx.time);

        gpx.extensions.push(CreationTimeExtension {
            creation_time: ts("2023-06-01T12:00:00Z"),
        });
        assert_eq!(
            gpx_to_waypoint(&gpx).unwrap().properties.created,
            Some(ts("2023-06-01T12:00:00Z"))
        );
    }

    #[test]
    fn test_creation_time_exported_as_extension() {
        let created = ts("2024-03-01T08:30:00Z");
        let gpx = waypoint_to_gpx(&waypoint(WaypointProperties {
            created: Some(created),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(gpx.time, None);
        assert_eq!(
            gpx.extensions.find_first::<CreationTimeExtension>().map(|e| e.creation_time),
            Some(created)
        );
    }

    #[test]
    fn test_missing_position() {
        let w = Waypoint::new(Point::new(f64::NAN, 1.0), WaypointProperties::default());
        assert!(matches!(waypoint_to_gpx(&w), Err(CodecError::MissingPosition)));
        let gpx = GpxPoint::new(f64::INFINITY, 1.0);
        assert!(matches!(gpx_to_waypoint(&gpx), Err(CodecError::MissingPosition)));
    }

    #[test]
    fn test_blank_links_dropped() {
        let mut gpx = GpxPoint::new(1.0, 2.0);
        gpx.links = vec![
            GpxLink {
                href: " ".to_string(),
                text: Some("nothing".to_string()),
                link_type: None,
            },
            GpxLink {
                href: "https://example.com".to_string(),
                text: None,
                link_type: None,
            },
        ];
        let w = gpx_to_waypoint(&gpx).unwrap();
        assert_eq!(w.properties.links.len(), 1);
        assert_eq!(w.properties.links[0].href, "https://example.com");
    }
}
