use chrono::{DateTime, Utc};
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;

use crate::error::CodecError;
use crate::extensions::{Extension, Extensions, XmlElement};
use crate::gpx_types::*;

type Result<T> = std::result::Result<T, CodecError>;

/// Namespace declarations in scope, innermost last.
#[derive(Debug, Default)]
struct Namespaces(Vec<(String, String)>);

impl Namespaces {
    /// Record the `xmlns` declarations of `start`; returns the scope depth
    /// to restore once the element closes.
    fn declare(&mut self, start: &BytesStart<'_>) -> usize {
        let depth = self.0.len();
        for attr in start.attributes().flatten() {
            let key = attr.key.as_ref();
            let prefix = if key == b"xmlns" {
                Some(&b""[..])
            } else {
                key.strip_prefix(b"xmlns:")
            };
            if let Some(prefix) = prefix {
                self.0.push((
                    String::from_utf8_lossy(prefix).into_owned(),
                    String::from_utf8_lossy(&attr.value).into_owned(),
                ));
            }
        }
        depth
    }

    fn restore(&mut self, depth: usize) {
        self.0.truncate(depth);
    }

    fn resolve(&self, prefix: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }
}

/// Parse a GPX XML string into a GpxDocument.
pub fn parse_gpx(xml: &str) -> Result<GpxDocument> {
    let mut reader = Reader::from_str(xml);
    let mut ns = Namespaces::default();
    let mut doc = GpxDocument::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"gpx" => {
                    ns.declare(&e);
                    doc.creator = attribute_value(&e, b"creator");
                }
                b"metadata" => doc.metadata = parse_metadata(&mut reader)?,
                b"wpt" => {
                    if let Some(pt) = parse_point(&e, &mut reader, &mut ns)? {
                        doc.waypoints.push(pt);
                    }
                }
                b"rte" => doc.routes.push(parse_route(&e, &mut reader, &mut ns)?),
                b"trk" => doc.tracks.push(parse_track(&e, &mut reader, &mut ns)?),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"wpt" {
                    if let Ok((lat, lon)) = parse_lat_lon(&e) {
                        doc.waypoints.push(GpxPoint::new(lat, lon));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CodecError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(doc)
}

fn attribute_value(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .map(|attr| unescape_attribute(&attr.value))
}

fn unescape_attribute(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    match quick_xml::escape::unescape(&raw) {
        Ok(text) => text.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(text.trim()) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Ignoring unparsable <time> '{}': {}", text, e);
            None
        }
    }
}

/// Parse lat/lon attributes from a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| CodecError::XmlParse(e.into()))?;
        let key = attr.key.local_name();
        let val = std::str::from_utf8(&attr.value).unwrap_or_default();
        match key.as_ref() {
            b"lat" => {
                lat = Some(val.trim().parse::<f64>().map_err(|_| {
                    CodecError::InvalidAttribute {
                        element: "point",
                        attribute: "lat",
                        value: val.to_string(),
                    }
                })?);
            }
            b"lon" => {
                lon = Some(val.trim().parse::<f64>().map_err(|_| {
                    CodecError::InvalidAttribute {
                        element: "point",
                        attribute: "lon",
                        value: val.to_string(),
                    }
                })?);
            }
            _ => {}
        }
    }

    let lat = lat.ok_or(CodecError::MissingAttribute {
        element: "point",
        attribute: "lat",
    })?;
    let lon = lon.ok_or(CodecError::MissingAttribute {
        element: "point",
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

/// Parse a point element (wpt, rtept, trkpt) and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    ns: &mut Namespaces,
) -> Result<Option<GpxPoint>> {
    let depth = ns.declare(start);
    let point = read_point(start, reader, ns);
    ns.restore(depth);
    point
}

fn read_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    ns: &mut Namespaces,
) -> Result<Option<GpxPoint>> {
    let (lat, lon) = match parse_lat_lon(start) {
        Ok(coords) => coords,
        Err(e) => {
            tracing::warn!("Skipping point: {}", e);
            reader
                .read_to_end(start.name())
                .map_err(CodecError::XmlParse)?;
            return Ok(None);
        }
    };

    let mut point = GpxPoint::new(lat, lon);
    let end_name = start.name().0.to_vec(); // own the end tag name for comparison

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = read_text_owned(reader, &e)?;
                    point.ele = text.trim().parse::<f64>().ok();
                }
                b"time" => point.time = parse_time(&read_text_owned(reader, &e)?),
                b"name" => point.name = Some(read_text_owned(reader, &e)?),
                b"cmt" => point.cmt = Some(read_text_owned(reader, &e)?),
                b"desc" => point.desc = Some(read_text_owned(reader, &e)?),
                b"src" => point.src = Some(read_text_owned(reader, &e)?),
                b"sym" => point.sym = Some(read_text_owned(reader, &e)?),
                b"type" => point.point_type = Some(read_text_owned(reader, &e)?),
                b"link" => point.links.push(parse_link(&e, reader)?),
                b"extensions" => point.extensions = parse_extensions(&e, reader, ns)?,
                _ => {
                    // Skip unknown elements
                    reader
                        .read_to_end(e.name())
                        .map_err(CodecError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"link" => {
                point.links.push(empty_link(&e));
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(CodecError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(Some(point))
}

fn empty_link(start: &BytesStart<'_>) -> GpxLink {
    GpxLink {
        href: attribute_value(start, b"href").unwrap_or_default(),
        text: None,
        link_type: None,
    }
}

/// Parse a <link> element.
fn parse_link<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
) -> Result<GpxLink> {
    let mut link = empty_link(start);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"text" => link.text = Some(read_text_owned(reader, &e)?),
                b"type" => link.link_type = Some(read_text_owned(reader, &e)?),
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(CodecError::XmlParse)?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"link" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(CodecError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(link)
}

/// Parse a <metadata> element.
fn parse_metadata<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxMetadata> {
    let mut metadata = GpxMetadata::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => metadata.name = Some(read_text_owned(reader, &e)?),
                b"desc" => metadata.desc = Some(read_text_owned(reader, &e)?),
                b"time" => metadata.time = parse_time(&read_text_owned(reader, &e)?),
                b"link" => metadata.links.push(parse_link(&e, reader)?),
                b"author" => metadata.author = parse_author(reader)?,
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(CodecError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"link" => {
                metadata.links.push(empty_link(&e));
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"metadata" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(CodecError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(metadata)
}

/// Parse an <author> element, keeping only the person's name.
fn parse_author<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Option<String>> {
    let mut name = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => name = Some(read_text_owned(reader, &e)?),
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(CodecError::XmlParse)?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"author" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(CodecError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(name)
}

/// Parse an <extensions> block into typed extension values.
fn parse_extensions<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    ns: &mut Namespaces,
) -> Result<Extensions> {
    let depth = ns.declare(start);
    let mut extensions = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = capture_element(&e, reader, ns, true)?;
                extensions.push(Extension::from_element(element));
            }
            Ok(Event::Empty(e)) => {
                let element = capture_element(&e, reader, ns, false)?;
                extensions.push(Extension::from_element(element));
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"extensions" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(CodecError::XmlParse(e)),
            _ => {}
        }
    }

    ns.restore(depth);
    Ok(extensions.into_iter().collect())
}

/// Capture an arbitrary element subtree with resolved namespaces.
fn capture_element<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    ns: &mut Namespaces,
    has_content: bool,
) -> Result<XmlElement> {
    let depth = ns.declare(start);

    let qname = start.name();
    let prefix = qname
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());
    let mut element = XmlElement {
        namespace: ns.resolve(prefix.as_deref().unwrap_or("")).map(str::to_string),
        prefix,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attributes: start
            .attributes()
            .flatten()
            .map(|attr| {
                (
                    String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                    unescape_attribute(&attr.value),
                )
            })
            .collect(),
        ..Default::default()
    };

    if has_content {
        let end_name = start.name().0.to_vec();
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let child = capture_element(&e, reader, ns, true)?;
                    element.children.push(child);
                }
                Ok(Event::Empty(e)) => {
                    let child = capture_element(&e, reader, ns, false)?;
                    element.children.push(child);
                }
                Ok(Event::Text(e)) => {
                    element
                        .text
                        .push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
                }
                Ok(Event::CData(e)) => {
                    element
                        .text
                        .push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
                }
                Ok(Event::GeneralRef(e)) => push_entity(&mut element.text, &e),
                Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
                Ok(Event::Eof) => break,
                Err(e) => return Err(CodecError::XmlParse(e)),
                _ => {}
            }
        }
    }

    ns.restore(depth);
    Ok(element)
}

/// Parse a <rte> element.
fn parse_route<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    ns: &mut Namespaces,
) -> Result<GpxRoute> {
    let depth = ns.declare(start);
    let route = read_route(reader, ns);
    ns.restore(depth);
    route
}

fn read_route<'a>(reader: &mut Reader<&'a [u8]>, ns: &mut Namespaces) -> Result<GpxRoute> {
    let mut route = GpxRoute::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => route.name = Some(read_text_owned(reader, &e)?),
                b"cmt" => route.cmt = Some(read_text_owned(reader, &e)?),
                b"desc" => route.desc = Some(read_text_owned(reader, &e)?),
                b"src" => route.src = Some(read_text_owned(reader, &e)?),
                b"type" => route.route_type = Some(read_text_owned(reader, &e)?),
                b"number" => {
                    let text = read_text_owned(reader, &e)?;
                    route.number = text.trim().parse::<u32>().ok();
                }
                b"link" => route.links.push(parse_link(&e, reader)?),
                b"extensions" => route.extensions = parse_extensions(&e, reader, ns)?,
                b"rtept" => {
                    if let Some(pt) = parse_point(&e, reader, ns)? {
                        route.points.push(pt);
                    }
                }
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(CodecError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"rtept" => {
                    if let Ok((lat, lon)) = parse_lat_lon(&e) {
                        route.points.push(GpxPoint::new(lat, lon));
                    }
                }
                b"link" => route.links.push(empty_link(&e)),
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"rte" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(CodecError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(route)
}

/// Parse a <trk> element.
fn parse_track<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    ns: &mut Namespaces,
) -> Result<GpxTrack> {
    let depth = ns.declare(start);
    let track = read_track(reader, ns);
    ns.restore(depth);
    track
}

fn read_track<'a>(reader: &mut Reader<&'a [u8]>, ns: &mut Namespaces) -> Result<GpxTrack> {
    let mut track = GpxTrack::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => track.name = Some(read_text_owned(reader, &e)?),
                b"cmt" => track.cmt = Some(read_text_owned(reader, &e)?),
                b"desc" => track.desc = Some(read_text_owned(reader, &e)?),
                b"src" => track.src = Some(read_text_owned(reader, &e)?),
                b"type" => track.track_type = Some(read_text_owned(reader, &e)?),
                b"number" => {
                    let text = read_text_owned(reader, &e)?;
                    track.number = text.trim().parse::<u32>().ok();
                }
                b"link" => track.links.push(parse_link(&e, reader)?),
                b"extensions" => track.extensions = parse_extensions(&e, reader, ns)?,
                b"trkseg" => track.segments.push(parse_segment(reader, ns)?),
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(CodecError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"trkseg" => track.segments.push(GpxSegment::default()),
                b"link" => track.links.push(empty_link(&e)),
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(CodecError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a <trkseg> element.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>, ns: &mut Namespaces) -> Result<GpxSegment> {
    let mut segment = GpxSegment::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => {
                    if let Some(pt) = parse_point(&e, reader, ns)? {
                        segment.points.push(pt);
                    }
                }
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(CodecError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkpt" {
                    if let Ok((lat, lon)) = parse_lat_lon(&e) {
                        segment.points.push(GpxPoint::new(lat, lon));
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(CodecError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(segment)
}

/// Handle character references (&#60; &#x3C;) and predefined entities.
fn push_entity(text: &mut String, e: &BytesRef<'_>) {
    if let Ok(Some(ch)) = e.resolve_char_ref() {
        text.push(ch);
        return;
    }
    let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
    match name {
        "amp" => text.push('&'),
        "lt" => text.push('<'),
        "gt" => text.push('>'),
        "quot" => text.push('"'),
        "apos" => text.push('\''),
        _ => {} // Unknown entity, skip
    }
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(
    reader: &mut Reader<&'a [u8]>,
    start: &BytesStart<'_>,
) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(raw);
            }
            Ok(Event::CData(e)) => {
                let s = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(s);
            }
            Ok(Event::GeneralRef(e)) => push_entity(&mut text, &e),
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(CodecError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::{
        RoutePointExtension, Schema, TrackExtension, ViaPointExtension, WaypointExtension,
    };

    #[test]
    fn test_minimal_waypoint() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.6762" lon="139.6503"/>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.waypoints.len(), 1);
        assert!((doc.waypoints[0].lat - 35.6762).abs() < 1e-10);
        assert!((doc.waypoints[0].lon - 139.6503).abs() < 1e-10);
    }

    #[test]
    fn test_waypoint_with_children() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.6762" lon="139.6503">
    <ele>40.5</ele>
    <time>2025-01-01T00:00:00Z</time>
    <name>Tokyo Tower</name>
    <desc>A famous landmark</desc>
    <cmt>Comment</cmt>
    <src>GPS</src>
    <sym>Flag</sym>
    <type>POI</type>
  </wpt>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        let pt = &doc.waypoints[0];
        assert!((pt.ele.unwrap() - 40.5).abs() < 1e-10);
        assert_eq!(
            pt.time,
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .ok()
                .map(|t| t.with_timezone(&Utc))
        );
        assert_eq!(pt.name.as_deref(), Some("Tokyo Tower"));
        assert_eq!(pt.desc.as_deref(), Some("A famous landmark"));
        assert_eq!(pt.cmt.as_deref(), Some("Comment"));
        assert_eq!(pt.src.as_deref(), Some("GPS"));
        assert_eq!(pt.sym.as_deref(), Some("Flag"));
        assert_eq!(pt.point_type.as_deref(), Some("POI"));
    }

    #[test]
    fn test_unparsable_time_is_absent() {
        let xml = r#"<gpx><wpt lat="1" lon="2"><time>yesterday</time></wpt></gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert!(doc.waypoints[0].time.is_none());
    }

    #[test]
    fn test_simple_route() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <rte>
    <name>Test Route</name>
    <rtept lat="35.0" lon="139.0"/>
    <rtept lat="36.0" lon="140.0"/>
    <rtept lat="37.0" lon="141.0"/>
  </rte>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.routes.len(), 1);
        assert_eq!(doc.routes[0].name.as_deref(), Some("Test Route"));
        assert_eq!(doc.routes[0].points.len(), 3);
    }

    #[test]
    fn test_multi_segment_track() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"/>
      <trkpt lat="35.001" lon="139.001"/>
    </trkseg>
    <trkseg>
      <trkpt lat="36.0" lon="140.0"/>
    </trkseg>
    <trkseg/>
  </trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        // degenerate segments are kept here; the track converter drops them
        assert_eq!(doc.tracks[0].segments.len(), 3);
        assert_eq!(doc.tracks[0].segments[0].points.len(), 2);
        assert_eq!(doc.tracks[0].segments[1].points.len(), 1);
        assert!(doc.tracks[0].segments[2].points.is_empty());
    }

    #[test]
    fn test_empty_gpx() {
        let xml = r#"<?xml version="1.0"?><gpx version="1.1"></gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert!(doc.waypoints.is_empty());
        assert!(doc.routes.is_empty());
        assert!(doc.tracks.is_empty());
    }

    #[test]
    fn test_unknown_extension_preserved() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="139.0">
        <extensions>
          <gpxtpx:TrackPointExtension xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
            <gpxtpx:hr>150</gpxtpx:hr>
          </gpxtpx:TrackPointExtension>
        </extensions>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        let pt = &doc.tracks[0].segments[0].points[0];
        let raw = pt.extensions.find_first::<XmlElement>().unwrap();
        assert_eq!(raw.name, "TrackPointExtension");
        assert_eq!(
            raw.namespace.as_deref(),
            Some("http://www.garmin.com/xmlschemas/TrackPointExtension/v1")
        );
        assert_eq!(raw.child_text("hr"), Some("150"));
    }

    #[test]
    fn test_garmin_extensions_decoded() {
        let xml = r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1"
     xmlns:gpxx="http://www.garmin.com/xmlschemas/GpxExtensions/v3"
     xmlns:wptx1="http://www.garmin.com/xmlschemas/WaypointExtension/v1"
     xmlns:trp="http://www.garmin.com/xmlschemas/TripExtensions/v1"
     version="1.1" creator="test">
  <wpt lat="35.0" lon="139.0">
    <extensions>
      <wptx1:WaypointExtension>
        <wptx1:PhoneNumber Category="Work">555-0100</wptx1:PhoneNumber>
      </wptx1:WaypointExtension>
    </extensions>
  </wpt>
  <rte>
    <rtept lat="35.0" lon="139.0">
      <extensions>
        <trp:ViaPoint><trp:CalculationMode>ShorterDistance</trp:CalculationMode></trp:ViaPoint>
        <gpxx:RoutePointExtension>
          <gpxx:rpt lat="35.1" lon="139.1"/>
          <gpxx:rpt lat="35.2" lon="139.2"/>
        </gpxx:RoutePointExtension>
      </extensions>
    </rtept>
  </rte>
  <trk>
    <extensions>
      <gpxx:TrackExtension><gpxx:DisplayColor>Blue</gpxx:DisplayColor></gpxx:TrackExtension>
    </extensions>
  </trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.creator.as_deref(), Some("test"));

        let wpt_ext = doc.waypoints[0]
            .extensions
            .find_first::<WaypointExtension>()
            .unwrap();
        assert_eq!(wpt_ext.schema, Schema::WptxV1);
        assert_eq!(wpt_ext.phone_numbers[0].number, "555-0100");

        let rtept = &doc.routes[0].points[0];
        let via = rtept.extensions.find_first::<ViaPointExtension>().unwrap();
        assert_eq!(via.calculation_mode.as_deref(), Some("ShorterDistance"));
        let shape = rtept.extensions.find_first::<RoutePointExtension>().unwrap();
        assert_eq!(shape.shape_points.len(), 2);

        let trk_ext = doc.tracks[0].extensions.find_first::<TrackExtension>().unwrap();
        assert_eq!(trk_ext.display_color.as_deref(), Some("Blue"));
    }

    #[test]
    fn test_prefix_bound_to_other_uri_is_not_garmin() {
        let xml = r#"<gpx xmlns:gpxx="http://example.com/not-garmin">
  <trk><extensions><gpxx:TrackExtension/></extensions></trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert!(doc.tracks[0].extensions.find_first::<TrackExtension>().is_none());
        assert_eq!(doc.tracks[0].extensions.len(), 1);
    }

    #[test]
    fn test_namespaces_declared_on_feature_elements() {
        let xml = r#"<gpx version="1.1">
  <wpt lat="35.0" lon="139.0" xmlns:g="http://www.garmin.com/xmlschemas/GpxExtensions/v3">
    <extensions>
      <g:WaypointExtension><g:Address><g:City>Kyoto</g:City></g:Address></g:WaypointExtension>
    </extensions>
  </wpt>
  <wpt lat="36.0" lon="140.0">
    <extensions><g:WaypointExtension/></extensions>
  </wpt>
  <rte xmlns:g="http://www.garmin.com/xmlschemas/GpxExtensions/v3">
    <rtept lat="35.0" lon="139.0">
      <extensions>
        <g:RoutePointExtension><g:rpt lat="35.1" lon="139.1"/></g:RoutePointExtension>
      </extensions>
    </rtept>
  </rte>
  <trk xmlns:g="http://www.garmin.com/xmlschemas/GpxExtensions/v3">
    <extensions>
      <g:TrackExtension><g:DisplayColor>Red</g:DisplayColor></g:TrackExtension>
    </extensions>
  </trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();

        let wpt_ext = doc.waypoints[0]
            .extensions
            .find_first::<WaypointExtension>()
            .unwrap();
        assert_eq!(wpt_ext.schema, Schema::GpxxV3);
        assert_eq!(
            wpt_ext.address.as_ref().and_then(|a| a.city.as_deref()),
            Some("Kyoto")
        );

        // the declaration on the first <wpt> does not leak into its sibling
        let sibling = &doc.waypoints[1].extensions;
        assert!(sibling.find_first::<WaypointExtension>().is_none());
        assert_eq!(sibling.len(), 1);

        let shape = doc.routes[0].points[0]
            .extensions
            .find_first::<RoutePointExtension>()
            .unwrap();
        assert_eq!(shape.shape_points.len(), 1);

        let trk_ext = doc.tracks[0].extensions.find_first::<TrackExtension>().unwrap();
        assert_eq!(trk_ext.display_color.as_deref(), Some("Red"));
    }

    #[test]
    fn test_cdata() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.0" lon="139.0">
    <name><![CDATA[Test & Name]]></name>
  </wpt>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.waypoints[0].name.as_deref(), Some("Test & Name"));
    }

    #[test]
    fn test_entities_in_text() {
        let xml = r#"<gpx><wpt lat="1" lon="2"><name>Fish &amp; Chips &#60;3</name></wpt></gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.waypoints[0].name.as_deref(), Some("Fish & Chips <3"));
    }

    #[test]
    fn test_multiple_links() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.0" lon="139.0">
    <link href="https://example.com">
      <text>Example</text>
      <type>text/html</type>
    </link>
    <link href="https://example.org/?a=1&amp;b=2"/>
  </wpt>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        let links = &doc.waypoints[0].links;
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "https://example.com");
        assert_eq!(links[0].text.as_deref(), Some("Example"));
        assert_eq!(links[0].link_type.as_deref(), Some("text/html"));
        assert_eq!(links[1].href, "https://example.org/?a=1&b=2");
    }

    #[test]
    fn test_missing_lat_lon_skipped() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.0" lon="139.0"><name>Good</name></wpt>
  <wpt><name>Bad - no coords</name></wpt>
  <wpt lat="36.0" lon="140.0"><name>Also Good</name></wpt>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.waypoints.len(), 2);
        assert_eq!(doc.waypoints[0].name.as_deref(), Some("Good"));
        assert_eq!(doc.waypoints[1].name.as_deref(), Some("Also Good"));
    }

    #[test]
    fn test_metadata() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <metadata>
    <name>Trip</name>
    <desc>Summer</desc>
    <author><name>Jo</name><email id="jo" domain="example.com"/></author>
    <time>2024-06-01T10:00:00Z</time>
  </metadata>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.metadata.name.as_deref(), Some("Trip"));
        assert_eq!(doc.metadata.desc.as_deref(), Some("Summer"));
        assert_eq!(doc.metadata.author.as_deref(), Some("Jo"));
        assert!(doc.metadata.time.is_some());
    }

    #[test]
    fn test_gpx10_elements_ignored() {
        let xml = r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/0" version="1.0">
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="139.0">
        <speed>5.5</speed>
        <course>180.0</course>
      </trkpt>
      <trkpt lat="35.001" lon="139.001"/>
    </trkseg>
  </trk>
</gpx>"#;
        let doc = parse_gpx(xml).unwrap();
        assert_eq!(doc.tracks[0].segments[0].points.len(), 2);
    }
}
