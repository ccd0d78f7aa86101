//! GPX 1.1 serialisation of a [`GpxDocument`].

use std::io::Cursor;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::CodecError;
use crate::extensions::{format_time, Extensions, Schema, XmlElement};
use crate::gpx_types::*;

type Result<T> = std::result::Result<T, CodecError>;

pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
const GPX_SCHEMA_LOCATION: &str = "http://www.topografix.com/GPX/1/1/gpx.xsd";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const DEFAULT_CREATOR: &str = "gpx-features-wasm";

/// Serialise a document as an indented GPX 1.1 string.
pub fn write_gpx(doc: &GpxDocument) -> Result<String> {
    let mut out = GpxWriter::new();
    out.write_document(doc)?;
    out.finish()
}

struct GpxWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

fn write_error(e: impl std::fmt::Display) -> CodecError {
    CodecError::XmlWrite(e.to_string())
}

impl GpxWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn finish(self) -> Result<String> {
        let mut bytes = self.writer.into_inner().into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(write_error)
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(write_error)
    }

    fn start(&mut self, start: BytesStart<'_>) -> Result<()> {
        self.event(Event::Start(start))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    /// `<name>text</name>`, skipped when `text` is absent.
    fn text_element(&mut self, name: &str, text: Option<&str>) -> Result<()> {
        let Some(text) = text else {
            return Ok(());
        };
        self.start(BytesStart::new(name))?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn number_element(&mut self, name: &str, value: Option<f64>) -> Result<()> {
        self.text_element(name, value.map(|v| v.to_string()).as_deref())
    }

    fn time_element(&mut self, time: Option<&DateTime<Utc>>) -> Result<()> {
        self.text_element("time", time.map(format_time).as_deref())
    }

    fn write_document(&mut self, doc: &GpxDocument) -> Result<()> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("gpx");
        root.push_attribute(("xmlns", GPX_NAMESPACE));
        for schema in Schema::ALL {
            root.push_attribute((format!("xmlns:{}", schema.prefix()).as_str(), schema.namespace()));
        }
        root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
        root.push_attribute(("version", "1.1"));
        root.push_attribute(("creator", doc.creator.as_deref().unwrap_or(DEFAULT_CREATOR)));
        root.push_attribute(("xsi:schemaLocation", schema_locations().as_str()));
        self.start(root)?;

        if !doc.metadata.is_empty() {
            self.write_metadata(&doc.metadata)?;
        }
        for point in &doc.waypoints {
            self.write_point("wpt", point)?;
        }
        for route in &doc.routes {
            self.write_route(route)?;
        }
        for track in &doc.tracks {
            self.write_track(track)?;
        }

        self.end("gpx")
    }

    fn write_metadata(&mut self, metadata: &GpxMetadata) -> Result<()> {
        self.start(BytesStart::new("metadata"))?;
        self.text_element("name", metadata.name.as_deref())?;
        self.text_element("desc", metadata.desc.as_deref())?;
        if metadata.author.is_some() {
            self.start(BytesStart::new("author"))?;
            self.text_element("name", metadata.author.as_deref())?;
            self.end("author")?;
        }
        self.write_links(&metadata.links)?;
        self.time_element(metadata.time.as_ref())?;
        self.end("metadata")
    }

    fn write_links(&mut self, links: &[GpxLink]) -> Result<()> {
        for link in links {
            let mut start = BytesStart::new("link");
            start.push_attribute(("href", link.href.as_str()));
            if link.text.is_none() && link.link_type.is_none() {
                self.event(Event::Empty(start))?;
                continue;
            }
            self.start(start)?;
            self.text_element("text", link.text.as_deref())?;
            self.text_element("type", link.link_type.as_deref())?;
            self.end("link")?;
        }
        Ok(())
    }

    /// Write a wpt, rtept or trkpt. Child order follows the GPX 1.1 `wptType`.
    fn write_point(&mut self, tag: &str, point: &GpxPoint) -> Result<()> {
        let mut start = BytesStart::new(tag);
        start.push_attribute(("lat", point.lat.to_string().as_str()));
        start.push_attribute(("lon", point.lon.to_string().as_str()));
        self.start(start)?;

        self.number_element("ele", point.ele)?;
        self.time_element(point.time.as_ref())?;
        self.text_element("name", point.name.as_deref())?;
        self.text_element("cmt", point.cmt.as_deref())?;
        self.text_element("desc", point.desc.as_deref())?;
        self.text_element("src", point.src.as_deref())?;
        self.write_links(&point.links)?;
        self.text_element("sym", point.sym.as_deref())?;
        self.text_element("type", point.point_type.as_deref())?;
        self.write_extensions(&point.extensions)?;

        self.end(tag)
    }

    fn write_route(&mut self, route: &GpxRoute) -> Result<()> {
        self.start(BytesStart::new("rte"))?;
        self.text_element("name", route.name.as_deref())?;
        self.text_element("cmt", route.cmt.as_deref())?;
        self.text_element("desc", route.desc.as_deref())?;
        self.text_element("src", route.src.as_deref())?;
        self.write_links(&route.links)?;
        self.text_element("number", route.number.map(|n| n.to_string()).as_deref())?;
        self.text_element("type", route.route_type.as_deref())?;
        self.write_extensions(&route.extensions)?;
        for point in &route.points {
            self.write_point("rtept", point)?;
        }
        self.end("rte")
    }

    fn write_track(&mut self, track: &GpxTrack) -> Result<()> {
        self.start(BytesStart::new("trk"))?;
        self.text_element("name", track.name.as_deref())?;
        self.text_element("cmt", track.cmt.as_deref())?;
        self.text_element("desc", track.desc.as_deref())?;
        self.text_element("src", track.src.as_deref())?;
        self.write_links(&track.links)?;
        self.text_element("number", track.number.map(|n| n.to_string()).as_deref())?;
        self.text_element("type", track.track_type.as_deref())?;
        self.write_extensions(&track.extensions)?;
        for segment in &track.segments {
            self.start(BytesStart::new("trkseg"))?;
            for point in &segment.points {
                self.write_point("trkpt", point)?;
            }
            self.end("trkseg")?;
        }
        self.end("trk")
    }

    fn write_extensions(&mut self, extensions: &Extensions) -> Result<()> {
        if extensions.is_empty() {
            return Ok(());
        }
        let mut scope = root_scope();
        self.start(BytesStart::new("extensions"))?;
        for ext in extensions.iter() {
            self.write_element(&ext.to_element(), &mut scope)?;
        }
        self.end("extensions")
    }

    /// Write a captured element, declaring its namespace when the prefix is
    /// not already bound to it.
    fn write_element(
        &mut self,
        element: &XmlElement,
        scope: &mut Vec<(String, String)>,
    ) -> Result<()> {
        let depth = scope.len();
        let qname = element.qualified_name();
        let mut start = BytesStart::new(qname.as_str());

        for (key, value) in &element.attributes {
            if let Some(prefix) = declared_prefix(key) {
                scope.push((prefix.to_string(), value.clone()));
            }
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if let Some(uri) = element.namespace.as_deref() {
            let prefix = element.prefix.as_deref().unwrap_or("");
            let bound = scope
                .iter()
                .rev()
                .find(|(p, _)| p == prefix)
                .is_some_and(|(_, u)| u == uri);
            if !bound {
                let key = if prefix.is_empty() {
                    "xmlns".to_string()
                } else {
                    format!("xmlns:{prefix}")
                };
                start.push_attribute((key.as_str(), uri));
                scope.push((prefix.to_string(), uri.to_string()));
            }
        }

        let text = element.text.trim();
        if text.is_empty() && element.children.is_empty() {
            self.event(Event::Empty(start))?;
        } else {
            self.start(start)?;
            if !text.is_empty() {
                self.event(Event::Text(BytesText::new(text)))?;
            }
            for child in &element.children {
                self.write_element(child, scope)?;
            }
            self.end(&qname)?;
        }

        scope.truncate(depth);
        Ok(())
    }
}

/// Prefix bindings declared on the `<gpx>` root.
fn root_scope() -> Vec<(String, String)> {
    std::iter::once((String::new(), GPX_NAMESPACE.to_string()))
        .chain(
            Schema::ALL
                .iter()
                .map(|s| (s.prefix().to_string(), s.namespace().to_string())),
        )
        .collect()
}

fn declared_prefix(key: &str) -> Option<&str> {
    if key == "xmlns" {
        Some("")
    } else {
        key.strip_prefix("xmlns:")
    }
}

fn schema_locations() -> String {
    let mut locations = vec![GPX_NAMESPACE, GPX_SCHEMA_LOCATION];
    for schema in Schema::ALL {
        locations.push(schema.namespace());
        locations.push(schema.schema_location());
    }
    locations.join(" ")
}
