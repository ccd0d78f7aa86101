//! The extension bag attached to GPX points, routes and tracks.
//!
//! An [`Extensions`] value is an ordered list of tagged [`Extension`]s. Known
//! vendor blocks are decoded into typed values as they are parsed; anything
//! else is kept as a raw [`XmlElement`] so it survives a re-export. Lookup is
//! by type through [`ExtensionType`], with an optional preferred schema for
//! blocks that exist in more than one schema version.

mod garmin;
mod xml;

pub use garmin::{
    format_xsd_duration, parse_xsd_duration, CreationTimeExtension, RouteExtension,
    RoutePointExtension, TrackExtension, TripExtension, ViaPointExtension, WaypointExtension,
    DISPLAY_MODE_SYMBOL_AND_NAME,
};
pub use xml::XmlElement;

pub(crate) use garmin::format_time;

/// Vendor schemas the codec reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    /// Garmin GPX extensions v3 (waypoint, route, route point, track).
    GpxxV3,
    /// Garmin waypoint extension v1, the legacy address/phone schema.
    WptxV1,
    /// Garmin trip extensions v1 (transportation mode, via points).
    TripV1,
    CreationTimeV1,
}

impl Schema {
    pub const ALL: [Schema; 4] = [
        Schema::GpxxV3,
        Schema::WptxV1,
        Schema::TripV1,
        Schema::CreationTimeV1,
    ];

    pub fn namespace(&self) -> &'static str {
        match self {
            Self::GpxxV3 => "http://www.garmin.com/xmlschemas/GpxExtensions/v3",
            Self::WptxV1 => "http://www.garmin.com/xmlschemas/WaypointExtension/v1",
            Self::TripV1 => "http://www.garmin.com/xmlschemas/TripExtensions/v1",
            Self::CreationTimeV1 => "http://www.garmin.com/xmlschemas/CreationTimeExtension/v1",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::GpxxV3 => "gpxx",
            Self::WptxV1 => "wptx1",
            Self::TripV1 => "trp",
            Self::CreationTimeV1 => "ctx",
        }
    }

    pub fn schema_location(&self) -> &'static str {
        match self {
            Self::GpxxV3 => "http://www8.garmin.com/xmlschemas/GpxExtensionsv3.xsd",
            Self::WptxV1 => "http://www8.garmin.com/xmlschemas/WaypointExtensionv1.xsd",
            Self::TripV1 => "http://www.garmin.com/xmlschemas/TripExtensionsv1.xsd",
            Self::CreationTimeV1 => {
                "http://www.garmin.com/xmlschemas/CreationTimeExtensionsv1.xsd"
            }
        }
    }

    /// Schema of an element, by namespace URI or, when the prefix was never
    /// declared, by the conventional prefix.
    pub fn of(element: &XmlElement) -> Option<Self> {
        match element.namespace.as_deref() {
            Some(uri) => Self::ALL.into_iter().find(|s| s.namespace() == uri),
            None => {
                let prefix = element.prefix.as_deref()?;
                Self::ALL.into_iter().find(|s| s.prefix() == prefix)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extension {
    Waypoint(WaypointExtension),
    CreationTime(CreationTimeExtension),
    Route(RouteExtension),
    RoutePoint(RoutePointExtension),
    Track(TrackExtension),
    Trip(TripExtension),
    ViaPoint(ViaPointExtension),
    Other(XmlElement),
}

impl Extension {
    /// Decode a captured element into a typed extension when it belongs to
    /// a known schema; otherwise keep it raw.
    pub fn from_element(element: XmlElement) -> Self {
        let decoded = match (Schema::of(&element), element.name.as_str()) {
            (Some(schema @ (Schema::GpxxV3 | Schema::WptxV1)), "WaypointExtension") => {
                Some(Self::Waypoint(WaypointExtension::decode(&element, schema)))
            }
            (Some(Schema::CreationTimeV1), "CreationTimeExtension") => {
                CreationTimeExtension::decode(&element).map(Self::CreationTime)
            }
            (Some(Schema::GpxxV3), "RouteExtension") => {
                Some(Self::Route(RouteExtension::decode(&element)))
            }
            (Some(Schema::GpxxV3), "RoutePointExtension") => {
                Some(Self::RoutePoint(RoutePointExtension::decode(&element)))
            }
            (Some(Schema::GpxxV3), "TrackExtension") => {
                Some(Self::Track(TrackExtension::decode(&element)))
            }
            (Some(Schema::TripV1), "Trip") => Some(Self::Trip(TripExtension::decode(&element))),
            (Some(Schema::TripV1), "ViaPoint") => {
                Some(Self::ViaPoint(ViaPointExtension::decode(&element)))
            }
            _ => None,
        };
        decoded.unwrap_or(Self::Other(element))
    }

    pub fn to_element(&self) -> XmlElement {
        match self {
            Self::Waypoint(e) => e.encode(),
            Self::CreationTime(e) => e.encode(),
            Self::Route(e) => e.encode(),
            Self::RoutePoint(e) => e.encode(),
            Self::Track(e) => e.encode(),
            Self::Trip(e) => e.encode(),
            Self::ViaPoint(e) => e.encode(),
            Self::Other(e) => e.clone(),
        }
    }

    pub fn schema(&self) -> Option<Schema> {
        match self {
            Self::Waypoint(e) => Some(e.schema),
            Self::CreationTime(_) => Some(Schema::CreationTimeV1),
            Self::Route(_) | Self::RoutePoint(_) | Self::Track(_) => Some(Schema::GpxxV3),
            Self::Trip(_) | Self::ViaPoint(_) => Some(Schema::TripV1),
            Self::Other(e) => Schema::of(e),
        }
    }
}

/// A typed value that can live in an [`Extensions`] bag.
pub trait ExtensionType: Sized {
    fn from_extension(ext: &Extension) -> Option<&Self>;
    fn into_extension(self) -> Extension;
}

macro_rules! extension_type {
    ($ty:ty => $variant:ident) => {
        impl ExtensionType for $ty {
            fn from_extension(ext: &Extension) -> Option<&Self> {
                match ext {
                    Extension::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_extension(self) -> Extension {
                Extension::$variant(self)
            }
        }
    };
}

extension_type!(WaypointExtension => Waypoint);
extension_type!(CreationTimeExtension => CreationTime);
extension_type!(RouteExtension => Route);
extension_type!(RoutePointExtension => RoutePoint);
extension_type!(TrackExtension => Track);
extension_type!(TripExtension => Trip);
extension_type!(ViaPointExtension => ViaPoint);
extension_type!(XmlElement => Other);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extensions(Vec<Extension>);

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.0.iter()
    }

    pub fn push<T: ExtensionType>(&mut self, value: T) {
        self.0.push(value.into_extension());
    }

    /// Return the bag with `value` appended.
    pub fn attach<T: ExtensionType>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn find_first<T: ExtensionType>(&self) -> Option<&T> {
        self.0.iter().find_map(T::from_extension)
    }

    /// First `T` from `preferred`, falling back to the first `T` from any
    /// schema.
    pub fn find_first_preferring<T: ExtensionType>(&self, preferred: Schema) -> Option<&T> {
        self.0
            .iter()
            .filter(|ext| ext.schema() == Some(preferred))
            .find_map(T::from_extension)
            .or_else(|| self.find_first())
    }
}

impl FromIterator<Extension> for Extensions {
    fn from_iter<I: IntoIterator<Item = Extension>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Address;

    fn waypoint_ext(schema: Schema, city: &str) -> WaypointExtension {
        WaypointExtension {
            schema,
            address: Some(Address {
                city: Some(city.to_string()),
                ..Default::default()
            }),
            ..WaypointExtension::new(schema)
        }
    }

    #[test]
    fn test_find_first_by_type() {
        let bag = Extensions::new()
            .attach(TrackExtension {
                display_color: Some("Red".to_string()),
            })
            .attach(TripExtension {
                transportation_mode: Some("Walking".to_string()),
            });
        assert_eq!(bag.len(), 2);
        assert_eq!(
            bag.find_first::<TripExtension>()
                .and_then(|t| t.transportation_mode.as_deref()),
            Some("Walking")
        );
        assert!(bag.find_first::<RouteExtension>().is_none());
    }

    #[test]
    fn test_preferred_schema_wins_regardless_of_order() {
        let bag = Extensions::new()
            .attach(waypoint_ext(Schema::WptxV1, "Old"))
            .attach(waypoint_ext(Schema::GpxxV3, "New"));
        let found = bag
            .find_first_preferring::<WaypointExtension>(Schema::GpxxV3)
            .unwrap();
        assert_eq!(found.schema, Schema::GpxxV3);
    }

    #[test]
    fn test_preferred_schema_falls_back() {
        let bag = Extensions::new().attach(waypoint_ext(Schema::WptxV1, "Old"));
        let found = bag
            .find_first_preferring::<WaypointExtension>(Schema::GpxxV3)
            .unwrap();
        assert_eq!(found.schema, Schema::WptxV1);
    }

    #[test]
    fn test_unknown_element_kept_raw() {
        let el = XmlElement {
            namespace: Some("http://example.com/ext".to_string()),
            prefix: Some("ex".to_string()),
            name: "Thing".to_string(),
            ..Default::default()
        };
        let ext = Extension::from_element(el.clone());
        assert_eq!(ext, Extension::Other(el.clone()));
        assert_eq!(ext.to_element(), el);
        assert_eq!(ext.schema(), None);
    }

    #[test]
    fn test_schema_from_undeclared_prefix() {
        let el = XmlElement {
            prefix: Some("trp".to_string()),
            name: "Trip".to_string(),
            ..Default::default()
        };
        assert_eq!(Schema::of(&el), Some(Schema::TripV1));
        assert!(matches!(Extension::from_element(el), Extension::Trip(_)));
    }
}
