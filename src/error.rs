use wasm_bindgen::JsValue;

use crate::geometry::GeometryType;
use crate::model::FeatureKind;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML write error: {0}")]
    XmlWrite(String),

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("Missing position")]
    MissingPosition,

    #[error("{kind} requires {expected} geometry, got {actual}")]
    GeometryMismatch {
        kind: FeatureKind,
        expected: GeometryType,
        actual: GeometryType,
    },

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<geojson::Error> for CodecError {
    fn from(e: geojson::Error) -> Self {
        Self::GeoJson(Box::new(e))
    }
}

impl From<CodecError> for JsValue {
    fn from(e: CodecError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
