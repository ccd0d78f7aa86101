pub mod convert;
pub mod converter;
pub mod error;
pub mod extensions;
pub mod geometry;
pub mod gpx_types;
pub mod model;
pub mod options;
pub mod parser;
pub mod writer;

use geojson::FeatureCollection;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use wasm_bindgen::prelude::*;

use crate::convert::{export_features, import_document, FeatureError, ImportOutcome};
use crate::error::{CodecError, Result as CodecResult};
use crate::model::Feature;
use crate::options::{ExportSettings, ImportSettings};

/// Parse GPX text into features.
pub fn gpx_to_features(gpx: &str, settings: &ImportSettings) -> CodecResult<ImportOutcome> {
    let doc = parser::parse_gpx(gpx)?;
    Ok(import_document(&doc, settings))
}

/// Serialise features as GPX text. Features that fail to convert are
/// logged and left out.
pub fn features_to_gpx(features: &[Feature], settings: &ExportSettings) -> CodecResult<String> {
    let outcome = export_features(features, settings);
    for error in &outcome.errors {
        tracing::warn!("Not exported: {}", error);
    }
    writer::write_gpx(&outcome.document)
}

/// Convert GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let settings: ImportSettings = parse_options(options)?;
    let fc = gpx_to_feature_collection(gpx_string, &settings)?;
    serde_wasm_bindgen::to_value(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert GPX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = gpxToGeoJsonString)]
pub fn gpx_to_geojson_string(gpx_string: &str, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let settings: ImportSettings = parse_options(options)?;
    let fc = gpx_to_feature_collection(gpx_string, &settings)?;
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert a GeoJSON FeatureCollection string to GPX.
#[wasm_bindgen(js_name = geoJsonToGpx)]
pub fn geojson_to_gpx(geojson_string: &str, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let settings: ExportSettings = parse_options(options)?;
    Ok(geojson_string_to_gpx(geojson_string, &settings)?)
}

/// GPX text to a GeoJSON FeatureCollection. Per-feature failures are
/// listed in an `errors` foreign member.
pub fn gpx_to_feature_collection(
    gpx: &str,
    settings: &ImportSettings,
) -> CodecResult<FeatureCollection> {
    let outcome = gpx_to_features(gpx, settings)?;
    let mut fc = converter::to_feature_collection(&outcome.features)?;
    fc.foreign_members = errors_member(&outcome.errors);
    Ok(fc)
}

/// GeoJSON FeatureCollection text to GPX text.
pub fn geojson_string_to_gpx(geojson: &str, settings: &ExportSettings) -> CodecResult<String> {
    let parsed: geojson::GeoJson = geojson.parse()?;
    let fc = FeatureCollection::try_from(parsed)?;
    let outcome = converter::from_feature_collection(&fc);
    if outcome.features.is_empty() && !outcome.errors.is_empty() {
        return Err(CodecError::UnsupportedFeature(format!(
            "none of {} feature(s) could be read",
            outcome.errors.len()
        )));
    }
    features_to_gpx(&outcome.features, settings)
}

fn errors_member(errors: &[FeatureError]) -> Option<Map<String, JsonValue>> {
    if errors.is_empty() {
        return None;
    }
    let list = errors
        .iter()
        .map(|e| {
            let mut entry = Map::new();
            if let Some(kind) = e.kind {
                entry.insert(
                    "featureType".to_string(),
                    JsonValue::String(kind.as_str().to_string()),
                );
            }
            entry.insert("index".to_string(), JsonValue::from(e.index));
            entry.insert("message".to_string(), JsonValue::String(e.error.to_string()));
            JsonValue::Object(entry)
        })
        .collect();
    let mut members = Map::new();
    members.insert("errors".to_string(), JsonValue::Array(list));
    Some(members)
}

fn parse_options<T: DeserializeOwned + Default>(options: JsValue) -> Result<T, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
