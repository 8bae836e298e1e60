//! GeoJSON decoder.
//!
//! Accepts a FeatureCollection, a single Feature, or a bare Geometry. The latter two are
//! wrapped into a collection.

use geojson::{FeatureCollection, GeoJson, JsonObject};

use crate::error::DecodeResult;
use crate::ingestion::{Decoder, ParserOptions};
use crate::types::Payload;

use super::{collection, feature};

/// Default decoder for `.geojson` / `.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonDecoder;

impl Decoder for GeoJsonDecoder {
    fn decode(&self, payload: Payload<'_>, _options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        decode_geojson_str(payload.as_text()?)
    }
}

/// Parse GeoJSON text into a feature collection.
pub fn decode_geojson_str(input: &str) -> DecodeResult<FeatureCollection> {
    let parsed: GeoJson = input.trim().parse()?;
    Ok(match parsed {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(f) => collection(vec![f]),
        GeoJson::Geometry(g) => collection(vec![feature(Some(g), JsonObject::new())]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_collection_passes_through() {
        let fc = decode_geojson_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"name":"a"},"geometry":{"type":"Point","coordinates":[1,2]}},
                {"type":"Feature","properties":{},"geometry":null}
            ]}"#,
        )
        .unwrap();
        assert_eq!(fc.features.len(), 2);
        assert_eq!(fc.features[0].property("name").and_then(|v| v.as_str()), Some("a"));
    }

    #[test]
    fn bare_geometry_is_wrapped() {
        let fc = decode_geojson_str(r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#).unwrap();
        assert_eq!(fc.features.len(), 1);
        assert!(fc.features[0].geometry.is_some());
    }

    #[test]
    fn empty_collection_is_not_an_error() {
        let fc = decode_geojson_str(r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert!(fc.features.is_empty());
    }

    #[test]
    fn malformed_json_fails() {
        assert!(decode_geojson_str("{\"type\": ").is_err());
        assert!(decode_geojson_str(r#"{"type":"Nope"}"#).is_err());
    }
}
