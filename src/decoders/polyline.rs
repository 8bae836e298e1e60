//! Encoded polyline decoder (Google polyline algorithm).

use geojson::{FeatureCollection, JsonObject};
use serde::Deserialize;

use crate::error::{DecodeError, DecodeResult};
use crate::ingestion::{Decoder, ParserOptions};
use crate::types::Payload;

use super::{collection, feature, from_geo};

/// Options understood by the polyline decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PolylineOptions {
    /// Number of decimal digits encoded. Defaults to 5.
    #[serde(default = "default_precision")]
    pub precision: u32,
}

impl Default for PolylineOptions {
    fn default() -> Self {
        Self {
            precision: default_precision(),
        }
    }
}

fn default_precision() -> u32 {
    5
}

/// Default decoder for `.polyline`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolylineDecoder;

impl Decoder for PolylineDecoder {
    fn decode(&self, payload: Payload<'_>, options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        let opts: PolylineOptions = options.parse()?;
        decode_polyline_str(payload.as_text()?, opts)
    }
}

/// Decode an encoded polyline into one LineString feature. An empty polyline yields no
/// features.
pub fn decode_polyline_str(input: &str, options: PolylineOptions) -> DecodeResult<FeatureCollection> {
    let encoded = input.trim();
    if encoded.is_empty() {
        return Ok(collection(Vec::new()));
    }
    let line = polyline::decode_polyline(encoded, options.precision)
        .map_err(|e| DecodeError::Polyline(e.to_string()))?;
    if line.0.is_empty() {
        return Ok(collection(Vec::new()));
    }
    let geometry = geo::Geometry::LineString(line);
    Ok(collection(vec![feature(Some(from_geo(&geometry)), JsonObject::new())]))
}

#[cfg(test)]
mod tests {
    use geojson::Value as GeoJsonValue;

    use super::*;

    #[test]
    fn decodes_reference_polyline() {
        let fc = decode_polyline_str("_p~iF~ps|U_ulLnnqC_mqNvxq`@", PolylineOptions::default()).unwrap();
        assert_eq!(fc.features.len(), 1);
        match &fc.features[0].geometry.as_ref().unwrap().value {
            GeoJsonValue::LineString(coords) => {
                assert_eq!(coords.len(), 3);
                assert!((coords[0][0] - -120.2).abs() < 1e-9);
                assert!((coords[0][1] - 38.5).abs() < 1e-9);
            }
            other => panic!("expected linestring, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_has_no_features() {
        let fc = decode_polyline_str("  \n", PolylineOptions::default()).unwrap();
        assert!(fc.features.is_empty());
    }

    #[test]
    fn precision_option_parses() {
        let opts: PolylineOptions = ParserOptions::new().with("precision", 6).parse().unwrap();
        assert_eq!(opts.precision, 6);
        let defaulted: PolylineOptions = ParserOptions::new().parse().unwrap();
        assert_eq!(defaulted.precision, 5);
    }
}
