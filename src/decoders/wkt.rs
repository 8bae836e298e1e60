//! WKT decoder.
//!
//! A payload whose non-empty lines each parse as a geometry yields one feature per line;
//! otherwise the whole payload is parsed as a single (possibly multi-line) geometry.

use geojson::{FeatureCollection, JsonObject};
use wkt::TryFromWkt;

use crate::error::{DecodeError, DecodeResult};
use crate::ingestion::{Decoder, ParserOptions};
use crate::types::Payload;

use super::{collection, feature, from_geo};

/// Default decoder for `.wkt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WktDecoder;

impl Decoder for WktDecoder {
    fn decode(&self, payload: Payload<'_>, _options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        decode_wkt_str(payload.as_text()?)
    }
}

/// Parse WKT text into features.
pub fn decode_wkt_str(input: &str) -> DecodeResult<FeatureCollection> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(collection(Vec::new()));
    }

    let lines: Vec<&str> = trimmed.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() > 1 {
        let per_line: Result<Vec<_>, String> = lines.iter().map(|line| parse_one(line)).collect();
        if let Ok(geometries) = per_line {
            return Ok(collection(
                geometries
                    .iter()
                    .map(|g| feature(Some(from_geo(g)), JsonObject::new()))
                    .collect(),
            ));
        }
    }

    let geometry = parse_one(trimmed).map_err(DecodeError::Wkt)?;
    Ok(collection(vec![feature(Some(from_geo(&geometry)), JsonObject::new())]))
}

fn parse_one(text: &str) -> Result<geo::Geometry<f64>, String> {
    geo::Geometry::<f64>::try_from_wkt_str(text).map_err(|e| e.to_string())
}
