//! CSV decoder: one point feature per row.
//!
//! Rules:
//!
//! - The CSV must have headers.
//! - Latitude/longitude columns come from the `latfield` / `lonfield` options, or are detected
//!   by header name (case-insensitive).
//! - Every other column becomes a string property.
//! - Any row with a missing or non-numeric coordinate fails the whole file.

use geojson::{FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};
use serde::Deserialize;

use crate::error::{DecodeError, DecodeResult};
use crate::ingestion::{Decoder, ParserOptions};
use crate::types::Payload;

use super::{collection, feature};

const LAT_NAMES: [&str; 3] = ["lat", "latitude", "y"];
const LON_NAMES: [&str; 5] = ["lon", "lng", "long", "longitude", "x"];

/// Options understood by the CSV decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CsvOptions {
    /// Field delimiter; a single byte. Defaults to `,`.
    #[serde(default)]
    pub delimiter: Option<String>,
    /// Header of the latitude column.
    #[serde(default, alias = "latField")]
    pub latfield: Option<String>,
    /// Header of the longitude column.
    #[serde(default, alias = "lonField")]
    pub lonfield: Option<String>,
}

impl CsvOptions {
    fn delimiter_byte(&self) -> DecodeResult<u8> {
        match self.delimiter.as_deref() {
            None => Ok(b','),
            Some("\\t" | "tab") => Ok(b'\t'),
            Some(d) if d.len() == 1 => Ok(d.as_bytes()[0]),
            Some(d) => Err(DecodeError::Options {
                message: format!("csv delimiter must be a single byte, got '{d}'"),
            }),
        }
    }
}

/// Default decoder for `.csv`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvDecoder;

impl Decoder for CsvDecoder {
    fn decode(&self, payload: Payload<'_>, options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        let opts: CsvOptions = options.parse()?;
        decode_csv_str(payload.as_text()?, &opts)
    }
}

/// Parse CSV text into point features.
pub fn decode_csv_str(input: &str, options: &CsvOptions) -> DecodeResult<FeatureCollection> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter_byte()?)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
    let lat_idx = find_column(&headers, options.latfield.as_deref(), &LAT_NAMES)
        .ok_or_else(|| DecodeError::MissingColumn {
            axis: "latitude",
            headers: headers.clone(),
        })?;
    let lon_idx = find_column(&headers, options.lonfield.as_deref(), &LON_NAMES)
        .ok_or_else(|| DecodeError::MissingColumn {
            axis: "longitude",
            headers: headers.clone(),
        })?;

    let mut features = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based, +1 again because the header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        let lat = parse_coordinate(user_row, &headers[lat_idx], record.get(lat_idx))?;
        let lon = parse_coordinate(user_row, &headers[lon_idx], record.get(lon_idx))?;

        let mut properties = JsonObject::new();
        for (idx, header) in headers.iter().enumerate() {
            if idx == lat_idx || idx == lon_idx {
                continue;
            }
            let value = record.get(idx).unwrap_or("");
            properties.insert(header.clone(), serde_json::Value::String(value.to_owned()));
        }

        let geometry = Geometry::new(GeoJsonValue::Point(vec![lon, lat]));
        features.push(feature(Some(geometry), properties));
    }

    Ok(collection(features))
}

fn find_column(headers: &[String], explicit: Option<&str>, candidates: &[&str]) -> Option<usize> {
    match explicit {
        Some(name) => headers.iter().position(|h| h == name),
        None => headers
            .iter()
            .position(|h| candidates.contains(&h.to_ascii_lowercase().as_str())),
    }
}

fn parse_coordinate(row: usize, column: &str, raw: Option<&str>) -> DecodeResult<f64> {
    let raw = raw.unwrap_or("");
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DecodeError::InvalidCoordinate {
            row,
            column: column.to_owned(),
            raw: raw.to_owned(),
        })
}
