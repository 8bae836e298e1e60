//! Zipped shapefile decoder.
//!
//! The archive may hold several shapefiles; entries are paired by their path without
//! extension. Each `.shp` is required, the matching `.dbf` supplies attributes when present.
//! `.shx` and `.prj` entries are accepted but not interpreted: coordinates are returned as
//! stored.

use std::io::{Cursor, Read};

use geojson::{FeatureCollection, JsonObject};
use shapefile::dbase::{FieldValue, Record};

use crate::error::{DecodeError, DecodeResult};
use crate::ingestion::{Decoder, ParserOptions};
use crate::types::{Payload, PayloadKind};

use super::{collection, feature, from_geo};

/// Default decoder for `.zip` shapefile archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileDecoder;

impl Decoder for ShapefileDecoder {
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Binary
    }

    fn decode(&self, payload: Payload<'_>, _options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        decode_shapefile_zip(payload.as_bytes())
    }
}

#[derive(Debug, Default)]
struct Components {
    stem: String,
    shp: Option<Vec<u8>>,
    dbf: Option<Vec<u8>>,
}

/// Decode every shapefile found in a zip archive into one collection.
pub fn decode_shapefile_zip(bytes: &[u8]) -> DecodeResult<FeatureCollection> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut sets: Vec<Components> = Vec::new();

    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_ascii_lowercase();
        let Some((stem, ext)) = name.rsplit_once('.') else {
            continue;
        };
        if ext != "shp" && ext != "dbf" {
            continue;
        }
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;

        let set = match sets.iter().position(|s| s.stem == stem) {
            Some(pos) => &mut sets[pos],
            None => {
                sets.push(Components {
                    stem: stem.to_owned(),
                    ..Components::default()
                });
                let last = sets.len() - 1;
                &mut sets[last]
            }
        };
        if ext == "shp" {
            set.shp = Some(content);
        } else {
            set.dbf = Some(content);
        }
    }

    if !sets.iter().any(|s| s.shp.is_some()) {
        return Err(DecodeError::Document {
            format: "shapefile",
            message: "archive contains no .shp file".to_string(),
        });
    }

    let mut features = Vec::new();
    for set in sets {
        let Some(shp) = set.shp else {
            tracing::debug!(stem = %set.stem, "Attribute table without geometry skipped");
            continue;
        };
        let shapes = shapefile::ShapeReader::new(Cursor::new(shp))?.read()?;
        let records = match set.dbf {
            Some(dbf) => read_records(dbf)?,
            None => Vec::new(),
        };
        let mut records = records.into_iter();

        for shape in shapes {
            let geometry = geo::Geometry::<f64>::try_from(shape).ok().map(|g| from_geo(&g));
            let properties = records.next().map(record_properties).unwrap_or_default();
            features.push(feature(geometry, properties));
        }
    }

    Ok(collection(features))
}

fn read_records(dbf: Vec<u8>) -> DecodeResult<Vec<Record>> {
    shapefile::dbase::Reader::new(Cursor::new(dbf))
        .and_then(|mut reader| reader.read())
        .map_err(|e| DecodeError::Document {
            format: "dbf",
            message: e.to_string(),
        })
}

fn record_properties(record: Record) -> JsonObject {
    let mut props = JsonObject::new();
    for (name, value) in record {
        props.insert(name, field_value(value));
    }
    props
}

fn field_value(value: FieldValue) -> serde_json::Value {
    use serde_json::Value;

    match value {
        FieldValue::Character(Some(s)) => Value::String(s.trim_end().to_owned()),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) => number(n),
        FieldValue::Float(Some(n)) => number(f64::from(n)),
        FieldValue::Integer(n) => Value::from(n),
        FieldValue::Logical(Some(b)) => Value::Bool(b),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None) => Value::Null,
        other => Value::String(format!("{other:?}")),
    }
}

fn number(n: f64) -> serde_json::Value {
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}
