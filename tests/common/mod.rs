#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use geofile_ingest::decoders::geojson::decode_geojson_str;
use geofile_ingest::error::DecodeResult;
use geofile_ingest::ingestion::{
    Decoder, IngestionContext, IngestionObserver, IngestionOutcome, IngestionSeverity, LoadedLayer, ParserOptions,
};
use geofile_ingest::types::{Payload, RawFile};
use geofile_ingest::DecodeError;
use geojson::FeatureCollection;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, ShapeWriter, Writer};
use zip::write::SimpleFileOptions;

pub const POINT_FEATURE: &str =
    r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[4.9,52.37]},"properties":{"name":"a"}}"#;

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

pub fn text_file(name: &str, body: &str) -> RawFile {
    RawFile::from_bytes(name, body.as_bytes().to_vec())
}

/// GeoJSON decoder that counts its invocations.
#[derive(Debug, Default, Clone)]
pub struct CountingDecoder {
    pub calls: Arc<AtomicUsize>,
}

impl CountingDecoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Decoder for CountingDecoder {
    fn decode(&self, payload: Payload<'_>, _options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        decode_geojson_str(payload.as_text()?)
    }
}

/// Records every callback as `"{event}:{file}"`.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<String>>,
    pub alerts: Mutex<Vec<(String, IngestionSeverity)>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<(String, IngestionSeverity)> {
        self.alerts.lock().unwrap().clone()
    }

    fn push(&self, event: &str, ctx: &IngestionContext) {
        self.events.lock().unwrap().push(format!("{event}:{}", ctx.file_name));
    }
}

impl IngestionObserver for RecordingObserver {
    fn on_loaded(&self, ctx: &IngestionContext, _layer: &LoadedLayer) {
        self.push("loaded", ctx);
    }

    fn on_empty(&self, ctx: &IngestionContext) {
        self.push("empty", ctx);
    }

    fn on_too_large(&self, ctx: &IngestionContext, _size: u64, _limit: u64) {
        self.push("too_large", ctx);
    }

    fn on_unsupported(&self, ctx: &IngestionContext) {
        self.push("unsupported", ctx);
    }

    fn on_parse_error(&self, ctx: &IngestionContext, _error: &DecodeError) {
        self.push("parse_error", ctx);
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, _outcome: &IngestionOutcome) {
        self.alerts.lock().unwrap().push((ctx.file_name.clone(), severity));
    }
}

/// Shapefile components written with the `shapefile` crate.
pub struct PointShapefile {
    pub shp: Vec<u8>,
    pub shx: Vec<u8>,
    pub dbf: Vec<u8>,
}

impl PointShapefile {
    /// `{base}.shp`, `{base}.shx` and `{base}.dbf`, in that order.
    pub fn files(&self, base: &str) -> Vec<RawFile> {
        vec![
            RawFile::from_bytes(format!("{base}.shp"), self.shp.clone()),
            RawFile::from_bytes(format!("{base}.shx"), self.shx.clone()),
            RawFile::from_bytes(format!("{base}.dbf"), self.dbf.clone()),
        ]
    }
}

/// One point per `(name, x, y, population)` row, with a character `NAME` and a numeric `POP`
/// attribute.
pub fn point_shapefile(rows: &[(&str, f64, f64, f64)]) -> PointShapefile {
    let mut shp = Cursor::new(Vec::new());
    let mut shx = Cursor::new(Vec::new());
    let mut dbf = Cursor::new(Vec::new());
    {
        let table = TableWriterBuilder::new()
            .add_character_field(FieldName::try_from("NAME").unwrap(), 32)
            .add_numeric_field(FieldName::try_from("POP").unwrap(), 12, 2)
            .build_with_dest(&mut dbf);
        let mut writer = Writer::new(ShapeWriter::with_shx(&mut shp, &mut shx), table);
        for &(name, x, y, pop) in rows {
            let mut record = Record::default();
            record.insert("NAME".to_string(), FieldValue::Character(Some(name.to_string())));
            record.insert("POP".to_string(), FieldValue::Numeric(Some(pop)));
            writer.write_shape_and_record(&Point::new(x, y), &record).unwrap();
        }
    }
    PointShapefile {
        shp: shp.into_inner(),
        shx: shx.into_inner(),
        dbf: dbf.into_inner(),
    }
}

/// Points named `p0`, `p1`, ... with `POP` set to their index.
pub fn points_shapefile(points: &[(f64, f64)]) -> PointShapefile {
    let names: Vec<String> = (0..points.len()).map(|i| format!("p{i}")).collect();
    let rows: Vec<(&str, f64, f64, f64)> = points
        .iter()
        .zip(&names)
        .enumerate()
        .map(|(i, (&(x, y), name))| (name.as_str(), x, y, i as f64))
        .collect();
    point_shapefile(&rows)
}

/// In-memory zip holding `entries` in order.
pub fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
