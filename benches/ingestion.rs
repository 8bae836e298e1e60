//! Criterion benchmarks for batch ingestion.
//!
//! Measures a mixed batch (GeoJSON, CSV, WKT, loose shapefile parts) at growing batch sizes,
//! plus the CSV decoder on its own.
//!
//! ```bash
//! cargo bench --bench ingestion
//! ```

use std::fmt::Write as _;
use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geofile_ingest::decoders::csv::{decode_csv_str, CsvOptions};
use geofile_ingest::ingestion::Ingestor;
use geofile_ingest::types::RawFile;
use shapefile::{Point, ShapeWriter};

const BATCH_SIZES: &[usize] = &[4, 16, 64];

fn csv_rows(rows: usize) -> String {
    let mut out = String::from("name,lat,lon,kind\n");
    for i in 0..rows {
        let _ = writeln!(out, "stop-{i},{},{},bus", 52.0 + i as f64 * 1e-4, 4.0 + i as f64 * 1e-4);
    }
    out
}

fn geojson_points(n: usize) -> String {
    let features: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[{},{}]}},"properties":{{"i":{i}}}}}"#,
                4.0 + i as f64 * 1e-3,
                52.0 + i as f64 * 1e-3
            )
        })
        .collect();
    format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(","))
}

fn point_shp(n: usize) -> Vec<u8> {
    let mut shp = Cursor::new(Vec::new());
    {
        let mut writer = ShapeWriter::new(&mut shp);
        for i in 0..n {
            writer.write_shape(&Point::new(i as f64, i as f64)).expect("write point");
        }
    }
    shp.into_inner()
}

fn mixed_batch(size: usize) -> Vec<RawFile> {
    let geojson = geojson_points(200);
    let csv = csv_rows(200);
    let shp = point_shp(200);
    (0..size)
        .map(|i| match i % 4 {
            0 => RawFile::from_bytes(format!("f{i}.geojson"), geojson.clone()),
            1 => RawFile::from_bytes(format!("f{i}.csv"), csv.clone()),
            2 => RawFile::from_bytes(format!("f{i}.wkt"), "LINESTRING (0 0, 1 1, 2 1, 3 4)"),
            _ => RawFile::from_bytes(format!("shape{i}.shp"), shp.clone()),
        })
        .collect()
}

fn bench_mixed_batch(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let ingestor = Ingestor::default();

    let mut group = c.benchmark_group("mixed_batch");
    for &size in BATCH_SIZES {
        let files = mixed_batch(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &files, |b, files| {
            b.iter(|| {
                let outcomes = rt.block_on(ingestor.ingest(files.clone())).expect("ingest");
                black_box(outcomes)
            });
        });
    }
    group.finish();
}

fn bench_csv_decoder(c: &mut Criterion) {
    let text = csv_rows(5_000);
    let options = CsvOptions::default();
    c.bench_function("csv_decode_5000_rows", |b| {
        b.iter(|| black_box(decode_csv_str(black_box(&text), &options).expect("decode")))
    });
}

criterion_group!(benches, bench_mixed_batch, bench_csv_decoder);
criterion_main!(benches);
