mod common;

use std::sync::Arc;

use geofile_ingest::ingestion::{
    CompositeObserver, FileObserver, IngestionObserver, IngestionSeverity, Ingestor, TracingObserver,
};
use geofile_ingest::types::RawFile;

use common::{text_file, RecordingObserver, POINT_FEATURE};

fn mixed_batch() -> Vec<RawFile> {
    vec![
        text_file("a.geojson", POINT_FEATURE),
        text_file("b.xyz", ""),
        text_file("c.csv", "name,lat,lon\nX,north,1\n"),
        text_file("d.kml", "<kml/>"),
        RawFile::with_reported_size("e.gpx", 10_000, b"<gpx/>".to_vec()),
    ]
}

#[tokio::test]
async fn observer_receives_callbacks_in_outcome_order() {
    let obs = Arc::new(RecordingObserver::default());
    let ingestor = Ingestor::builder()
        .size_limit_bytes(1_000)
        .observer(obs.clone())
        .build();

    ingestor.ingest(mixed_batch()).await.unwrap();

    assert_eq!(
        obs.events(),
        vec![
            "loaded:a.geojson",
            "unsupported:b.xyz",
            "parse_error:c.csv",
            "empty:d.kml",
            "too_large:e.gpx",
        ]
    );
}

#[tokio::test]
async fn alerts_respect_threshold() {
    let obs = Arc::new(RecordingObserver::default());
    let ingestor = Ingestor::builder()
        .size_limit_bytes(1_000)
        .observer(obs.clone())
        .alert_at_or_above(IngestionSeverity::Error)
        .build();

    ingestor.ingest(mixed_batch()).await.unwrap();

    assert_eq!(obs.alerts(), vec![("c.csv".to_string(), IngestionSeverity::Error)]);
}

#[tokio::test]
async fn default_threshold_only_alerts_on_critical() {
    let obs = Arc::new(RecordingObserver::default());
    let ingestor = Ingestor::builder().observer(obs.clone()).build();

    let mut files = mixed_batch();
    files.push(RawFile::with_path("gone.kml", 5, "/definitely/not/here/gone.kml"));
    ingestor.ingest(files).await.unwrap();

    assert_eq!(obs.alerts(), vec![("gone.kml".to_string(), IngestionSeverity::Critical)]);
}

#[tokio::test]
async fn composite_fans_out_to_every_observer() {
    let first = Arc::new(RecordingObserver::default());
    let second = Arc::new(RecordingObserver::default());
    let composite = CompositeObserver::new(vec![
        first.clone() as Arc<dyn IngestionObserver>,
        second.clone(),
        Arc::new(TracingObserver),
    ]);
    let ingestor = Ingestor::builder().observer(Arc::new(composite)).build();

    ingestor
        .ingest(vec![text_file("a.geojson", POINT_FEATURE), text_file("b.xyz", "")])
        .await
        .unwrap();

    assert_eq!(first.events(), second.events());
    assert_eq!(first.events().len(), 2);
}

#[tokio::test]
async fn file_observer_appends_one_line_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("ingest.log");
    let ingestor = Ingestor::builder()
        .observer(Arc::new(FileObserver::new(&log)))
        .alert_at_or_above(IngestionSeverity::Error)
        .build();

    ingestor
        .ingest(vec![
            text_file("a.geojson", POINT_FEATURE),
            text_file("c.csv", "name,lat,lon\nX,north,1\n"),
        ])
        .await
        .unwrap();

    let text = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3, "{text}");
    assert!(lines[0].contains("loaded format=geojson file=a.geojson features=1"));
    assert!(lines[1].contains("parse_error format=csv file=c.csv"));
    assert!(lines[2].contains("ALERT severity=Error kind=parse_error file=c.csv"));
}
