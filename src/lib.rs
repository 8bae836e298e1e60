//! `geofile-ingest` turns batches of user-supplied geodata files into map-ready layers.
//!
//! The primary entrypoint is [`ingestion::Ingestor`]: hand it a list of [`types::RawFile`]s and
//! it returns one [`ingestion::IngestionOutcome`] per logical file, in input order.
//!
//! ## What you can ingest
//!
//! **File formats (auto-detected by extension, case-insensitive):**
//!
//! - **GeoJSON**: `.geojson`, `.json`
//! - **TopoJSON**: `.topojson`
//! - **KML / KMZ**: `.kml`, `.kmz`
//! - **GPX**: `.gpx`
//! - **CSV** with latitude/longitude columns: `.csv`
//! - **WKT**: `.wkt`
//! - **Encoded polyline**: `.polyline`
//! - **Shapefile**: a `.zip` archive, or the loose `.shp/.shx/.dbf/.prj` components, which are
//!   grouped by base name and packed into `{base}.zip` before decoding
//!
//! Anything else is reported as `Unsupported` unless a decoder is registered for its extension.
//!
//! ## Outcomes
//!
//! - `Loaded`: the file decoded into a non-empty [`layer::GeoLayer`]
//! - `Empty`: decoded fine, zero features
//! - `TooLarge`: above the configured size limit, never decoded
//! - `Unsupported`: no decoder for the extension
//! - `ParseError`: recognized format, malformed content
//!
//! A bad file never fails the batch.
//!
//! ## Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use geofile_ingest::ingestion::{Ingestor, ParserOptions, TracingObserver};
//! use geofile_ingest::types::{FormatKey, RawFile};
//!
//! # async fn run() -> Result<(), geofile_ingest::IngestionError> {
//! let ingestor = Ingestor::builder()
//!     .size_limit_bytes(20 * 1024 * 1024)
//!     .parser_options(FormatKey::Csv, ParserOptions::new().with("delimiter", ";"))
//!     .observer(Arc::new(TracingObserver))
//!     .build();
//!
//! let files = vec![
//!     RawFile::from_bytes("stops.csv", "name;lat;lon\nA;52.1;4.3\n"),
//!     RawFile::from_path("town.shp").await?,
//!     RawFile::from_path("town.dbf").await?,
//! ];
//! for outcome in ingestor.ingest(files).await? {
//!     println!("{} -> {}", outcome.file_name(), outcome.kind());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom formats
//!
//! ```rust
//! use geofile_ingest::error::DecodeResult;
//! use geofile_ingest::ingestion::{Ingestor, ParserOptions};
//! use geofile_ingest::types::Payload;
//! use geojson::FeatureCollection;
//!
//! fn decode_xyz(payload: Payload<'_>, _: &ParserOptions) -> DecodeResult<FeatureCollection> {
//!     let _text = payload.as_text()?;
//!     Ok(FeatureCollection { bbox: None, features: Vec::new(), foreign_members: None })
//! }
//!
//! let ingestor = Ingestor::builder().decoder_for_extension("xyz", decode_xyz).build();
//! assert_ne!(ingestor.dispatch_table().resolve("points.xyz").to_string(), "unknown");
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: the pipeline, classification, shapefile grouping, dispatch, observers
//! - [`decoders`]: the built-in format decoders
//! - [`layer`]: the renderer contract and the default layer
//! - [`types`]: raw files, format keys and payloads
//! - [`error`]: error types used across ingestion

pub mod decoders;
pub mod error;
pub mod ingestion;
pub mod layer;
pub mod types;

pub use error::{DecodeError, DecodeResult, IngestionError, IngestionResult};
