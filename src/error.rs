use thiserror::Error;

/// Convenience result type for batch-level ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Convenience result type for format decoders.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Error returned by batch-level ingestion functions.
///
/// Per-file problems never surface here; they become an
/// [`crate::ingestion::IngestionOutcome`] instead. Only failures that affect the whole call do.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. a path handed to [`crate::types::RawFile::from_path`] is missing).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Packaging shapefile components into an archive failed and the configured policy
    /// aborts the batch.
    #[error("shapefile archive '{archive}' could not be built: {source}")]
    ArchiveSynthesis {
        archive: String,
        #[source]
        source: ArchiveSynthesisError,
    },

    /// Settings could not be parsed.
    #[error("invalid settings: {message}")]
    InvalidSettings { message: String },
}

/// Failure while packaging shapefile components into a zip archive.
#[derive(Debug, Error)]
pub enum ArchiveSynthesisError {
    /// The zip writer rejected an entry.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Reading a component or writing the archive buffer failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking task building the archive panicked or was cancelled.
    #[error("archive task failed: {0}")]
    Join(String),
}

/// Error produced by a format decoder for a malformed payload.
///
/// The pipeline converts every variant into a `ParseError` outcome for the offending file.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is JSON but not valid GeoJSON.
    #[error("geojson error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Payload is JSON but not a valid TopoJSON topology.
    #[error("topojson error: {message}")]
    TopoJson { message: String },

    /// CSV reader error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A required coordinate column is missing from the CSV header.
    #[error("missing {axis} column. headers={headers:?}")]
    MissingColumn { axis: &'static str, headers: Vec<String> },

    /// A coordinate could not be parsed.
    #[error("invalid coordinate at row {row} column '{column}': '{raw}'")]
    InvalidCoordinate {
        row: usize,
        column: String,
        raw: String,
    },

    /// WKT text could not be parsed or converted.
    #[error("wkt error: {0}")]
    Wkt(String),

    /// Encoded polyline could not be decoded.
    #[error("polyline error: {0}")]
    Polyline(String),

    /// Payload is not well-formed XML.
    #[error("xml error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// XML is well-formed but is not a usable KML/GPX document.
    #[error("{format} error: {message}")]
    Document { format: &'static str, message: String },

    /// Archive payload could not be opened or read.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Shapefile geometry could not be read.
    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// Reading an archive entry failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A text format received bytes that are not UTF-8.
    #[error("payload is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Parser options for the format are malformed.
    #[error("invalid parser options: {message}")]
    Options { message: String },

    /// The shapefile archive for this group could not be built.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveSynthesisError),

    /// The blocking decode task panicked.
    #[error("decoder task failed: {0}")]
    Task(String),

    /// Free-form failure, mostly useful for custom decoders.
    #[error("{0}")]
    Other(String),
}

impl DecodeError {
    /// Build a [`DecodeError::Other`] from any message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
