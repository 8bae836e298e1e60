//! Core data model types for ingestion.
//!
//! A batch is a list of [`RawFile`]s. Each one is classified into a [`FormatKey`] and its
//! content is handed to a decoder as a [`Payload`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::IngestionResult;

/// Where the bytes of a [`RawFile`] live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Content already held in memory (drag-and-drop, tests, synthesized archives).
    Memory(Arc<[u8]>),
    /// Content read from disk when the file is dispatched.
    Path(PathBuf),
}

/// An opaque named blob received from the host (file picker, drop zone, disk).
///
/// Immutable once created; cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    name: String,
    size: u64,
    source: FileSource,
}

impl RawFile {
    /// Create a file from in-memory content. The size is the content length.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            source: FileSource::Memory(Arc::from(bytes)),
        }
    }

    /// Create a file from in-memory content while reporting an explicit size.
    ///
    /// Hosts sometimes know the size of a blob before its content is materialized; size limits
    /// are enforced against the reported value.
    pub fn with_reported_size(name: impl Into<String>, size: u64, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            size,
            source: FileSource::Memory(Arc::from(bytes)),
        }
    }

    /// Reference a file on disk. Its metadata is read now, its content when dispatched.
    ///
    /// The file name is the final path component.
    pub async fn from_path(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            size: meta.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Reference a file on disk under an explicit name and size without touching the
    /// filesystem.
    pub fn with_path(name: impl Into<String>, size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size,
            source: FileSource::Path(path.into()),
        }
    }

    /// File name including its extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Where the content comes from.
    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Load the full content.
    pub async fn read_bytes(&self) -> std::io::Result<Arc<[u8]>> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(Arc::clone(bytes)),
            FileSource::Path(path) => Ok(Arc::from(tokio::fs::read(path).await?)),
        }
    }

    /// Synchronous variant of [`Self::read_bytes`], used from blocking tasks.
    pub fn read_bytes_blocking(&self) -> std::io::Result<Arc<[u8]>> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(Arc::clone(bytes)),
            FileSource::Path(path) => Ok(Arc::from(std::fs::read(path)?)),
        }
    }
}

/// Canonical tag identifying the format of a file.
///
/// Derived from the file extension by [`crate::ingestion::classify`]. [`FormatKey::Custom`]
/// is only produced for extensions that have a registered decoder override.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FormatKey {
    /// GeoJSON (`.geojson`, `.json`).
    GeoJson,
    /// Keyhole Markup Language (`.kml`).
    Kml,
    /// Zipped KML (`.kmz`).
    Kmz,
    /// Delimited text with latitude/longitude columns (`.csv`).
    Csv,
    /// Well-known text geometry (`.wkt`).
    Wkt,
    /// GPS exchange format (`.gpx`).
    Gpx,
    /// TopoJSON topology (`.topojson`).
    TopoJson,
    /// Encoded polyline (`.polyline`).
    Polyline,
    /// Zip archive holding shapefile components (`.zip`).
    ShapefileArchive,
    /// Extension registered through a decoder override (lower-case, without dot).
    Custom(String),
    /// No decoder applies.
    Unknown,
}

impl FormatKey {
    /// All built-in keys that have a default decoder.
    pub const BUILT_IN: [FormatKey; 9] = [
        Self::GeoJson,
        Self::Kml,
        Self::Kmz,
        Self::Csv,
        Self::Wkt,
        Self::Gpx,
        Self::TopoJson,
        Self::Polyline,
        Self::ShapefileArchive,
    ];

    /// Short stable name, also used as configuration key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::GeoJson => "geojson",
            Self::Kml => "kml",
            Self::Kmz => "kmz",
            Self::Csv => "csv",
            Self::Wkt => "wkt",
            Self::Gpx => "gpx",
            Self::TopoJson => "topojson",
            Self::Polyline => "polyline",
            Self::ShapefileArchive => "shapefile",
            Self::Custom(ext) => ext.as_str(),
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FormatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatKey {
    type Err = std::convert::Infallible;

    /// Parse a configuration key. Unrecognized names become [`FormatKey::Custom`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().trim_start_matches('.').to_ascii_lowercase();
        Ok(match lower.as_str() {
            "geojson" => Self::GeoJson,
            "kml" => Self::Kml,
            "kmz" => Self::Kmz,
            "csv" => Self::Csv,
            "wkt" => Self::Wkt,
            "gpx" => Self::Gpx,
            "topojson" => Self::TopoJson,
            "polyline" => Self::Polyline,
            "shapefile" | "shapefile-archive" => Self::ShapefileArchive,
            "unknown" | "" => Self::Unknown,
            _ => Self::Custom(lower),
        })
    }
}

impl TryFrom<String> for FormatKey {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FormatKey> for String {
    fn from(value: FormatKey) -> Self {
        value.as_str().to_owned()
    }
}

/// Whether a decoder wants its payload as text or bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// UTF-8 text; the pipeline validates the encoding before decoding.
    Text,
    /// Raw bytes (archives).
    Binary,
}

/// File content handed to a decoder.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// UTF-8 text content.
    Text(&'a str),
    /// Raw byte content.
    Bytes(&'a [u8]),
}

impl<'a> Payload<'a> {
    /// Content as bytes, whatever the variant.
    pub fn as_bytes(&self) -> &'a [u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }

    /// Content as text, validating UTF-8 for byte payloads.
    pub fn as_text(&self) -> Result<&'a str, std::str::Utf8Error> {
        match self {
            Self::Text(s) => Ok(s),
            Self::Bytes(b) => std::str::from_utf8(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_key_parses_config_names() {
        assert_eq!("CSV".parse::<FormatKey>().unwrap(), FormatKey::Csv);
        assert_eq!("shapefile".parse::<FormatKey>().unwrap(), FormatKey::ShapefileArchive);
        assert_eq!(".xyz".parse::<FormatKey>().unwrap(), FormatKey::Custom("xyz".to_string()));
        assert_eq!("".parse::<FormatKey>().unwrap(), FormatKey::Unknown);
    }

    #[test]
    fn format_key_serializes_as_plain_string() {
        let json = serde_json::to_string(&FormatKey::TopoJson).unwrap();
        assert_eq!(json, "\"topojson\"");
        let back: FormatKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FormatKey::TopoJson);
    }

    #[test]
    fn raw_file_reports_content_length() {
        let f = RawFile::from_bytes("a.geojson", b"{}".to_vec());
        assert_eq!(f.name(), "a.geojson");
        assert_eq!(f.size(), 2);
    }
}
