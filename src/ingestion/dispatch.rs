//! Format dispatch table and the decoder contract.
//!
//! The table maps a [`FormatKey`] to the decoder responsible for it. It is built once from the
//! defaults plus any overrides, then shared read-only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use geojson::FeatureCollection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::decoders;
use crate::error::{DecodeError, DecodeResult};
use crate::types::{FormatKey, Payload, PayloadKind};

use super::classify::{classify, file_extension, is_shapefile_part};

/// Format-specific parser options (e.g. `{"delimiter": ";", "latfield": "LAT"}` for CSV).
///
/// Kept as an open JSON object so custom decoders can receive arbitrary settings. Built-in
/// decoders deserialize their own typed view with [`ParserOptions::parse`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParserOptions(serde_json::Map<String, serde_json::Value>);

impl ParserOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Raw option value.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// String option value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Whether no option is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserialize the options into a typed view.
    pub fn parse<T: DeserializeOwned>(&self) -> DecodeResult<T> {
        serde_json::from_value(serde_json::Value::Object(self.0.clone())).map_err(|e| {
            DecodeError::Options {
                message: e.to_string(),
            }
        })
    }
}

/// Converts a raw payload into a normalized feature collection.
///
/// Decoders are pure with respect to the pipeline: they own no shared state and may run
/// concurrently on the blocking pool.
pub trait Decoder: Send + Sync {
    /// Whether the payload should arrive as text or raw bytes.
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Text
    }

    /// Decode `payload`, failing with [`DecodeError`] on malformed input.
    fn decode(&self, payload: Payload<'_>, options: &ParserOptions) -> DecodeResult<FeatureCollection>;
}

impl<F> Decoder for F
where
    F: Fn(Payload<'_>, &ParserOptions) -> DecodeResult<FeatureCollection> + Send + Sync,
{
    fn decode(&self, payload: Payload<'_>, options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        self(payload, options)
    }
}

/// Wraps a closure that wants raw bytes.
pub struct BinaryDecoder<F>(pub F);

impl<F> Decoder for BinaryDecoder<F>
where
    F: Fn(&[u8], &ParserOptions) -> DecodeResult<FeatureCollection> + Send + Sync,
{
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Binary
    }

    fn decode(&self, payload: Payload<'_>, options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        (self.0)(payload.as_bytes(), options)
    }
}

/// Shared, type-erased decoder.
pub type SharedDecoder = Arc<dyn Decoder>;

/// Read-only mapping from [`FormatKey`] to decoder.
#[derive(Clone)]
pub struct DispatchTable {
    decoders: HashMap<FormatKey, SharedDecoder>,
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&FormatKey> = self.decoders.keys().collect();
        keys.sort();
        f.debug_struct("DispatchTable").field("keys", &keys).finish()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl DispatchTable {
    /// A table with no entries.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A table with the built-in decoder for every built-in [`FormatKey`].
    pub fn with_defaults() -> Self {
        let mut table = Self::empty();
        for key in FormatKey::BUILT_IN {
            let decoder: SharedDecoder = match key {
                FormatKey::GeoJson => Arc::new(decoders::geojson::GeoJsonDecoder),
                FormatKey::Kml => Arc::new(decoders::kml::KmlDecoder),
                FormatKey::Kmz => Arc::new(decoders::kml::KmzDecoder),
                FormatKey::Csv => Arc::new(decoders::csv::CsvDecoder),
                FormatKey::Wkt => Arc::new(decoders::wkt::WktDecoder),
                FormatKey::Gpx => Arc::new(decoders::gpx::GpxDecoder),
                FormatKey::TopoJson => Arc::new(decoders::topojson::TopoJsonDecoder),
                FormatKey::Polyline => Arc::new(decoders::polyline::PolylineDecoder),
                FormatKey::ShapefileArchive => Arc::new(decoders::shapefile::ShapefileDecoder),
                FormatKey::Custom(_) | FormatKey::Unknown => continue,
            };
            table.decoders.insert(key, decoder);
        }
        table
    }

    /// Register (or replace) the decoder for `key`.
    ///
    /// Registering [`FormatKey::Unknown`] is ignored: unknown files are rejected before the
    /// table is consulted. So is a custom key for a shapefile component extension
    /// (`shp`, `shx`, `dbf`, `prj`): those files are always packed into a `.zip` first and
    /// never looked up on their own.
    pub fn register(&mut self, key: FormatKey, decoder: SharedDecoder) {
        match &key {
            FormatKey::Unknown => {
                tracing::warn!("Ignoring decoder registered for the unknown format");
                return;
            }
            FormatKey::Custom(ext) if is_shapefile_part(&format!("file.{ext}")) => {
                tracing::warn!(extension = %ext, "Ignoring decoder registered for a shapefile component");
                return;
            }
            _ => {}
        }
        self.decoders.insert(key, decoder);
    }

    /// Resolve the format of a file, honoring custom extensions registered in this table.
    pub fn resolve(&self, file_name: &str) -> FormatKey {
        match classify(file_name) {
            FormatKey::Unknown => file_extension(file_name)
                .map(FormatKey::Custom)
                .filter(|key| self.decoders.contains_key(key))
                .unwrap_or(FormatKey::Unknown),
            key => key,
        }
    }

    /// Decoder for `key`, if registered.
    pub fn get(&self, key: &FormatKey) -> Option<&SharedDecoder> {
        self.decoders.get(key)
    }

    /// Whether a decoder is registered for `key`.
    pub fn contains(&self, key: &FormatKey) -> bool {
        self.decoders.contains_key(key)
    }

    /// Number of registered decoders.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_collection(_: Payload<'_>, _: &ParserOptions) -> DecodeResult<FeatureCollection> {
        Ok(FeatureCollection {
            bbox: None,
            features: Vec::new(),
            foreign_members: None,
        })
    }

    #[test]
    fn defaults_cover_every_built_in_key() {
        let table = DispatchTable::with_defaults();
        for key in FormatKey::BUILT_IN {
            assert!(table.contains(&key), "{key}");
        }
        assert!(!table.contains(&FormatKey::Unknown));
        assert_eq!(table.len(), FormatKey::BUILT_IN.len());
    }

    #[test]
    fn custom_extension_resolves_only_when_registered() {
        let mut table = DispatchTable::with_defaults();
        assert_eq!(table.resolve("points.xyz"), FormatKey::Unknown);

        table.register(FormatKey::Custom("xyz".to_string()), Arc::new(empty_collection));
        assert_eq!(table.resolve("points.XYZ"), FormatKey::Custom("xyz".to_string()));
        assert_eq!(table.resolve("noext"), FormatKey::Unknown);
    }

    #[test]
    fn unknown_cannot_be_registered() {
        let mut table = DispatchTable::empty();
        table.register(FormatKey::Unknown, Arc::new(empty_collection));
        assert!(table.is_empty());
    }

    #[test]
    fn shapefile_component_extensions_cannot_be_registered() {
        let mut table = DispatchTable::empty();
        for ext in ["shp", "SHX", "dbf", "prj"] {
            let key: FormatKey = ext.parse().unwrap();
            table.register(key, Arc::new(empty_collection));
        }
        assert!(table.is_empty());
        assert_eq!(DispatchTable::with_defaults().resolve("town.shp"), FormatKey::Unknown);
    }

    #[test]
    fn only_archives_are_decoded_from_bytes() {
        let table = DispatchTable::with_defaults();
        for key in FormatKey::BUILT_IN {
            let expected = match key {
                FormatKey::Kmz | FormatKey::ShapefileArchive => PayloadKind::Binary,
                _ => PayloadKind::Text,
            };
            assert_eq!(table.get(&key).unwrap().payload_kind(), expected, "{key}");
        }
    }

    #[test]
    fn parser_options_parse_into_typed_view() {
        #[derive(Deserialize)]
        struct View {
            delimiter: String,
        }
        let opts = ParserOptions::new().with("delimiter", ";");
        let view: View = opts.parse().unwrap();
        assert_eq!(view.delimiter, ";");
        assert_eq!(opts.get_str("delimiter"), Some(";"));
    }

    #[test]
    fn binary_decoder_reports_binary_payload() {
        let decoder = BinaryDecoder(|bytes: &[u8], _: &ParserOptions| {
            if bytes.is_empty() {
                Err(DecodeError::other("empty"))
            } else {
                empty_collection(Payload::Bytes(bytes), &ParserOptions::new())
            }
        });
        assert_eq!(decoder.payload_kind(), PayloadKind::Binary);
        assert!(decoder.decode(Payload::Bytes(&[]), &ParserOptions::new()).is_err());
    }
}
