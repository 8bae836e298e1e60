//! Extension-based file classification.
//!
//! Everything here is pure and total: any file name maps to exactly one [`FormatKey`].

use serde::{Deserialize, Serialize};

use crate::types::FormatKey;

/// Extensions that make up one logical shapefile.
pub const SHAPEFILE_PART_EXTENSIONS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

/// Default list of extensions offered by a file picker.
pub const DEFAULT_ACCEPTED_FORMATS: [&str; 14] = [
    ".geojson", ".json", ".kml", ".kmz", ".csv", ".wkt", ".gpx", ".topojson", ".polyline", ".zip",
    ".shp", ".shx", ".dbf", ".prj",
];

/// How the shapefile grouping key is derived from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseNameRule {
    /// Everything before the first `.`: `my.town.shp` groups under `my`.
    ///
    /// This is the historical behavior and stays the default so existing batches group the
    /// same way.
    #[default]
    FirstDot,
    /// Everything before the last `.`: `my.town.shp` groups under `my.town`.
    LastDot,
}

/// Lower-cased extension (text after the final `.`), if any.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Resolve the format of a file from its extension (case-insensitive).
///
/// Unknown or missing extensions yield [`FormatKey::Unknown`]. Bare shapefile parts are
/// `Unknown` too: they only become decodable once grouped into an archive.
pub fn classify(file_name: &str) -> FormatKey {
    match file_extension(file_name).as_deref() {
        Some("geojson" | "json") => FormatKey::GeoJson,
        Some("kml") => FormatKey::Kml,
        Some("kmz") => FormatKey::Kmz,
        Some("csv") => FormatKey::Csv,
        Some("wkt") => FormatKey::Wkt,
        Some("gpx") => FormatKey::Gpx,
        Some("topojson") => FormatKey::TopoJson,
        Some("polyline") => FormatKey::Polyline,
        Some("zip") => FormatKey::ShapefileArchive,
        _ => FormatKey::Unknown,
    }
}

/// Grouping key for shapefile components, using [`BaseNameRule::FirstDot`].
pub fn base_name(file_name: &str) -> String {
    base_name_with(file_name, BaseNameRule::FirstDot)
}

/// Grouping key for shapefile components under an explicit rule. Always lower-cased.
pub fn base_name_with(file_name: &str, rule: BaseNameRule) -> String {
    let lower = file_name.to_lowercase();
    let cut = match rule {
        BaseNameRule::FirstDot => lower.split_once('.').map(|(head, _)| head),
        BaseNameRule::LastDot => lower.rsplit_once('.').map(|(head, _)| head),
    };
    match cut {
        Some(head) => head.to_owned(),
        None => lower,
    }
}

/// Whether the file is one of the `.shp/.shx/.dbf/.prj` components.
pub fn is_shapefile_part(file_name: &str) -> bool {
    file_extension(file_name).is_some_and(|ext| SHAPEFILE_PART_EXTENSIONS.contains(&ext.as_str()))
}

/// Render an `accept` attribute for a file input from a list of extensions.
pub fn accept_attribute<S: AsRef<str>>(formats: &[S]) -> String {
    formats
        .iter()
        .map(|f| {
            let f = f.as_ref().trim();
            if f.starts_with('.') {
                f.to_ascii_lowercase()
            } else {
                format!(".{}", f.to_ascii_lowercase())
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
