//! Built-in format decoders.
//!
//! Each decoder turns one format's payload into a [`geojson::FeatureCollection`]. They are
//! the default entries of [`crate::ingestion::DispatchTable`] and can be replaced per format.
//!
//! - [`geojson`]: GeoJSON documents
//! - [`topojson`]: TopoJSON topologies
//! - [`csv`]: delimited text with latitude/longitude columns
//! - [`wkt`]: well-known text geometries
//! - [`polyline`]: encoded polylines
//! - [`kml`]: KML and KMZ
//! - [`gpx`]: GPS exchange format
//! - [`shapefile`]: zipped shapefiles

pub mod csv;
pub mod geojson;
pub mod gpx;
pub mod kml;
pub mod polyline;
pub mod shapefile;
pub mod topojson;
pub mod wkt;
mod xml;

use ::geojson::{Feature, FeatureCollection, Geometry, JsonObject};

/// Build a feature from an optional geometry and properties.
pub(crate) fn feature(geometry: Option<Geometry>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Build a collection from features.
pub(crate) fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Convert a `geo` geometry into a GeoJSON geometry.
pub(crate) fn from_geo(geometry: &geo::Geometry<f64>) -> Geometry {
    Geometry::new(::geojson::Value::from(geometry))
}
