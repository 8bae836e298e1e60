//! GPX decoder.
//!
//! - `wpt` -> Point
//! - `rte` -> LineString
//! - `trk` -> LineString (one segment) or MultiLineString (several)
//!
//! Elevation (`ele`) is kept as the third coordinate.

use geojson::{FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};
use roxmltree::Node;

use crate::error::{DecodeError, DecodeResult};
use crate::ingestion::{Decoder, ParserOptions};
use crate::types::Payload;

use super::xml::{child_text, children, expect_root, parse_document};
use super::{collection, feature};

/// Default decoder for `.gpx`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpxDecoder;

impl Decoder for GpxDecoder {
    fn decode(&self, payload: Payload<'_>, _options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        decode_gpx_str(payload.as_text()?)
    }
}

/// Parse GPX text into features. Tracks come first, then routes, then waypoints.
pub fn decode_gpx_str(input: &str) -> DecodeResult<FeatureCollection> {
    let doc = parse_document(input)?;
    let root = expect_root(&doc, "gpx", "gpx")?;
    let mut features = Vec::new();

    for trk in children(root, "trk") {
        let segments: Vec<Vec<Vec<f64>>> = children(trk, "trkseg")
            .map(|seg| children(seg, "trkpt").map(position).collect::<DecodeResult<Vec<_>>>())
            .collect::<DecodeResult<Vec<_>>>()?
            .into_iter()
            .filter(|seg| !seg.is_empty())
            .collect();
        let value = match segments.len() {
            0 => continue,
            1 => GeoJsonValue::LineString(segments.into_iter().flatten().collect()),
            _ => GeoJsonValue::MultiLineString(segments),
        };
        let mut props = properties(trk);
        if let Some(time) = children(trk, "trkseg")
            .flat_map(|seg| children(seg, "trkpt"))
            .find_map(|pt| child_text(pt, "time"))
        {
            props.insert("time".to_owned(), time.into());
        }
        features.push(feature(Some(Geometry::new(value)), props));
    }

    for rte in children(root, "rte") {
        let points = children(rte, "rtept").map(position).collect::<DecodeResult<Vec<_>>>()?;
        if points.is_empty() {
            continue;
        }
        features.push(feature(
            Some(Geometry::new(GeoJsonValue::LineString(points))),
            properties(rte),
        ));
    }

    for wpt in children(root, "wpt") {
        let mut props = properties(wpt);
        for key in ["time", "sym", "type"] {
            if let Some(value) = child_text(wpt, key) {
                props.insert(key.to_owned(), value.into());
            }
        }
        features.push(feature(Some(Geometry::new(GeoJsonValue::Point(position(wpt)?))), props));
    }

    Ok(collection(features))
}

fn properties(node: Node<'_, '_>) -> JsonObject {
    let mut props = JsonObject::new();
    for key in ["name", "desc", "cmt"] {
        if let Some(value) = child_text(node, key) {
            props.insert(key.to_owned(), value.into());
        }
    }
    props
}

fn position(node: Node<'_, '_>) -> DecodeResult<Vec<f64>> {
    let lat = coordinate_attr(node, "lat")?;
    let lon = coordinate_attr(node, "lon")?;
    let mut out = vec![lon, lat];
    if let Some(ele) = child_text(node, "ele").and_then(|e| e.parse::<f64>().ok()) {
        out.push(ele);
    }
    Ok(out)
}

fn coordinate_attr(node: Node<'_, '_>, name: &str) -> DecodeResult<f64> {
    node.attribute(name)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or_else(|| DecodeError::Document {
            format: "gpx",
            message: format!("<{}> has a missing or invalid '{name}' attribute", node.tag_name().name()),
        })
}
