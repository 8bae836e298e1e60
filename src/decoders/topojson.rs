//! TopoJSON decoder.
//!
//! Every object of the topology is converted: a `GeometryCollection` object contributes one
//! feature per member geometry, any other object contributes a single feature. Objects are
//! visited in key order.

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DecodeError, DecodeResult};
use crate::ingestion::{Decoder, ParserOptions};
use crate::types::Payload;

use super::collection;

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    transform: Option<Transform>,
    #[serde(default)]
    arcs: Vec<Vec<Position>>,
    #[serde(default)]
    objects: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

impl Transform {
    fn apply(&self, p: &[f64]) -> Position {
        let mut out = p.to_vec();
        if out.len() >= 2 {
            out[0] = out[0] * self.scale[0] + self.translate[0];
            out[1] = out[1] * self.scale[1] + self.translate[1];
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct GeometryObject {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    arcs: Value,
    #[serde(default)]
    coordinates: Value,
    #[serde(default)]
    geometries: Vec<GeometryObject>,
    #[serde(default)]
    properties: Option<JsonObject>,
    #[serde(default)]
    id: Option<Value>,
}

/// Default decoder for `.topojson`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopoJsonDecoder;

impl Decoder for TopoJsonDecoder {
    fn decode(&self, payload: Payload<'_>, _options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        decode_topojson_str(payload.as_text()?)
    }
}

/// Parse a TopoJSON topology into features.
pub fn decode_topojson_str(input: &str) -> DecodeResult<FeatureCollection> {
    let topology: Topology = serde_json::from_str(input)?;
    if topology.kind != "Topology" {
        return Err(invalid(format!("expected type 'Topology', got '{}'", topology.kind)));
    }

    let ctx = Context {
        arcs: decode_arcs(&topology.arcs, topology.transform),
        transform: topology.transform,
    };

    let mut features = Vec::new();
    for (name, object) in topology.objects {
        let object: GeometryObject = serde_json::from_value(object)
            .map_err(|e| invalid(format!("object '{name}': {e}")))?;
        if object.kind.as_deref() == Some("GeometryCollection") {
            for member in &object.geometries {
                features.push(ctx.feature(member)?);
            }
        } else {
            features.push(ctx.feature(&object)?);
        }
    }
    Ok(collection(features))
}

/// Resolve delta-encoded, quantized arcs into absolute positions.
fn decode_arcs(raw: &[Vec<Position>], transform: Option<Transform>) -> Vec<Vec<Position>> {
    let Some(t) = transform else {
        return raw.to_vec();
    };
    raw.iter()
        .map(|arc| {
            let (mut x, mut y) = (0.0, 0.0);
            arc.iter()
                .map(|p| {
                    x += p.first().copied().unwrap_or(0.0);
                    y += p.get(1).copied().unwrap_or(0.0);
                    let mut abs = vec![x, y];
                    abs.extend_from_slice(p.get(2..).unwrap_or(&[]));
                    t.apply(&abs)
                })
                .collect()
        })
        .collect()
}

struct Context {
    arcs: Vec<Vec<Position>>,
    transform: Option<Transform>,
}

impl Context {
    fn feature(&self, object: &GeometryObject) -> DecodeResult<Feature> {
        Ok(Feature {
            bbox: None,
            geometry: self.geometry(object)?,
            id: object.id.clone().and_then(to_id),
            properties: Some(object.properties.clone().unwrap_or_default()),
            foreign_members: None,
        })
    }

    fn geometry(&self, object: &GeometryObject) -> DecodeResult<Option<Geometry>> {
        let Some(kind) = object.kind.as_deref() else {
            return Ok(None);
        };
        let value = match kind {
            "Point" => GeoJsonValue::Point(self.point(&field::<Position>(&object.coordinates, kind)?)),
            "MultiPoint" => GeoJsonValue::MultiPoint(
                field::<Vec<Position>>(&object.coordinates, kind)?
                    .iter()
                    .map(|p| self.point(p))
                    .collect(),
            ),
            "LineString" => GeoJsonValue::LineString(self.line(&field::<Vec<i64>>(&object.arcs, kind)?)?),
            "MultiLineString" => GeoJsonValue::MultiLineString(
                field::<Vec<Vec<i64>>>(&object.arcs, kind)?
                    .iter()
                    .map(|l| self.line(l))
                    .collect::<DecodeResult<_>>()?,
            ),
            "Polygon" => GeoJsonValue::Polygon(self.polygon(&field::<Vec<Vec<i64>>>(&object.arcs, kind)?)?),
            "MultiPolygon" => GeoJsonValue::MultiPolygon(
                field::<Vec<Vec<Vec<i64>>>>(&object.arcs, kind)?
                    .iter()
                    .map(|p| self.polygon(p))
                    .collect::<DecodeResult<_>>()?,
            ),
            "GeometryCollection" => GeoJsonValue::GeometryCollection(
                object
                    .geometries
                    .iter()
                    .filter_map(|g| self.geometry(g).transpose())
                    .collect::<DecodeResult<_>>()?,
            ),
            other => return Err(invalid(format!("unsupported geometry type '{other}'"))),
        };
        Ok(Some(Geometry::new(value)))
    }

    fn point(&self, p: &[f64]) -> Position {
        match &self.transform {
            Some(t) => t.apply(p),
            None => p.to_vec(),
        }
    }

    fn arc(&self, index: i64) -> DecodeResult<Vec<Position>> {
        let (idx, reversed) = if index < 0 { (!index, true) } else { (index, false) };
        let arc = usize::try_from(idx)
            .ok()
            .and_then(|i| self.arcs.get(i))
            .ok_or_else(|| invalid(format!("arc index {index} out of range")))?;
        let mut points = arc.clone();
        if reversed {
            points.reverse();
        }
        Ok(points)
    }

    fn line(&self, arc_indexes: &[i64]) -> DecodeResult<Vec<Position>> {
        let mut points: Vec<Position> = Vec::new();
        for &index in arc_indexes {
            let arc = self.arc(index)?;
            // Consecutive arcs share their junction point.
            if !points.is_empty() {
                points.pop();
            }
            points.extend(arc);
        }
        if points.len() < 2 {
            if let Some(first) = points.first().cloned() {
                points.push(first);
            }
        }
        Ok(points)
    }

    fn ring(&self, arc_indexes: &[i64]) -> DecodeResult<Vec<Position>> {
        let mut points = self.line(arc_indexes)?;
        while !points.is_empty() && points.len() < 4 {
            let first = points[0].clone();
            points.push(first);
        }
        Ok(points)
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> DecodeResult<Vec<Vec<Position>>> {
        rings.iter().map(|r| self.ring(r)).collect()
    }
}

fn field<T: DeserializeOwned>(value: &Value, kind: &str) -> DecodeResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| invalid(format!("{kind}: {e}")))
}

fn to_id(value: Value) -> Option<Id> {
    match value {
        Value::String(s) => Some(Id::String(s)),
        Value::Number(n) => Some(Id::Number(n)),
        _ => None,
    }
}

fn invalid(message: String) -> DecodeError {
    DecodeError::TopoJson { message }
}
