//! KML and KMZ decoders.
//!
//! Each `Placemark` becomes a feature. Supported geometries: `Point`, `LineString`,
//! `LinearRing`, `Polygon` and `MultiGeometry` (as a GeometryCollection). Properties are
//! `name`, `description`, `styleUrl` and every `ExtendedData` value.

use std::io::{Cursor, Read};

use geojson::{FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};
use roxmltree::Node;

use crate::error::{DecodeError, DecodeResult};
use crate::ingestion::{Decoder, ParserOptions};
use crate::types::{Payload, PayloadKind};

use super::xml::{child, child_text, children, descendants, expect_root, parse_document, text_of};
use super::{collection, feature};

/// Default decoder for `.kml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KmlDecoder;

impl Decoder for KmlDecoder {
    fn decode(&self, payload: Payload<'_>, _options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        decode_kml_str(payload.as_text()?)
    }
}

/// Default decoder for `.kmz` (zipped KML).
#[derive(Debug, Clone, Copy, Default)]
pub struct KmzDecoder;

impl Decoder for KmzDecoder {
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Binary
    }

    fn decode(&self, payload: Payload<'_>, _options: &ParserOptions) -> DecodeResult<FeatureCollection> {
        decode_kmz_bytes(payload.as_bytes())
    }
}

/// Parse KML text into features.
pub fn decode_kml_str(input: &str) -> DecodeResult<FeatureCollection> {
    let doc = parse_document(input)?;
    let root = expect_root(&doc, "kml", "kml")?;

    let mut features = Vec::new();
    for placemark in descendants(root, "Placemark") {
        let geometry = placemark
            .children()
            .filter(|n| n.is_element())
            .find_map(|n| geometry(n).transpose())
            .transpose()?;
        features.push(feature(geometry, properties(placemark)));
    }
    Ok(collection(features))
}

/// Open a KMZ archive and decode its main KML document (`doc.kml`, else the first `.kml`).
pub fn decode_kmz_bytes(bytes: &[u8]) -> DecodeResult<FeatureCollection> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let kml_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.to_ascii_lowercase().ends_with(".kml"))
        .map(str::to_owned)
        .collect();
    let entry_name = kml_names
        .iter()
        .find(|n| n.eq_ignore_ascii_case("doc.kml"))
        .or_else(|| kml_names.first())
        .ok_or_else(|| DecodeError::Document {
            format: "kmz",
            message: "archive contains no .kml document".to_string(),
        })?;

    let mut text = String::new();
    archive.by_name(entry_name)?.read_to_string(&mut text)?;
    decode_kml_str(&text)
}

fn properties(placemark: Node<'_, '_>) -> JsonObject {
    let mut props = JsonObject::new();
    for key in ["name", "description", "styleUrl"] {
        if let Some(value) = child_text(placemark, key) {
            props.insert(key.to_owned(), value.into());
        }
    }
    if let Some(extended) = child(placemark, "ExtendedData") {
        for data in descendants(extended, "Data") {
            if let (Some(name), Some(value)) = (data.attribute("name"), child_text(data, "value")) {
                props.insert(name.to_owned(), value.into());
            }
        }
        for data in descendants(extended, "SimpleData") {
            if let (Some(name), Some(value)) = (data.attribute("name"), text_of(data)) {
                props.insert(name.to_owned(), value.into());
            }
        }
    }
    props
}

/// Geometry for a geometry element; `None` for elements that are not geometries.
fn geometry(node: Node<'_, '_>) -> DecodeResult<Option<Geometry>> {
    let value = match node.tag_name().name() {
        "Point" => {
            let mut coords = coordinates(node)?;
            if coords.is_empty() {
                return Err(invalid("Point without coordinates"));
            }
            GeoJsonValue::Point(coords.swap_remove(0))
        }
        "LineString" => GeoJsonValue::LineString(coordinates(node)?),
        "LinearRing" => GeoJsonValue::Polygon(vec![coordinates(node)?]),
        "Polygon" => GeoJsonValue::Polygon(polygon_rings(node)?),
        "MultiGeometry" => GeoJsonValue::GeometryCollection(
            node.children()
                .filter(|n| n.is_element())
                .filter_map(|n| geometry(n).transpose())
                .collect::<DecodeResult<_>>()?,
        ),
        _ => return Ok(None),
    };
    Ok(Some(Geometry::new(value)))
}

fn polygon_rings(polygon: Node<'_, '_>) -> DecodeResult<Vec<Vec<Vec<f64>>>> {
    let mut rings = Vec::new();
    let outer = child(polygon, "outerBoundaryIs")
        .and_then(|b| child(b, "LinearRing"))
        .ok_or_else(|| invalid("Polygon without outerBoundaryIs/LinearRing"))?;
    rings.push(coordinates(outer)?);
    for inner in children(polygon, "innerBoundaryIs") {
        for ring in children(inner, "LinearRing") {
            rings.push(coordinates(ring)?);
        }
    }
    Ok(rings)
}

/// Parse the `<coordinates>` child: whitespace-separated `lon,lat[,alt]` tuples.
fn coordinates(node: Node<'_, '_>) -> DecodeResult<Vec<Vec<f64>>> {
    let Some(text) = child_text(node, "coordinates") else {
        return Ok(Vec::new());
    };
    text.split_whitespace()
        .map(|tuple| {
            let position: Vec<f64> = tuple
                .split(',')
                .filter(|p| !p.is_empty())
                .map(|p| p.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|_| invalid(&format!("invalid coordinate tuple '{tuple}'")))?;
            if position.len() < 2 {
                return Err(invalid(&format!("coordinate tuple '{tuple}' needs lon,lat")));
            }
            Ok(position)
        })
        .collect()
}

fn invalid(message: &str) -> DecodeError {
    DecodeError::Document {
        format: "kml",
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    const PLACEMARK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <name>Google Earth</name>
      <description><![CDATA[A <b>bold</b> place]]></description>
      <ExtendedData><Data name="floors"><value>3</value></Data></ExtendedData>
      <Point><coordinates>-122.0822035425683,37.42228990140251,0</coordinates></Point>
    </Placemark>
    <Folder>
      <Placemark>
        <Polygon>
          <outerBoundaryIs><LinearRing><coordinates>0,0 1,0 1,1 0,0</coordinates></LinearRing></outerBoundaryIs>
          <innerBoundaryIs><LinearRing><coordinates>0.2,0.2 0.4,0.2 0.4,0.4 0.2,0.2</coordinates></LinearRing></innerBoundaryIs>
        </Polygon>
      </Placemark>
    </Folder>
  </Document>
</kml>"#;

    #[test]
    fn placemarks_become_features() {
        let fc = decode_kml_str(PLACEMARK).unwrap();
        assert_eq!(fc.features.len(), 2);

        let first = &fc.features[0];
        assert_eq!(
            first.geometry.as_ref().unwrap().value,
            GeoJsonValue::Point(vec![-122.0822035425683, 37.42228990140251, 0.0])
        );
        assert_eq!(first.property("name").and_then(|v| v.as_str()), Some("Google Earth"));
        assert_eq!(first.property("description").and_then(|v| v.as_str()), Some("A <b>bold</b> place"));
        assert_eq!(first.property("floors").and_then(|v| v.as_str()), Some("3"));

        match &fc.features[1].geometry.as_ref().unwrap().value {
            GeoJsonValue::Polygon(rings) => assert_eq!(rings.len(), 2),
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn multigeometry_becomes_collection() {
        let input = r#"<kml><Placemark><MultiGeometry>
            <Point><coordinates>1,2</coordinates></Point>
            <LineString><coordinates>0,0 1,1</coordinates></LineString>
        </MultiGeometry></Placemark></kml>"#;
        let fc = decode_kml_str(input).unwrap();
        match &fc.features[0].geometry.as_ref().unwrap().value {
            GeoJsonValue::GeometryCollection(members) => assert_eq!(members.len(), 2),
            other => panic!("expected collection, got {other:?}"),
        }
    }

    #[test]
    fn document_without_placemarks_is_empty() {
        let fc = decode_kml_str("<kml><Document><name>nothing</name></Document></kml>").unwrap();
        assert!(fc.features.is_empty());
    }

    #[test]
    fn malformed_documents_fail() {
        assert!(matches!(decode_kml_str("<kml><Placemark>"), Err(DecodeError::Xml(_))));
        assert!(matches!(decode_kml_str("<gpx/>"), Err(DecodeError::Document { .. })));
        let bad = "<kml><Placemark><Point><coordinates>a,b</coordinates></Point></Placemark></kml>";
        assert!(decode_kml_str(bad).is_err());
    }

    #[test]
    fn kmz_prefers_doc_kml() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file("other.kml", options).unwrap();
        zip.write_all(b"<kml/>").unwrap();
        zip.start_file("doc.kml", options).unwrap();
        zip.write_all(PLACEMARK.as_bytes()).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let fc = decode_kmz_bytes(&bytes).unwrap();
        assert_eq!(fc.features.len(), 2);
    }

    #[test]
    fn kmz_without_kml_fails() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"hi").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(decode_kmz_bytes(&bytes), Err(DecodeError::Document { format: "kmz", .. })));
    }
}
