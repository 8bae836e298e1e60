//! Map-ready layer container and the renderer contract.
//!
//! [`LayerSink`] is what the ingestion pipeline needs from a renderer-side layer: accept a
//! feature collection, report how many features it holds, and expose its bounds.
//! [`GeoLayer`] is the default implementation; it also carries the presentation metadata
//! (identifier, z-order, style lookup, click callback) the pipeline attaches to loaded layers.

use std::fmt;
use std::sync::Arc;

use geo::{BoundingRect, Coord, Rect};
use geojson::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};

/// Renderer-side layer contract.
pub trait LayerSink {
    /// Append features.
    fn add_features(&mut self, collection: FeatureCollection);

    /// Bounding box of every feature with a geometry, if any.
    fn bounds(&self) -> Option<Rect<f64>>;

    /// Number of features held.
    fn layer_count(&self) -> usize;
}

/// Path style for a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Stroke color (CSS).
    pub color: String,
    /// Stroke width in pixels.
    pub weight: f64,
    /// Stroke opacity.
    pub opacity: f64,
    /// Fill color (CSS); `None` means "same as stroke".
    pub fill_color: Option<String>,
    /// Fill opacity.
    pub fill_opacity: f64,
    /// Marker radius for points.
    pub radius: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: "#3388ff".to_string(),
            weight: 3.0,
            opacity: 1.0,
            fill_color: None,
            fill_opacity: 0.2,
            radius: 6.0,
        }
    }
}

/// Default style by geometry type.
pub fn default_style(feature: &Feature) -> Style {
    use geojson::Value;

    let base = Style::default();
    match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::Point(_) | Value::MultiPoint(_)) => Style {
            color: "#e6550d".to_string(),
            weight: 1.0,
            fill_opacity: 0.8,
            ..base
        },
        Some(Value::LineString(_) | Value::MultiLineString(_)) => Style {
            color: "#3182bd".to_string(),
            ..base
        },
        Some(Value::Polygon(_) | Value::MultiPolygon(_)) => Style {
            color: "#31a354".to_string(),
            weight: 2.0,
            fill_opacity: 0.35,
            ..base
        },
        _ => base,
    }
}

/// Style lookup callback.
pub type StyleFn = Arc<dyn Fn(&Feature) -> Style + Send + Sync>;

/// Feature-click callback.
pub type ClickFn = Arc<dyn Fn(&Feature) + Send + Sync>;

/// A feature layer ready to be handed to the map.
#[derive(Clone)]
pub struct GeoLayer {
    id: Option<String>,
    name: Option<String>,
    z_index: i32,
    features: Vec<Feature>,
    style: StyleFn,
    on_click: Option<ClickFn>,
}

impl fmt::Debug for GeoLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoLayer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("z_index", &self.z_index)
            .field("features", &self.features.len())
            .field("on_click_set", &self.on_click.is_some())
            .finish()
    }
}

impl Default for GeoLayer {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            z_index: 0,
            features: Vec::new(),
            style: Arc::new(default_style),
            on_click: None,
        }
    }
}

impl GeoLayer {
    /// An empty layer with the default style table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style style override.
    pub fn with_style(mut self, style: StyleFn) -> Self {
        self.style = style;
        self
    }

    /// Builder-style click callback.
    pub fn with_on_click(mut self, on_click: ClickFn) -> Self {
        self.on_click = Some(on_click);
        self
    }

    /// Stable identifier, set by the pipeline on load.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Name of the file the layer was loaded from.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Stacking order; higher draws on top.
    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    /// Features in insertion order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Resolve the style of a feature through the style callback.
    pub fn style_for(&self, feature: &Feature) -> Style {
        (self.style)(feature)
    }

    /// Forward a click on `feature` to the click callback, if any.
    pub fn click(&self, feature: &Feature) {
        if let Some(cb) = &self.on_click {
            cb(feature);
        }
    }

    /// Whether a click callback is attached.
    pub fn has_click_handler(&self) -> bool {
        self.on_click.is_some()
    }

    /// The layer as a GeoJSON collection.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.clone(),
            foreign_members: None,
        }
    }

    /// Attach presentation metadata. Features without an id get `"{id}/{n}"`.
    pub(crate) fn attach_metadata(
        &mut self,
        id: String,
        name: &str,
        z_index: i32,
        style: Option<StyleFn>,
        on_click: Option<ClickFn>,
    ) {
        for (n, feature) in self.features.iter_mut().enumerate() {
            if feature.id.is_none() {
                feature.id = Some(geojson::feature::Id::String(format!("{id}/{n}")));
            }
        }
        self.id = Some(id);
        self.name = Some(name.to_owned());
        self.z_index = z_index;
        if let Some(style) = style {
            self.style = style;
        }
        if on_click.is_some() {
            self.on_click = on_click;
        }
    }
}

impl LayerSink for GeoLayer {
    fn add_features(&mut self, collection: FeatureCollection) {
        self.features.extend(collection.features);
    }

    fn bounds(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .filter_map(|g| geo::Geometry::<f64>::try_from(g.value.clone()).ok())
            .filter_map(|g| g.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }

    fn layer_count(&self) -> usize {
        self.features.len()
    }
}
