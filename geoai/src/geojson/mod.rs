//! Minimal GeoJSON model.
//!
//! Only the geometry types this crate consumes or produces are modelled:
//! `Point`, `Polygon` and `MultiPolygon`. Positions are `[lng, lat]`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coord::GeoBoundingBox;

/// A `[lng, lat]` position.
pub type Position = [f64; 2];

/// A closed linear ring.
pub type Ring = Vec<Position>;

/// GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Iterates over every position in the geometry.
    pub fn positions(&self) -> Box<dyn Iterator<Item = &Position> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(p)),
            Geometry::Polygon(rings) => Box::new(rings.iter().flatten()),
            Geometry::MultiPolygon(polygons) => Box::new(polygons.iter().flatten().flatten()),
        }
    }

    /// Bounding box of all positions, `None` when degenerate.
    pub fn bbox(&self) -> Option<GeoBoundingBox> {
        GeoBoundingBox::from_points(self.positions().map(|p| (p[0], p[1])))
    }
}

/// GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Creates a feature without properties.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Map::new(),
        }
    }

    /// Feature with a `null` geometry, used for empty results.
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: Map::new(),
        }
    }

    /// Polygon feature covering a bounding box.
    pub fn from_bbox(bbox: &GeoBoundingBox) -> Self {
        Self::new(Geometry::Polygon(vec![bbox.ring()]))
    }

    /// Adds a property, builder style.
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Bounding box of the feature's geometry.
    pub fn bbox(&self) -> Option<GeoBoundingBox> {
        self.geometry.as_ref().and_then(Geometry::bbox)
    }
}

/// GeoJSON feature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
