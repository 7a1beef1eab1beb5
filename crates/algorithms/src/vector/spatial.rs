//! Bounding boxes of geometries and feature layers

use carto_core::FeatureCollection;
use geo::{BoundingRect, Geometry, LineString, Polygon};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Longer of width and height
    pub fn max_side(&self) -> f64 {
        self.width().max(self.height())
    }

    /// Shorter of width and height
    pub fn min_side(&self) -> f64 {
        self.width().min(self.height())
    }

    /// Grow the box by `margin` on every side
    pub fn expand(&self, margin: f64) -> BoundingBox {
        BoundingBox::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Intersection test, boxes closer than `tolerance` count as touching
    pub fn intersects(&self, other: &BoundingBox, tolerance: f64) -> bool {
        self.min_x <= other.max_x + tolerance
            && self.max_x + tolerance >= other.min_x
            && self.min_y <= other.max_y + tolerance
            && self.max_y + tolerance >= other.min_y
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (self.min_x, self.min_y),
                (self.max_x, self.min_y),
                (self.max_x, self.max_y),
                (self.min_x, self.max_y),
                (self.min_x, self.min_y),
            ]),
            vec![],
        )
    }
}

/// Compute the bounding box of a geometry
pub fn bounding_box(geom: &Geometry<f64>) -> Option<BoundingBox> {
    geom.bounding_rect().map(|rect| BoundingBox {
        min_x: rect.min().x,
        min_y: rect.min().y,
        max_x: rect.max().x,
        max_y: rect.max().y,
    })
}

/// Bounding box of every geometry in a layer, `None` when no feature has one
pub fn collection_bounds(collection: &FeatureCollection) -> Option<BoundingBox> {
    collection
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .filter_map(bounding_box)
        .reduce(|acc, bb| acc.union(&bb))
}
