//! Region table: identifier values, surrogate labels and polygon parts

use std::collections::HashMap;

use carto_core::{AttributeValue, Error, FeatureCollection, Result};
use geo::{Geometry, Polygon};
use tracing::{debug, warn};

use crate::vector::{bounding_box, BoundingBox};

/// Hashable identity of an identifier value.
///
/// Numeric identifiers compare by value (`3` and `3.0` are the same region),
/// everything else by its text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdKey {
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(String),
}

impl IdKey {
    fn of(value: &AttributeValue) -> Option<IdKey> {
        match value {
            AttributeValue::Null => None,
            AttributeValue::Int(i) => Some(IdKey::Int(*i)),
            AttributeValue::Float(v) if v.is_nan() => None,
            AttributeValue::Float(v) => {
                // Whole floats in i64 range share the integer key, -0.0 included
                const LIMIT: f64 = 9_223_372_036_854_775_808.0;
                if v.fract() == 0.0 && (-LIMIT..LIMIT).contains(v) {
                    Some(IdKey::Int(*v as i64))
                } else {
                    Some(IdKey::Float(v.to_bits()))
                }
            }
            AttributeValue::Bool(b) => Some(IdKey::Bool(*b)),
            AttributeValue::String(s) => Some(IdKey::Text(s.clone())),
        }
    }
}

/// Polygons of a layer grouped by identifier.
///
/// Labels are surrogate integers `1..=N` assigned in first-seen order; the
/// original identifier of label `l` is `ids[l - 1]`. Features sharing an
/// identifier form one multi-part region.
#[derive(Debug, Clone)]
pub struct Regions {
    ids: Vec<AttributeValue>,
    parts: Vec<(i32, Polygon<f64>)>,
    bounds: BoundingBox,
}

impl Regions {
    /// Collect the polygonal features of `collection` keyed by `field`.
    ///
    /// Features without an identifier or without polygon geometry are
    /// skipped. Errors when nothing polygonal remains.
    pub fn from_features(collection: &FeatureCollection, field: &str) -> Result<Self> {
        let mut labels: HashMap<IdKey, i32> = HashMap::new();
        let mut ids = Vec::new();
        let mut parts = Vec::new();
        let mut bounds: Option<BoundingBox> = None;
        let mut skipped = 0usize;

        for (index, feature) in collection.iter().enumerate() {
            let polygons = match &feature.geometry {
                Some(geom) => polygons_of(geom),
                None => Vec::new(),
            };
            let value = feature.get_property(field).cloned().unwrap_or(AttributeValue::Null);
            let key = match IdKey::of(&value) {
                Some(key) if !polygons.is_empty() => key,
                _ => {
                    skipped += 1;
                    debug!("Skipping feature #{index}: no identifier or no polygon geometry");
                    continue;
                }
            };

            let label = *labels.entry(key).or_insert_with(|| {
                ids.push(value.clone());
                ids.len() as i32
            });

            for polygon in polygons {
                if let Some(bb) = bounding_box(&Geometry::Polygon(polygon.clone())) {
                    bounds = Some(bounds.map_or(bb, |acc| acc.union(&bb)));
                }
                parts.push((label, polygon));
            }
        }

        if skipped > 0 {
            warn!("{skipped} feature(s) skipped: missing `{field}` value or polygon geometry");
        }

        let bounds = bounds.ok_or(Error::NoGeometry)?;
        Ok(Self { ids, parts, bounds })
    }

    /// Number of distinct identifiers
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Original identifier of a surrogate label
    pub fn id(&self, label: i32) -> Option<&AttributeValue> {
        usize::try_from(label - 1).ok().and_then(|i| self.ids.get(i))
    }

    /// Polygon parts with their labels, in input order
    pub fn parts(&self) -> &[(i32, Polygon<f64>)] {
        &self.parts
    }

    /// Extent of all parts
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }
}

/// Refuse longitude/latitude input.
///
/// A CRS known to be geographic is an error. Without a CRS, a layer whose
/// extent fits in longitude/latitude ranges only triggers a warning.
pub fn check_planar(collection: &FeatureCollection, bounds: &BoundingBox) -> Result<()> {
    match &collection.crs {
        Some(crs) if crs.is_geographic() => Err(Error::GeographicCrs(crs.identifier())),
        Some(_) => Ok(()),
        None => {
            let lonlat = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
            if lonlat.contains_point(bounds.min_x, bounds.min_y)
                && lonlat.contains_point(bounds.max_x, bounds.max_y)
            {
                warn!(
                    "Layer has no CRS and its extent fits longitude/latitude ranges; \
                     distances assume projected coordinates"
                );
            }
            Ok(())
        }
    }
}

fn polygons_of(geom: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geom {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(mp) => mp.0.clone(),
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::Triangle(t) => vec![t.to_polygon()],
        Geometry::GeometryCollection(gc) => gc.0.iter().flat_map(polygons_of).collect(),
        _ => Vec::new(),
    }
}
