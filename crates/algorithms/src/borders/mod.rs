//! Border extraction between map regions
//!
//! Outer borders separate regions that do not touch (islands, regions split
//! by water or a gap): the map is rasterized, every background cell within
//! `width` is handed to its nearest region, and the edges between the
//! resulting areas are vectorized and simplified. Inner borders are the
//! edges regions already share in the input.
//!
//! Pipeline stages are public so they can be run and inspected one by one:
//! [`rasterize()`] → [`proximity()`] → [`resolve_labels`] →
//! [`shared_boundaries`] / [`dissolve`].

mod inner;
mod params;
mod proximity;
mod rasterize;
mod regions;
mod resolve;
mod vectorize;

pub use inner::touching_boundaries;
pub use params::{BorderParams, IdField, LegacyBorderArgs};
pub use proximity::{proximity, ProximityField};
pub use rasterize::{
    burn_polygon, default_resolution, default_width, rasterize, GridSpec, MAX_GRID_CELLS, NO_LABEL,
};
pub use regions::{check_planar, Regions};
pub use resolve::resolve_labels;
pub use vectorize::{dissolve, partition_labels, shared_boundaries, LabelPair};

use std::collections::BTreeMap;

use carto_core::raster::Raster;
use carto_core::{Algorithm, Error, Feature, FeatureCollection, Result};
use geo::{Geometry, MultiLineString};
use tracing::{debug, info};

use crate::vector::simplify_lines;

/// Row id suffix of outer border segments
pub const OUTER_SUFFIX: &str = "_o";
/// Row id suffix of inner border segments
pub const INNER_SUFFIX: &str = "_i";

/// Outer border extraction
#[derive(Debug, Clone, Default)]
pub struct OuterBorders;

impl Algorithm for OuterBorders {
    type Input = FeatureCollection;
    type Output = FeatureCollection;
    type Params = BorderParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "OuterBorders"
    }

    fn description(&self) -> &'static str {
        "Borders between non-contiguous regions, from a nearest-region partition of their surroundings"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        outer_borders(&input, &params)
    }
}

/// Inner border extraction
#[derive(Debug, Clone, Default)]
pub struct InnerBorders;

impl Algorithm for InnerBorders {
    type Input = FeatureCollection;
    type Output = FeatureCollection;
    type Params = BorderParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "InnerBorders"
    }

    fn description(&self) -> &'static str {
        "Borders shared by regions that touch in the input layer"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        inner_borders(&input, &params)
    }
}

/// Regions and grid of one extraction run
struct Prepared {
    regions: Regions,
    spec: GridSpec,
}

fn prepare(collection: &FeatureCollection, params: &BorderParams) -> Result<Prepared> {
    params.validate()?;
    let field = params.id_field.resolve(collection)?;
    let regions = Regions::from_features(collection, &field)?;
    check_planar(collection, &regions.bounds())?;
    let spec = GridSpec::new(regions.bounds(), params)?;
    debug!(
        "Identifier `{field}`: {} region(s), resolution {}, width {}",
        regions.len(),
        spec.resolution,
        spec.width
    );
    Ok(Prepared { regions, spec })
}

/// Nearest-region partition of a rasterized layer
fn partition(labels: &Raster<i32>, spec: &GridSpec) -> Result<Raster<i32>> {
    let field = proximity(labels, Some(spec.width))?;
    resolve_labels(labels, &field)
}

/// Extract outer borders.
///
/// # Arguments
/// * `collection` - Polygon layer in a projected CRS
/// * `params` - Identifier field, resolution and width
///
/// # Returns
/// One line feature per pair of regions whose surroundings meet within
/// `width`, with properties `id`, `id1`, `id2` and row ids ending in `_o`.
/// Empty when the layer holds fewer than two regions, or fewer than two
/// survive rasterization.
pub fn outer_borders(collection: &FeatureCollection, params: &BorderParams) -> Result<FeatureCollection> {
    let Prepared { regions, spec } = prepare(collection, params)?;
    if regions.len() < 2 {
        info!("Fewer than two regions, no borders to extract");
        return Ok(border_collection(collection));
    }

    let labels = rasterize(&regions, &spec);
    if partition_labels(&labels).len() < 2 {
        info!("Fewer than two regions left after rasterization at resolution {}", spec.resolution);
        return Ok(border_collection(collection));
    }

    let resolved = partition(&labels, &spec)?;
    let boundaries = shared_boundaries(&resolved)
        .into_iter()
        .map(|(pair, lines)| (pair, simplify_lines(&lines, spec.resolution)))
        .collect();

    Ok(border_rows(collection, &regions, boundaries, OUTER_SUFFIX))
}

/// Extract inner borders: edges shared by regions touching in the input.
///
/// Only the identifier field of `params` is used.
pub fn inner_borders(collection: &FeatureCollection, params: &BorderParams) -> Result<FeatureCollection> {
    params.validate()?;
    let field = params.id_field.resolve(collection)?;
    let regions = Regions::from_features(collection, &field)?;
    check_planar(collection, &regions.bounds())?;
    if regions.len() < 2 {
        return Ok(border_collection(collection));
    }

    let boundaries = touching_boundaries(&regions);
    Ok(border_rows(collection, &regions, boundaries, INNER_SUFFIX))
}

/// Inner borders followed by outer borders in one collection
pub fn all_borders(collection: &FeatureCollection, params: &BorderParams) -> Result<FeatureCollection> {
    let inner = inner_borders(collection, params)?;
    let outer = outer_borders(collection, params)?;

    let mut all = border_collection(collection);
    all.features.extend(inner.features);
    all.features.extend(outer.features);
    Ok(all)
}

/// Dissolved nearest-region partition as polygons.
///
/// One feature per region that keeps at least one cell, with the original
/// identifier in the `id` property. Useful to check what `width` and
/// `resolution` do before extracting borders.
pub fn partition_polygons(collection: &FeatureCollection, params: &BorderParams) -> Result<FeatureCollection> {
    let Prepared { regions, spec } = prepare(collection, params)?;
    let labels = rasterize(&regions, &spec);
    let resolved = partition(&labels, &spec)?;

    let mut out = FeatureCollection::with_fields(["id"]);
    out.crs = collection.crs.clone();
    for (label, polygons) in dissolve(&resolved) {
        let Some(id) = regions.id(label) else { continue };
        let mut feature =
            Feature::new(Geometry::MultiPolygon(polygons)).with_property("id", id.clone());
        feature.id = Some(id.to_string());
        out.push(feature);
    }
    Ok(out)
}

fn border_collection(source: &FeatureCollection) -> FeatureCollection {
    let mut fc = FeatureCollection::with_fields(["id", "id1", "id2"]);
    fc.crs = source.crs.clone();
    fc
}

/// Turn per-pair boundaries into labeled border rows
fn border_rows(
    source: &FeatureCollection,
    regions: &Regions,
    boundaries: BTreeMap<LabelPair, MultiLineString<f64>>,
    suffix: &str,
) -> FeatureCollection {
    let mut out = border_collection(source);
    for ((a, b), lines) in boundaries {
        if lines.0.is_empty() {
            continue;
        }
        let (Some(id1), Some(id2)) = (regions.id(a), regions.id(b)) else { continue };

        let mut feature = Feature::new(Geometry::MultiLineString(lines))
            .with_property("id", format!("{id1}_{id2}"))
            .with_property("id1", id1.clone())
            .with_property("id2", id2.clone());
        feature.id = Some(format!("{}{suffix}", out.len() + 1));
        out.push(feature);
    }
    debug!("{} border segment(s) with suffix {suffix}", out.len());
    out
}
