//! Polygon rasterization onto a label grid
//!
//! Every cell whose center falls inside a polygon receives that polygon's
//! label. Polygons are burned with an even-odd scanline fill so holes stay
//! empty. Where polygons overlap, the one burned last (later in input order)
//! owns the cell.

use carto_core::raster::{GeoTransform, Raster};
use carto_core::{Error, Result};
use geo::{LineString, Polygon};
use tracing::{debug, warn};

use super::params::BorderParams;
use super::regions::Regions;
use crate::vector::BoundingBox;

/// Label of a cell covered by no region
pub const NO_LABEL: i32 = 0;

/// Upper bound on the number of cells in one label grid.
///
/// The label grid and the two proximity rasters cost about 20 bytes a
/// cell, so this keeps a run under roughly 2.5 GiB.
pub const MAX_GRID_CELLS: usize = 1 << 27;

/// Resolved grid geometry for one extraction run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    /// Cell size in map units
    pub resolution: f64,
    /// Search distance and extent margin in map units
    pub width: f64,
    /// Feature extent before the margin is added
    pub bounds: BoundingBox,
}

impl GridSpec {
    /// Resolve defaults and sanity-check the grid against the feature extent.
    ///
    /// `params` must already be validated. A resolution that is not smaller
    /// than the shorter side of the extent would burn every region into at
    /// most one cell; an explicit one is replaced by the default, and a
    /// default that is still too coarse is cut to half the shorter side.
    /// Grids above [`MAX_GRID_CELLS`] are rejected before any allocation.
    pub fn new(bounds: BoundingBox, params: &BorderParams) -> Result<Self> {
        let min_side = bounds.min_side();
        let coarse = |res: f64| min_side > 0.0 && res >= min_side;

        let mut resolution = params.resolution.unwrap_or_else(|| default_resolution(&bounds));
        if coarse(resolution) {
            let mut fallback = default_resolution(&bounds);
            if coarse(fallback) {
                fallback = min_side / 2.0;
            }
            warn!(
                "Resolution {resolution} is not smaller than the layer extent ({min_side}); using {fallback}"
            );
            resolution = fallback;
        }
        let width = match params.width {
            Some(width) => width,
            None => default_width(&bounds),
        };

        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(Error::InvalidParameter {
                name: "resolution",
                value: resolution.to_string(),
                reason: "layer extent is degenerate".into(),
            });
        }

        let spec = Self { resolution, width, bounds };
        let (rows, cols) = spec.shape();
        match rows.checked_mul(cols) {
            Some(cells) if cells <= MAX_GRID_CELLS => Ok(spec),
            _ => Err(Error::InvalidParameter {
                name: "resolution and width",
                value: format!("{rows} x {cols} cells"),
                reason: format!(
                    "grid exceeds {MAX_GRID_CELLS} cells; use a coarser resolution or a smaller width"
                ),
            }),
        }
    }

    /// Grid extent: feature bounds grown by `width`
    pub fn extent(&self) -> BoundingBox {
        self.bounds.expand(self.width)
    }

    /// Grid dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        let extent = self.extent();
        let cols = (extent.width() / self.resolution).ceil().max(1.0) as usize;
        let rows = (extent.height() / self.resolution).ceil().max(1.0) as usize;
        (rows, cols)
    }

    /// Empty label grid covering the extent
    pub fn empty_grid(&self) -> Raster<i32> {
        let (rows, cols) = self.shape();
        let extent = self.extent();
        let mut grid = Raster::filled(rows, cols, NO_LABEL);
        grid.set_transform(GeoTransform::north_up(extent.min_x, extent.max_y, self.resolution));
        grid.set_nodata(Some(NO_LABEL));
        grid
    }
}

/// `round(max side / 150)`, or the unrounded ratio when that rounds to 0
pub fn default_resolution(bounds: &BoundingBox) -> f64 {
    rounded_fraction(bounds.max_side(), 150.0)
}

/// `round(max side / 20)`, or the unrounded ratio when that rounds to 0
pub fn default_width(bounds: &BoundingBox) -> f64 {
    rounded_fraction(bounds.max_side(), 20.0)
}

fn rounded_fraction(side: f64, divisor: f64) -> f64 {
    let ratio = side / divisor;
    if ratio.round() > 0.0 {
        ratio.round()
    } else {
        ratio
    }
}

/// Burn every region of `regions` onto a fresh grid described by `spec`.
pub fn rasterize(regions: &Regions, spec: &GridSpec) -> Raster<i32> {
    let mut grid = spec.empty_grid();
    for (label, polygon) in regions.parts() {
        burn_polygon(&mut grid, polygon, *label);
    }
    debug!(
        "Rasterized {} part(s) onto {} x {} grid, {} labeled cell(s)",
        regions.parts().len(),
        grid.cols(),
        grid.rows(),
        grid.valid_count()
    );
    grid
}

/// Write `label` into every cell whose center lies inside `polygon`.
///
/// A center exactly on a left or bottom edge is inside, on a right or top
/// edge outside, so two polygons sharing an edge never both claim a cell.
pub fn burn_polygon(grid: &mut Raster<i32>, polygon: &Polygon<f64>, label: i32) {
    let (rows, cols) = grid.shape();
    let transform = *grid.transform();
    let res = transform.cell_size();
    let (origin_x, origin_y) = (transform.origin_x, transform.origin_y);

    let rings: Vec<&LineString<f64>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .collect();

    let (min_y, max_y) = polygon
        .exterior()
        .coords()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c.y), hi.max(c.y)));
    if !min_y.is_finite() {
        return;
    }

    // Rows whose center y lies within [min_y, max_y]
    let first_row = ((origin_y - max_y) / res - 0.5).ceil().max(0.0) as usize;
    let last_row = ((origin_y - min_y) / res - 0.5).floor();
    if last_row < 0.0 {
        return;
    }
    let last_row = (last_row as usize).min(rows.saturating_sub(1));

    let mut crossings: Vec<f64> = Vec::new();
    for row in first_row..=last_row {
        let cy = origin_y - (row as f64 + 0.5) * res;

        crossings.clear();
        for ring in &rings {
            for line in ring.lines() {
                let (p, q) = (line.start, line.end);
                if (p.y <= cy && q.y > cy) || (q.y <= cy && p.y > cy) {
                    crossings.push(p.x + (cy - p.y) * (q.x - p.x) / (q.y - p.y));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let start = ((span[0] - origin_x) / res - 0.5).ceil().max(0.0) as usize;
            let end = ((span[1] - origin_x) / res - 0.5).ceil().max(0.0) as usize;
            for col in start..end.min(cols) {
                grid.data_mut()[(row, col)] = label;
            }
        }
    }
}
