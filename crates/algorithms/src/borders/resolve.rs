//! Nearest-label resolution
//!
//! Turns a label grid plus its proximity field into a partition: every cell
//! within reach of a region carries that region's label.

use carto_core::raster::Raster;
use carto_core::{Error, Result};
use tracing::debug;

use super::proximity::ProximityField;
use super::rasterize::NO_LABEL;
use crate::maybe_rayon::*;

/// Assign every resolved background cell the label of its nearest region.
///
/// The nearest labeled cell is recovered from the direction field: the target
/// point `center + distance * (sin θ, cos θ)` is sampled on `labels` with a
/// nearest-cell lookup. Labeled cells keep their label. Unresolved cells and
/// targets falling off the grid stay [`NO_LABEL`].
pub fn resolve_labels(labels: &Raster<i32>, field: &ProximityField) -> Result<Raster<i32>> {
    let (rows, cols) = labels.shape();
    for other in [&field.distance, &field.direction] {
        let (ar, ac) = other.shape();
        if (ar, ac) != (rows, cols) {
            return Err(Error::SizeMismatch { er: rows, ec: cols, ar, ac });
        }
    }

    let mut partition = labels.like(NO_LABEL);
    partition.set_nodata(Some(NO_LABEL));

    if rows == 0 || cols == 0 {
        return Ok(partition);
    }

    let out = partition
        .data_mut()
        .as_slice_mut()
        .ok_or_else(|| Error::Other("label grid is not contiguous".into()))?;

    out.par_chunks_mut(cols).enumerate().for_each(|(row, out_row)| {
        for (col, cell) in out_row.iter_mut().enumerate() {
            let own = labels.data()[(row, col)];
            if own != NO_LABEL && !labels.is_nodata(own) {
                *cell = own;
                continue;
            }

            let d = field.distance.data()[(row, col)];
            let theta = field.direction.data()[(row, col)];
            if d.is_nan() || theta.is_nan() {
                continue;
            }

            let (x, y) = labels.cell_center(row, col);
            let (tx, ty) = (x + d * theta.sin(), y + d * theta.cos());
            if let Some(target) = labels.sample(tx, ty) {
                if !labels.is_nodata(target) {
                    *cell = target;
                }
            }
        }
    });

    debug!("Resolved partition: {} labeled cell(s)", partition.valid_count());
    Ok(partition)
}
