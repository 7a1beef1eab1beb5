//! Border line simplification
//!
//! Border lines traced on a grid carry one vertex per cell corner. They are
//! generalized with Douglas-Peucker at a tolerance of one cell, which removes
//! the staircase without moving the line by more than the grid precision.

use geo::{LineString, MultiLineString, Simplify};

/// Simplify every part of a MultiLineString using Douglas-Peucker.
///
/// Parts that collapse to fewer than two vertices are dropped. Topology
/// between parts is not preserved.
///
/// # Arguments
/// * `lines` - Input lines
/// * `tolerance` - Maximum allowed deviation, in map units
pub fn simplify_lines(lines: &MultiLineString<f64>, tolerance: f64) -> MultiLineString<f64> {
    let parts: Vec<LineString<f64>> = lines
        .0
        .iter()
        .map(|ls| ls.simplify(&tolerance))
        .filter(|ls| ls.0.len() >= 2)
        .collect();
    MultiLineString::new(parts)
}
