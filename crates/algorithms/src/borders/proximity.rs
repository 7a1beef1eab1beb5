//! Exact Euclidean distance/direction transform
//!
//! For every background cell, finds the nearest labeled cell center and
//! reports the distance (map units) and the bearing toward it (radians,
//! 0 = north, clockwise). Uses the separable lower-envelope algorithm of
//! Felzenszwalb & Huttenlocher, carrying the argmin of each pass so the
//! nearest cell itself is known, not only its distance.
//!
//! Reference:
//! Felzenszwalb, P.F. & Huttenlocher, D.P. (2012). Distance Transforms of
//! Sampled Functions. Theory of Computing, 8, 415-428.

use std::f64::consts::TAU;

use carto_core::raster::Raster;
use carto_core::{Error, Result};
use ndarray::Array2;
use tracing::debug;

use super::rasterize::NO_LABEL;
use crate::maybe_rayon::*;

/// Distance and direction from each cell to its nearest labeled cell
#[derive(Debug, Clone)]
pub struct ProximityField {
    /// Distance in map units; 0 on labeled cells, NaN where unresolved
    pub distance: Raster<f64>,
    /// Bearing in radians in [0, 2π), 0 = north, clockwise;
    /// NaN on labeled and unresolved cells
    pub direction: Raster<f64>,
}

impl ProximityField {
    /// Whether (row, col) has a nearest label within the search distance
    pub fn is_resolved(&self, row: usize, col: usize) -> bool {
        self.distance
            .get(row, col)
            .map(|d| !d.is_nan())
            .unwrap_or(false)
    }
}

/// Compute the distance/direction field of a label grid.
///
/// Cells equal to [`NO_LABEL`] (or the grid's no-data value) are background.
/// Background cells farther than `max_distance` from every labeled cell, or
/// all cells when nothing is labeled, are unresolved (NaN).
///
/// Distances are exact Euclidean distances between cell centers, so
/// thresholding against `max_distance` is metric.
pub fn proximity(labels: &Raster<i32>, max_distance: Option<f64>) -> Result<ProximityField> {
    if let Some(max) = max_distance {
        if max.is_nan() || max < 0.0 {
            return Err(Error::InvalidParameter {
                name: "max_distance",
                value: max.to_string(),
                reason: "must be a non-negative distance".into(),
            });
        }
    }

    let (rows, cols) = labels.shape();
    let cell_size = labels.cell_size();
    let is_label = |v: i32| v != NO_LABEL && !labels.is_nodata(v);

    // Pass 1: per column, squared distance to the nearest labeled row
    let columns: Vec<(Vec<f64>, Vec<usize>)> = (0..cols)
        .into_par_iter()
        .map(|col| {
            let mut sq = vec![f64::INFINITY; rows];
            let mut src = vec![usize::MAX; rows];

            let mut last: Option<usize> = None;
            for row in 0..rows {
                if is_label(labels.data()[(row, col)]) {
                    last = Some(row);
                }
                if let Some(r) = last {
                    sq[row] = ((row - r) as f64).powi(2);
                    src[row] = r;
                }
            }

            let mut last: Option<usize> = None;
            for row in (0..rows).rev() {
                if is_label(labels.data()[(row, col)]) {
                    last = Some(row);
                }
                if let Some(r) = last {
                    let d = ((r - row) as f64).powi(2);
                    if d < sq[row] {
                        sq[row] = d;
                        src[row] = r;
                    }
                }
            }

            (sq, src)
        })
        .collect();

    // Pass 2: per row, lower envelope of the column parabolas
    let rows_out: Vec<(Vec<f64>, Vec<f64>)> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let f: Vec<f64> = columns.iter().map(|(sq, _)| sq[row]).collect();
            let mut sq_dist = vec![f64::INFINITY; cols];
            let mut nearest_col = vec![usize::MAX; cols];
            lower_envelope(&f, &mut sq_dist, &mut nearest_col);

            let mut distance = vec![f64::NAN; cols];
            let mut direction = vec![f64::NAN; cols];

            for col in 0..cols {
                if !sq_dist[col].is_finite() {
                    continue;
                }
                let d = sq_dist[col].sqrt() * cell_size;
                if max_distance.is_some_and(|max| d > max) {
                    continue;
                }
                distance[col] = d;
                if d > 0.0 {
                    let target_col = nearest_col[col];
                    let target_row = columns[target_col].1[row];
                    // Map offsets: x grows with columns, y shrinks with rows
                    let dx = (target_col as f64 - col as f64) * cell_size;
                    let dy = (row as f64 - target_row as f64) * cell_size;
                    direction[col] = bearing(dx, dy);
                }
            }

            (distance, direction)
        })
        .collect();

    let mut distance_data = Vec::with_capacity(rows * cols);
    let mut direction_data = Vec::with_capacity(rows * cols);
    for (d, a) in rows_out {
        distance_data.extend(d);
        direction_data.extend(a);
    }

    let mut distance = labels.like(f64::NAN);
    distance.set_nodata(Some(f64::NAN));
    *distance.data_mut() = Array2::from_shape_vec((rows, cols), distance_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    let mut direction = labels.like(f64::NAN);
    direction.set_nodata(Some(f64::NAN));
    *direction.data_mut() = Array2::from_shape_vec((rows, cols), direction_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    debug!(
        "Proximity transform: {} of {} cell(s) within reach",
        distance.valid_count(),
        distance.len()
    );

    Ok(ProximityField { distance, direction })
}

/// 1D squared distance transform of sampled function `f`.
///
/// Writes `min_q ((p - q)^2 + f[q])` into `out[p]` and the minimizing `q`
/// into `arg[p]`. Infinite samples never become parabola sites; when all
/// samples are infinite the outputs are left untouched.
fn lower_envelope(f: &[f64], out: &mut [f64], arg: &mut [usize]) {
    let n = f.len();
    let mut v = vec![0usize; n];
    let mut z = vec![0f64; n + 1];
    let mut k = 0usize;
    let mut started = false;

    for q in 0..n {
        if !f[q].is_finite() {
            continue;
        }
        if !started {
            v[0] = q;
            z[0] = f64::NEG_INFINITY;
            z[1] = f64::INFINITY;
            started = true;
            continue;
        }
        let mut s = intersection(f, q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = intersection(f, q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    if !started {
        return;
    }

    let mut k = 0usize;
    for p in 0..n {
        while z[k + 1] < p as f64 {
            k += 1;
        }
        let q = v[k];
        out[p] = (p as f64 - q as f64).powi(2) + f[q];
        arg[p] = q;
    }
}

/// Abscissa where the parabolas rooted at `q` and `p` (p < q) intersect
fn intersection(f: &[f64], q: usize, p: usize) -> f64 {
    let (qf, pf) = (q as f64, p as f64);
    ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
}

/// Clockwise angle from north of the offset `(dx, dy)`, in `[0, 2π)`
fn bearing(dx: f64, dy: f64) -> f64 {
    let angle = dx.atan2(dy).rem_euclid(TAU);
    // rem_euclid of a tiny negative angle rounds up to TAU
    if angle >= TAU {
        0.0
    } else {
        angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use carto_core::GeoTransform;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn grid(rows: usize, cols: usize, cell: f64, labeled: &[(usize, usize, i32)]) -> Raster<i32> {
        let mut r = Raster::filled(rows, cols, NO_LABEL);
        r.set_transform(GeoTransform::north_up(0.0, rows as f64 * cell, cell));
        r.set_nodata(Some(NO_LABEL));
        for &(row, col, label) in labeled {
            r.set(row, col, label).unwrap();
        }
        r
    }

    /// Brute-force nearest labeled distance, in cells
    fn brute_force(labels: &Raster<i32>, row: usize, col: usize) -> f64 {
        let (rows, cols) = labels.shape();
        let mut best = f64::INFINITY;
        for r in 0..rows {
            for c in 0..cols {
                if labels.get(r, c).unwrap() != NO_LABEL {
                    let d = ((r as f64 - row as f64).powi(2) + (c as f64 - col as f64).powi(2)).sqrt();
                    best = best.min(d);
                }
            }
        }
        best
    }

    #[test]
    fn test_single_seed_distances() {
        let labels = grid(7, 7, 2.0, &[(3, 3, 1)]);
        let field = proximity(&labels, None).unwrap();

        assert_eq!(field.distance.get(3, 3).unwrap(), 0.0);
        assert!(field.direction.get(3, 3).unwrap().is_nan());
        assert_relative_eq!(field.distance.get(3, 6).unwrap(), 6.0, epsilon = 1e-12);
        assert_relative_eq!(field.distance.get(0, 0).unwrap(), 18f64.sqrt() * 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_directions_point_at_seed() {
        let labels = grid(7, 7, 1.0, &[(3, 3, 1)]);
        let field = proximity(&labels, None).unwrap();

        // Cell below the seed looks north, left of it looks east
        assert_relative_eq!(field.direction.get(5, 3).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(field.direction.get(3, 0).unwrap(), FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(field.direction.get(1, 3).unwrap(), PI, epsilon = 1e-12);
        assert_relative_eq!(field.direction.get(3, 6).unwrap(), 3.0 * FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_exact_against_brute_force() {
        let labels = grid(
            23,
            31,
            1.0,
            &[(0, 0, 1), (4, 17, 2), (11, 5, 3), (12, 6, 3), (20, 29, 4), (22, 13, 5)],
        );
        let field = proximity(&labels, None).unwrap();

        for row in 0..23 {
            for col in 0..31 {
                let expected = brute_force(&labels, row, col);
                let got = field.distance.get(row, col).unwrap();
                assert!(
                    (expected - got).abs() < 1e-9,
                    "cell ({row},{col}): expected {expected}, got {got}"
                );
            }
        }
    }

    #[test]
    fn test_max_distance_flags_unresolved() {
        let labels = grid(1, 10, 1.0, &[(0, 0, 1)]);
        let field = proximity(&labels, Some(3.0)).unwrap();

        assert!(field.is_resolved(0, 3));
        assert!(!field.is_resolved(0, 4));
        assert!(field.direction.get(0, 4).unwrap().is_nan());
    }

    #[test]
    fn test_no_labels_all_unresolved() {
        let labels = grid(4, 4, 1.0, &[]);
        let field = proximity(&labels, None).unwrap();
        assert_eq!(field.distance.valid_count(), 0);
    }

    #[test]
    fn test_bearing_stays_below_full_turn() {
        assert_eq!(bearing(0.0, 1.0), 0.0);
        assert_relative_eq!(bearing(1.0, 0.0), FRAC_PI_2);
        assert_relative_eq!(bearing(0.0, -1.0), PI);
        assert_relative_eq!(bearing(-1.0, 0.0), 3.0 * FRAC_PI_2);

        // Just west of north
        let nearly_north = bearing(-1e-20, 1.0);
        assert!((0.0..TAU).contains(&nearly_north), "bearing {nearly_north}");
    }

    #[test]
    fn test_negative_max_distance_rejected() {
        let labels = grid(2, 2, 1.0, &[(0, 0, 1)]);
        assert!(proximity(&labels, Some(-1.0)).is_err());
    }
}
