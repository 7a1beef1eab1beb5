//! Partition vectorization
//!
//! Works on cell edges of a resolved partition. An edge between two cells
//! with different labels belongs to the boundary of both dissolved regions;
//! grouping those edges by label pair yields the shared boundary of every
//! adjacent pair, and tracing them per label yields the dissolved polygons.
//!
//! Grid vertices are cell corners addressed as `(row, col)` with
//! `0 <= row <= rows` and `0 <= col <= cols`.

use std::collections::{BTreeMap, BTreeSet};

use carto_core::raster::Raster;
use geo::{Area, Contains, Coord, LineString, MultiLineString, MultiPolygon, Polygon};

use super::rasterize::NO_LABEL;

/// Cell corner `(row, col)`
pub(crate) type Vertex = (usize, usize);

/// Unordered label pair, smaller label first
pub type LabelPair = (i32, i32);

fn label_at(partition: &Raster<i32>, row: usize, col: usize) -> Option<i32> {
    let v = partition.data()[(row, col)];
    (v != NO_LABEL && !partition.is_nodata(v)).then_some(v)
}

fn corner(partition: &Raster<i32>, v: Vertex) -> Coord<f64> {
    let (x, y) = partition.transform().pixel_to_geo_corner(v.1, v.0);
    Coord { x, y }
}

/// Cell edges separating two different labels, grouped by label pair.
pub(crate) fn boundary_edges(partition: &Raster<i32>) -> BTreeMap<LabelPair, Vec<(Vertex, Vertex)>> {
    let (rows, cols) = partition.shape();
    let mut edges: BTreeMap<LabelPair, Vec<(Vertex, Vertex)>> = BTreeMap::new();

    for row in 0..rows {
        for col in 0..cols {
            let Some(a) = label_at(partition, row, col) else { continue };

            // East neighbour shares the vertical edge at col + 1
            if col + 1 < cols {
                if let Some(b) = label_at(partition, row, col + 1) {
                    if a != b {
                        edges
                            .entry((a.min(b), a.max(b)))
                            .or_default()
                            .push(((row, col + 1), (row + 1, col + 1)));
                    }
                }
            }

            // South neighbour shares the horizontal edge at row + 1
            if row + 1 < rows {
                if let Some(b) = label_at(partition, row + 1, col) {
                    if a != b {
                        edges
                            .entry((a.min(b), a.max(b)))
                            .or_default()
                            .push(((row + 1, col), (row + 1, col + 1)));
                    }
                }
            }
        }
    }

    edges
}

/// Shared boundary of every pair of adjacent regions.
///
/// Two regions are adjacent when at least one cell edge separates them;
/// touching at a single corner does not count. Each boundary is chained into
/// maximal lines that break at junctions with other regions.
pub fn shared_boundaries(partition: &Raster<i32>) -> BTreeMap<LabelPair, MultiLineString<f64>> {
    boundary_edges(partition)
        .into_iter()
        .map(|(pair, edges)| {
            let lines = chain_edges(&edges)
                .into_iter()
                .map(|path| {
                    LineString::new(path.into_iter().map(|v| corner(partition, v)).collect())
                })
                .collect();
            (pair, MultiLineString::new(lines))
        })
        .collect()
}

/// Link undirected edges into maximal paths.
///
/// Paths end at vertices whose degree is not 2; edges left over afterwards
/// form closed loops, returned with the first vertex repeated at the end.
pub(crate) fn chain_edges<V: Ord + Copy>(edges: &[(V, V)]) -> Vec<Vec<V>> {
    let mut incident: BTreeMap<V, Vec<usize>> = BTreeMap::new();
    for (i, &(a, b)) in edges.iter().enumerate() {
        incident.entry(a).or_default().push(i);
        incident.entry(b).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut paths = Vec::new();

    let walk = |start: V, used: &mut Vec<bool>| -> Option<Vec<V>> {
        let mut path = vec![start];
        let mut current = start;
        loop {
            let next_edge = incident[&current].iter().copied().find(|&e| !used[e]);
            let Some(e) = next_edge else { break };
            used[e] = true;
            let (a, b) = edges[e];
            current = if a == current { b } else { a };
            path.push(current);
            if incident[&current].len() != 2 || current == start {
                break;
            }
        }
        (path.len() > 1).then_some(path)
    };

    // Open paths from endpoints and junctions
    let terminals: Vec<V> = incident
        .iter()
        .filter(|(_, es)| es.len() != 2)
        .map(|(v, _)| *v)
        .collect();
    for v in terminals {
        while incident[&v].iter().any(|&e| !used[e]) {
            if let Some(path) = walk(v, &mut used) {
                paths.push(path);
            }
        }
    }

    // Closed loops
    for i in 0..edges.len() {
        if !used[i] {
            if let Some(path) = walk(edges[i].0, &mut used) {
                paths.push(path);
            }
        }
    }

    paths
}

/// Dissolve a partition into one (multi)polygon per label.
///
/// Rings follow cell edges with the region on the left, so exteriors come
/// out counter-clockwise and holes clockwise. Where a region touches itself
/// at a corner the tracer turns left, keeping every ring simple.
pub fn dissolve(partition: &Raster<i32>) -> BTreeMap<i32, MultiPolygon<f64>> {
    let (rows, cols) = partition.shape();

    // Directed boundary edges per label, keyed by start vertex
    let mut outgoing: BTreeMap<i32, BTreeMap<Vertex, Vec<Vertex>>> = BTreeMap::new();
    for row in 0..rows {
        for col in 0..cols {
            let Some(label) = label_at(partition, row, col) else { continue };
            let differs = |r: Option<usize>, c: Option<usize>| match (r, c) {
                (Some(r), Some(c)) if r < rows && c < cols => label_at(partition, r, c) != Some(label),
                _ => true,
            };
            let sides = outgoing.entry(label).or_default();
            let (tl, tr, br, bl) = ((row, col), (row, col + 1), (row + 1, col + 1), (row + 1, col));

            if differs(Some(row + 1), Some(col)) {
                sides.entry(bl).or_default().push(br);
            }
            if differs(Some(row), Some(col + 1)) {
                sides.entry(br).or_default().push(tr);
            }
            if differs(row.checked_sub(1), Some(col)) {
                sides.entry(tr).or_default().push(tl);
            }
            if differs(Some(row), col.checked_sub(1)) {
                sides.entry(tl).or_default().push(bl);
            }
        }
    }

    outgoing
        .into_iter()
        .map(|(label, mut sides)| {
            let mut rings: Vec<LineString<f64>> = Vec::new();
            while let Some(start) = sides.keys().next().copied() {
                let ring = trace_ring(&mut sides, start);
                rings.push(LineString::new(ring.into_iter().map(|v| corner(partition, v)).collect()));
            }
            (label, assemble_polygons(rings))
        })
        .collect()
}

/// Follow directed edges from `start` until the ring closes, consuming them.
fn trace_ring(sides: &mut BTreeMap<Vertex, Vec<Vertex>>, start: Vertex) -> Vec<Vertex> {
    let mut ring = vec![start];
    let mut current = start;
    let mut heading: Option<(i64, i64)> = None;

    loop {
        let Some(targets) = sides.get_mut(&current) else { break };
        let pick = match heading {
            Some(h) if targets.len() > 1 => targets
                .iter()
                .enumerate()
                .min_by_key(|&(_, &t)| turn_rank(h, step(current, t)))
                .map(|(i, _)| i)
                .unwrap_or(0),
            _ => 0,
        };
        let next = targets.swap_remove(pick);
        if targets.is_empty() {
            sides.remove(&current);
        }

        let dir = step(current, next);
        // Drop the middle vertex of straight runs
        if heading == Some(dir) && ring.len() > 1 {
            ring.pop();
        }
        ring.push(next);
        heading = Some(dir);
        current = next;

        if current == start {
            break;
        }
    }

    ring
}

/// Map-space unit step between grid vertices (x right, y up)
fn step(from: Vertex, to: Vertex) -> (i64, i64) {
    let dx = to.1 as i64 - from.1 as i64;
    let dy = from.0 as i64 - to.0 as i64;
    (dx.signum(), dy.signum())
}

/// 0 = left turn, 1 = straight, 2 = right turn, 3 = reversal
fn turn_rank(heading: (i64, i64), dir: (i64, i64)) -> u8 {
    let cross = heading.0 * dir.1 - heading.1 * dir.0;
    let dot = heading.0 * dir.0 + heading.1 * dir.1;
    match (cross.signum(), dot.signum()) {
        (1, _) => 0,
        (0, 1) => 1,
        (-1, _) => 2,
        _ => 3,
    }
}

/// Sort rings into exteriors (counter-clockwise) and holes (clockwise) and
/// attach each hole to the smallest exterior containing it.
fn assemble_polygons(rings: Vec<LineString<f64>>) -> MultiPolygon<f64> {
    let mut exteriors: Vec<(LineString<f64>, Vec<LineString<f64>>, f64)> = Vec::new();
    let mut holes: Vec<LineString<f64>> = Vec::new();

    for ring in rings {
        let area = Polygon::new(ring.clone(), vec![]).signed_area();
        if area > 0.0 {
            exteriors.push((ring, Vec::new(), area));
        } else if area < 0.0 {
            holes.push(ring);
        }
    }

    for hole in holes {
        let owner = exteriors
            .iter()
            .enumerate()
            .filter(|(_, (ext, _, _))| Polygon::new(ext.clone(), vec![]).contains(&hole))
            .min_by(|a, b| a.1 .2.total_cmp(&b.1 .2))
            .map(|(i, _)| i);
        if let Some(i) = owner {
            exteriors[i].1.push(hole);
        }
    }

    MultiPolygon::new(
        exteriors
            .into_iter()
            .map(|(ext, interiors, _)| Polygon::new(ext, interiors))
            .collect(),
    )
}

/// Distinct labels present in a partition
pub fn partition_labels(partition: &Raster<i32>) -> BTreeSet<i32> {
    partition
        .data()
        .iter()
        .copied()
        .filter(|&v| v != NO_LABEL && !partition.is_nodata(v))
        .collect()
}
