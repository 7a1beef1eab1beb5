//! Borders between regions that touch in the input
//!
//! Two regions touch where a ring segment of one lies on a ring segment of
//! the other. Those overlaps are collected per label pair and chained into
//! lines; no grid is involved, so the result follows the input vertices.

use std::collections::{BTreeMap, BTreeSet};

use geo::{Coord, Line, LineString, MultiLineString};
use tracing::debug;

use super::regions::Regions;
use super::vectorize::{chain_edges, LabelPair};
use crate::vector::BoundingBox;

/// Snapped vertex used to join overlap pieces
type Key = (i64, i64);

struct RegionOutline {
    label: i32,
    segments: Vec<Line<f64>>,
    bounds: BoundingBox,
}

/// Shared boundary of every pair of regions touching along a segment.
///
/// Segments are matched when both endpoints of one lie within
/// `1e-9 * extent` of the other's supporting line and their overlap is
/// longer than that tolerance. Contact at a single point is ignored.
pub fn touching_boundaries(regions: &Regions) -> BTreeMap<LabelPair, MultiLineString<f64>> {
    let extent = regions.bounds().max_side();
    let eps = if extent > 0.0 { extent * 1e-9 } else { 1e-9 };

    let outlines = outlines(regions);
    let mut result = BTreeMap::new();

    for (i, a) in outlines.iter().enumerate() {
        for b in &outlines[i + 1..] {
            if !a.bounds.intersects(&b.bounds, eps) {
                continue;
            }

            let mut edges: BTreeSet<(Key, Key)> = BTreeSet::new();
            let mut coords: BTreeMap<Key, Coord<f64>> = BTreeMap::new();
            for p in &a.segments {
                for q in &b.segments {
                    let Some(overlap) = collinear_overlap(p, q, eps) else { continue };
                    let (k0, k1) = (snap(overlap.start, eps), snap(overlap.end, eps));
                    if k0 == k1 {
                        continue;
                    }
                    coords.entry(k0).or_insert(overlap.start);
                    coords.entry(k1).or_insert(overlap.end);
                    edges.insert((k0.min(k1), k0.max(k1)));
                }
            }
            if edges.is_empty() {
                continue;
            }

            let edges: Vec<(Key, Key)> = edges.into_iter().collect();
            let lines = chain_edges(&edges)
                .into_iter()
                .map(|path| LineString::new(path.iter().map(|k| coords[k]).collect()))
                .collect();
            result.insert((a.label.min(b.label), a.label.max(b.label)), MultiLineString::new(lines));
        }
    }

    debug!("{} touching region pair(s)", result.len());
    result
}

fn outlines(regions: &Regions) -> Vec<RegionOutline> {
    let mut by_label: BTreeMap<i32, RegionOutline> = BTreeMap::new();
    for (label, polygon) in regions.parts() {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for ring in rings {
            let Some((first, rest)) = ring.0.split_first() else { continue };
            let ring_bounds = rest.iter().fold(
                BoundingBox::new(first.x, first.y, first.x, first.y),
                |bb, c| bb.union(&BoundingBox::new(c.x, c.y, c.x, c.y)),
            );
            let outline = by_label.entry(*label).or_insert_with(|| RegionOutline {
                label: *label,
                segments: Vec::new(),
                bounds: ring_bounds,
            });
            outline.bounds = outline.bounds.union(&ring_bounds);
            outline.segments.extend(ring.lines().filter(|l| l.start != l.end));
        }
    }
    by_label.into_values().collect()
}

/// Common stretch of two segments lying on the same line.
///
/// Endpoints of the result are always endpoints of `p` or `q`, so pieces cut
/// from neighbouring segments meet exactly.
fn collinear_overlap(p: &Line<f64>, q: &Line<f64>, eps: f64) -> Option<Line<f64>> {
    let d = p.delta();
    let len = d.x.hypot(d.y);
    if len <= eps {
        return None;
    }
    let (ux, uy) = (d.x / len, d.y / len);

    let offset = |c: Coord<f64>| ((c.x - p.start.x) * uy - (c.y - p.start.y) * ux).abs();
    if offset(q.start) > eps || offset(q.end) > eps {
        return None;
    }

    let along = |c: Coord<f64>| (c.x - p.start.x) * ux + (c.y - p.start.y) * uy;
    let (t0, t1) = (along(q.start), along(q.end));
    let lo = t0.min(t1).max(0.0);
    let hi = t0.max(t1).min(len);
    if hi - lo <= eps {
        return None;
    }

    let candidates = [(0.0, p.start), (len, p.end), (t0, q.start), (t1, q.end)];
    let at = |t: f64| {
        candidates
            .iter()
            .find(|(s, _)| *s == t)
            .map(|(_, c)| *c)
            .unwrap_or(Coord { x: p.start.x + ux * t, y: p.start.y + uy * t })
    };
    Some(Line::new(at(lo), at(hi)))
}

fn snap(c: Coord<f64>, eps: f64) -> Key {
    ((c.x / eps).round() as i64, (c.y / eps).round() as i64)
}
