//! End-to-end border extraction scenarios on small synthetic layers.
//!
//! Layers are built from axis-aligned squares in a projected CRS so the
//! expected adjacency can be worked out by hand.

use std::collections::BTreeSet;

use carto_algorithms::borders::{
    all_borders, inner_borders, outer_borders, partition_polygons, BorderParams,
    LegacyBorderArgs,
};
use carto_algorithms::vector::BoundingBox;
use carto_core::io::{read_geojson_from_str, to_geojson_string};
use carto_core::{AttributeValue, Error, Feature, FeatureCollection, CRS};
use geo::{Geometry, Polygon};

fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
    BoundingBox::new(x0, y0, x0 + size, y0 + size).to_polygon()
}

fn layer(polys: Vec<(AttributeValue, Polygon<f64>)>) -> FeatureCollection {
    let mut fc = FeatureCollection::with_fields(["code", "name"]);
    fc.crs = Some(CRS::from_epsg(2154));
    for (id, p) in polys {
        let name = format!("region {id}");
        fc.push(
            Feature::new(Geometry::Polygon(p))
                .with_property("code", id)
                .with_property("name", name),
        );
    }
    fc
}

/// A, B, C in a row, 8 units wide, 2-unit gaps
fn three_squares() -> FeatureCollection {
    layer(vec![
        ("A".into(), square(0.0, 0.0, 8.0)),
        ("B".into(), square(10.0, 0.0, 8.0)),
        ("C".into(), square(20.0, 0.0, 8.0)),
    ])
}

fn pairs(borders: &FeatureCollection) -> BTreeSet<(String, String)> {
    borders
        .iter()
        .map(|f| {
            let id1 = f.get_property("id1").map(ToString::to_string).unwrap_or_default();
            let id2 = f.get_property("id2").map(ToString::to_string).unwrap_or_default();
            (id1, id2)
        })
        .collect()
}

fn pair(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

fn params(resolution: f64, width: f64) -> BorderParams {
    BorderParams::default()
        .with_resolution(resolution)
        .with_width(width)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn three_squares_border_only_their_neighbours() {
    let out = outer_borders(&three_squares(), &params(1.0, 5.0)).unwrap();

    let expected: BTreeSet<_> = [pair("A", "B"), pair("B", "C")].into_iter().collect();
    assert_eq!(pairs(&out), expected);
}

#[test]
fn single_square_has_no_borders() {
    let fc = layer(vec![("A".into(), square(0.0, 0.0, 8.0))]);
    let out = outer_borders(&fc, &params(1.0, 5.0)).unwrap();
    assert!(out.is_empty());
}

#[test]
fn one_identifier_over_many_features_has_no_borders() {
    let fc = layer(vec![
        ("A".into(), square(0.0, 0.0, 8.0)),
        ("A".into(), square(10.0, 0.0, 8.0)),
        ("A".into(), square(20.0, 0.0, 8.0)),
    ]);
    assert!(outer_borders(&fc, &params(1.0, 5.0)).unwrap().is_empty());
    assert!(inner_borders(&fc, &params(1.0, 5.0)).unwrap().is_empty());
}

/// A and B 8 units wide with a 6-unit gap
fn gap_of_six() -> FeatureCollection {
    layer(vec![
        ("A".into(), square(0.0, 0.0, 8.0)),
        ("B".into(), square(14.0, 0.0, 8.0)),
    ])
}

#[test]
fn width_well_below_half_gap_gives_nothing() {
    let out = outer_borders(&gap_of_six(), &params(1.0, 2.0)).unwrap();
    assert!(out.is_empty());
}

#[test]
fn width_reaching_from_both_sides_bridges_gap() {
    // Each region claims cells up to `width` away, so the gap closes at 2 x width
    let out = outer_borders(&gap_of_six(), &params(1.0, 4.0)).unwrap();
    assert_eq!(pairs(&out), [pair("A", "B")].into_iter().collect());
}

#[test]
fn gap_closes_at_twice_the_width() {
    let fc = gap_of_six();
    assert!(outer_borders(&fc, &params(1.0, 2.5)).unwrap().is_empty());
    assert!(outer_borders(&fc, &params(1.0, 2.9)).unwrap().is_empty());

    let at = outer_borders(&fc, &params(1.0, 3.0)).unwrap();
    assert_eq!(pairs(&at), [pair("A", "B")].into_iter().collect());
    let above = outer_borders(&fc, &params(1.0, 3.1)).unwrap();
    assert_eq!(pairs(&above), [pair("A", "B")].into_iter().collect());
}

#[test]
fn oversized_grid_is_an_error() {
    let err = outer_borders(&gap_of_six(), &params(1.0, 1e10)).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { .. }), "unexpected error {err}");

    let err = partition_polygons(&gap_of_six(), &params(1e-5, 1.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { .. }), "unexpected error {err}");
}

#[test]
fn thin_strips_with_default_parameters() {
    // 990 x 10 strips side by side; round(2990 / 150) is coarser than their height
    let fc = layer(vec![
        ("A".into(), BoundingBox::new(0.0, 0.0, 990.0, 10.0).to_polygon()),
        ("B".into(), BoundingBox::new(1000.0, 0.0, 1990.0, 10.0).to_polygon()),
        ("C".into(), BoundingBox::new(2000.0, 0.0, 2990.0, 10.0).to_polygon()),
    ]);
    let found = pairs(&outer_borders(&fc, &BorderParams::default()).unwrap());
    let expected: BTreeSet<_> = [pair("A", "B"), pair("B", "C")].into_iter().collect();
    assert_eq!(found, expected);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn rows_are_labeled_consistently() {
    let fc = three_squares();
    let inputs: BTreeSet<String> = fc.column("code").iter().map(ToString::to_string).collect();
    let out = outer_borders(&fc, &params(1.0, 5.0)).unwrap();

    assert_eq!(out.fields, vec!["id", "id1", "id2"]);
    for (n, row) in out.iter().enumerate() {
        let id = row.get_property("id").unwrap().to_string();
        let id1 = row.get_property("id1").unwrap().to_string();
        let id2 = row.get_property("id2").unwrap().to_string();

        assert_ne!(id1, id2);
        assert!(inputs.contains(&id1) && inputs.contains(&id2));
        assert_eq!(id, format!("{id1}_{id2}"));
        assert_eq!(row.id.as_deref(), Some(format!("{}_o", n + 1).as_str()));
        assert_eq!(row.properties.len(), 3);
    }
}

#[test]
fn extraction_is_deterministic() {
    let fc = three_squares();
    let first = outer_borders(&fc, &params(1.0, 5.0)).unwrap();
    let second = outer_borders(&fc, &params(1.0, 5.0)).unwrap();

    assert_eq!(pairs(&first), pairs(&second));
    let geoms = |c: &FeatureCollection| c.iter().map(|f| f.geometry.clone()).collect::<Vec<_>>();
    assert_eq!(geoms(&first), geoms(&second));
}

#[test]
fn finer_resolution_keeps_pairs() {
    let fc = three_squares();
    let coarse = pairs(&outer_borders(&fc, &params(2.0, 5.0)).unwrap());
    let fine = pairs(&outer_borders(&fc, &params(1.0, 5.0)).unwrap());
    assert!(coarse.is_subset(&fine), "coarse {coarse:?} not within fine {fine:?}");
}

#[test]
fn border_runs_through_the_gap() {
    let out = outer_borders(&three_squares(), &params(1.0, 5.0)).unwrap();
    let ab = out
        .iter()
        .find(|f| f.get_property("id") == Some(&AttributeValue::from("A_B")))
        .unwrap();

    let Some(Geometry::MultiLineString(lines)) = &ab.geometry else {
        panic!("border geometry should be a MultiLineString");
    };
    for c in lines.0.iter().flat_map(|ls| ls.coords()) {
        assert!((7.0..=11.0).contains(&c.x), "vertex {c:?} outside the A-B gap");
        assert!((-5.0..=13.0).contains(&c.y), "vertex {c:?} outside the grid");
    }
}

#[test]
fn numeric_identifiers_keep_their_type() {
    let fc = layer(vec![
        (AttributeValue::Int(10), square(0.0, 0.0, 8.0)),
        (AttributeValue::Int(20), square(10.0, 0.0, 8.0)),
    ]);
    let out = outer_borders(&fc, &params(1.0, 5.0)).unwrap();

    assert_eq!(out.len(), 1);
    let row = &out.features[0];
    assert_eq!(row.get_property("id"), Some(&AttributeValue::from("10_20")));
    assert_eq!(row.get_property("id1"), Some(&AttributeValue::Int(10)));
    assert_eq!(row.get_property("id2"), Some(&AttributeValue::Int(20)));
}

#[test]
fn default_parameters_scale_with_extent() {
    let fc = layer(vec![
        ("A".into(), square(0.0, 0.0, 8000.0)),
        ("B".into(), square(10000.0, 0.0, 8000.0)),
        ("C".into(), square(20000.0, 0.0, 8000.0)),
    ]);
    let found = pairs(&outer_borders(&fc, &BorderParams::default()).unwrap());
    assert!(found.contains(&pair("A", "B")));
    assert!(found.contains(&pair("B", "C")));
    assert!(!found.contains(&pair("A", "C")));
}

#[test]
fn identifier_field_selection() {
    let fc = three_squares();
    let by_name = outer_borders(&fc, &params(1.0, 5.0).with_id("name")).unwrap();
    assert!(pairs(&by_name).contains(&pair("region A", "region B")));

    let legacy = LegacyBorderArgs {
        spdfid: Some("name".into()),
        res: Some(1.0),
        width: Some(5.0),
        ..Default::default()
    }
    .normalize();
    let by_legacy = outer_borders(&fc, &legacy).unwrap();
    assert_eq!(pairs(&by_name), pairs(&by_legacy));
}

#[test]
fn inner_and_outer_combined() {
    let fc = layer(vec![
        ("A".into(), square(0.0, 0.0, 8.0)),
        ("B".into(), square(8.0, 0.0, 8.0)),
        ("C".into(), square(18.0, 0.0, 8.0)),
    ]);
    let inner = inner_borders(&fc, &params(1.0, 5.0)).unwrap();
    assert_eq!(pairs(&inner), [pair("A", "B")].into_iter().collect());

    let all = all_borders(&fc, &params(1.0, 5.0)).unwrap();
    let ids: Vec<&str> = all.iter().filter_map(|f| f.id.as_deref()).collect();
    let unique: BTreeSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());
    assert!(pairs(&all).contains(&pair("B", "C")));
}

// ---------------------------------------------------------------------------
// GeoJSON round trip
// ---------------------------------------------------------------------------

#[test]
fn geojson_layer_to_borders_and_back() {
    let text = r#"{
      "type": "FeatureCollection",
      "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::3035" } },
      "features": [
        { "type": "Feature", "properties": { "iso": "FR", "pop": 68 },
          "geometry": { "type": "Polygon", "coordinates": [[[0,0],[8,0],[8,8],[0,8],[0,0]]] } },
        { "type": "Feature", "properties": { "iso": "GB", "pop": 67 },
          "geometry": { "type": "Polygon", "coordinates": [[[10,0],[18,0],[18,8],[10,8],[10,0]]] } }
      ]
    }"#;
    let fc = read_geojson_from_str(text).unwrap();
    assert_eq!(fc.fields[0], "iso");

    let out = outer_borders(&fc, &params(1.0, 5.0)).unwrap();
    assert_eq!(pairs(&out), [pair("FR", "GB")].into_iter().collect());

    let written = to_geojson_string(&out).unwrap();
    let back = read_geojson_from_str(&written).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back.features[0].id.as_deref(), Some("1_o"));
    assert_eq!(back.features[0].get_property("id"), Some(&AttributeValue::from("FR_GB")));
    assert_eq!(back.crs.as_ref().and_then(|c| c.epsg()), Some(3035));
}
