//! GeoJSON reading/writing for feature layers
//!
//! Uses the `geojson` crate for parsing and its `geo-types` conversions for
//! geometries. The legacy `crs` member (GeoJSON 2008) is honoured on read and
//! written back when the collection carries a CRS.

use crate::crs::CRS;
use crate::error::Result;
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::{feature::Id, GeoJson, JsonObject, JsonValue};
use std::fs;
use std::path::Path;

/// Read a GeoJSON file into a FeatureCollection
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    read_geojson_from_str(&text)
}

/// Parse GeoJSON text into a FeatureCollection
///
/// A bare Feature or Geometry is wrapped into a one-feature collection.
pub fn read_geojson_from_str(text: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = text.parse()?;

    let (features, foreign) = match geojson {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(f) => (vec![f], None),
        GeoJson::Geometry(g) => (
            vec![geojson::Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            None,
        ),
    };

    let mut collection = FeatureCollection::new();
    collection.crs = foreign.as_ref().and_then(crs_from_members);

    for feature in features {
        let geometry = match feature.geometry {
            Some(g) => Some(geo_types::Geometry::<f64>::try_from(g)?),
            None => None,
        };

        let mut out = Feature {
            geometry,
            properties: Default::default(),
            id: feature.id.map(|id| match id {
                Id::String(s) => s,
                Id::Number(n) => n.to_string(),
            }),
        };

        if let Some(props) = feature.properties {
            for (key, value) in props {
                if !collection.fields.contains(&key) {
                    collection.fields.push(key.clone());
                }
                out.properties.insert(key, attribute_from_json(value));
            }
        }

        collection.features.push(out);
    }

    Ok(collection)
}

/// Write a FeatureCollection to a GeoJSON file
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    fs::write(path.as_ref(), to_geojson_string(collection)?)?;
    Ok(())
}

/// Serialize a FeatureCollection to GeoJSON text
pub fn to_geojson_string(collection: &FeatureCollection) -> Result<String> {
    let features = collection
        .features
        .iter()
        .map(|f| {
            let mut properties = JsonObject::new();
            for field in &collection.fields {
                if let Some(value) = f.properties.get(field) {
                    properties.insert(field.clone(), attribute_to_json(value));
                }
            }

            geojson::Feature {
                bbox: None,
                geometry: f
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: f.id.clone().map(Id::String),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let foreign_members = collection.crs.as_ref().map(|crs| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            serde_json::json!({ "type": "name", "properties": { "name": crs.urn() } }),
        );
        members
    });

    let fc = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    };

    Ok(serde_json::to_string_pretty(&fc)?)
}

fn crs_from_members(members: &JsonObject) -> Option<CRS> {
    members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(CRS::from_name)
}

fn attribute_from_json(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::from(*i),
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}
