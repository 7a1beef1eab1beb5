//! Border extraction parameters and legacy argument normalization

use carto_core::{Error, FeatureCollection, Result};
use tracing::warn;

/// Attribute holding the region identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub enum IdField {
    /// First attribute of the layer's table
    #[default]
    FirstField,
    /// Attribute by name
    Name(String),
    /// Attribute by position in the table (0-based)
    Index(usize),
}

impl IdField {
    /// Resolve to an attribute name of `collection`
    pub fn resolve(&self, collection: &FeatureCollection) -> Result<String> {
        match self {
            IdField::FirstField => collection
                .fields
                .first()
                .cloned()
                .ok_or_else(|| Error::MissingField("<first attribute>".into())),
            IdField::Name(name) => {
                if collection.field_index(name).is_some() {
                    Ok(name.clone())
                } else {
                    Err(Error::MissingField(name.clone()))
                }
            }
            IdField::Index(i) => collection
                .fields
                .get(*i)
                .cloned()
                .ok_or_else(|| Error::MissingField(format!("#{}", i))),
        }
    }
}

/// Parameters for border extraction
#[derive(Debug, Clone, Default)]
pub struct BorderParams {
    /// Identifier attribute
    pub id_field: IdField,
    /// Grid cell size in map units.
    /// `None` uses `round(max(extent width, extent height) / 150)`.
    pub resolution: Option<f64>,
    /// Search distance in map units; also the margin around the layer extent.
    /// `None` uses `round(max(extent width, extent height) / 20)`.
    pub width: Option<f64>,
}

impl BorderParams {
    pub fn with_id(mut self, name: impl Into<String>) -> Self {
        self.id_field = IdField::Name(name.into());
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Reject non-positive or non-finite distances before any grid work
    pub fn validate(&self) -> Result<()> {
        check_positive("resolution", self.resolution)?;
        check_positive("width", self.width)
    }
}

fn check_positive(name: &'static str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(Error::InvalidParameter {
            name,
            value: v.to_string(),
            reason: "must be a positive, finite distance".into(),
        }),
        _ => Ok(()),
    }
}

/// Arguments as accepted by older releases.
///
/// `spdfid` was the identifier attribute before it was renamed to `id`.
/// [`LegacyBorderArgs::normalize`] maps everything onto [`BorderParams`] so
/// the old names never reach the algorithms.
#[derive(Debug, Clone, Default)]
pub struct LegacyBorderArgs {
    pub id: Option<String>,
    /// Deprecated alias of `id`
    pub spdfid: Option<String>,
    pub res: Option<f64>,
    pub width: Option<f64>,
}

impl LegacyBorderArgs {
    pub fn normalize(self) -> BorderParams {
        let id_field = match (self.id, self.spdfid) {
            (Some(id), Some(old)) => {
                warn!("`spdfid` is deprecated and ignored when `id` is set (got spdfid = {old})");
                IdField::Name(id)
            }
            (Some(id), None) => IdField::Name(id),
            (None, Some(old)) => {
                warn!("`spdfid` is deprecated, use `id` instead");
                IdField::Name(old)
            }
            (None, None) => IdField::FirstField,
        };

        BorderParams {
            id_field,
            resolution: self.res,
            width: self.width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> FeatureCollection {
        FeatureCollection::with_fields(["code", "name"])
    }

    #[test]
    fn test_resolve_id_field() {
        let fc = layer();
        assert_eq!(IdField::FirstField.resolve(&fc).unwrap(), "code");
        assert_eq!(IdField::Index(1).resolve(&fc).unwrap(), "name");
        assert_eq!(IdField::Name("name".into()).resolve(&fc).unwrap(), "name");
        assert!(matches!(
            IdField::Name("iso".into()).resolve(&fc),
            Err(Error::MissingField(_))
        ));
        assert!(IdField::Index(5).resolve(&fc).is_err());
        assert!(IdField::FirstField.resolve(&FeatureCollection::new()).is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        assert!(BorderParams::default().validate().is_ok());
        assert!(BorderParams::default().with_resolution(0.0).validate().is_err());
        assert!(BorderParams::default().with_width(-1.0).validate().is_err());
        assert!(BorderParams::default().with_width(f64::NAN).validate().is_err());
        assert!(BorderParams::default().with_resolution(0.5).with_width(3.0).validate().is_ok());
    }

    #[test]
    fn test_legacy_spdfid_maps_to_id() {
        let params = LegacyBorderArgs {
            spdfid: Some("code".into()),
            res: Some(2.0),
            ..Default::default()
        }
        .normalize();
        assert_eq!(params.id_field, IdField::Name("code".into()));
        assert_eq!(params.resolution, Some(2.0));
    }

    #[test]
    fn test_new_name_wins_over_legacy() {
        let params = LegacyBorderArgs {
            id: Some("name".into()),
            spdfid: Some("code".into()),
            ..Default::default()
        }
        .normalize();
        assert_eq!(params.id_field, IdField::Name("name".into()));
        assert_eq!(LegacyBorderArgs::default().normalize().id_field, IdField::FirstField);
    }
}
