//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG codes of geographic (longitude/latitude) systems commonly found in
/// thematic map layers.
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4258, 4269, 4267, 4171, 4674, 4283, 4612, 4019, 4030];

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation (primary)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// Parse a CRS name as found in GeoJSON `crs` members.
    ///
    /// Accepts `urn:ogc:def:crs:EPSG::2154`, `EPSG:2154`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84` and PROJ strings. Anything else is
    /// kept as WKT text.
    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.ends_with("CRS84") {
            return Self::from_epsg(4326);
        }
        if trimmed.starts_with('+') {
            return Self::from_proj(trimmed);
        }
        let upper = trimmed.to_ascii_uppercase();
        if let Some(pos) = upper.find("EPSG:") {
            let code = upper[pos + 5..].trim_start_matches(':');
            let digits: String = code.chars().take_while(|c| c.is_ascii_digit()).collect();
            if let Ok(code) = digits.parse::<u32>() {
                return Self::from_epsg(code);
            }
        }
        Self::from_wkt(trimmed)
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Whether coordinates in this CRS are angular longitude/latitude.
    ///
    /// Distances computed on such coordinates are not metric, so planar
    /// algorithms reject them.
    pub fn is_geographic(&self) -> bool {
        if let Some(code) = self.epsg {
            return GEOGRAPHIC_EPSG.contains(&code);
        }
        if let Some(proj) = &self.proj {
            return proj.contains("+proj=longlat") || proj.contains("+proj=latlong");
        }
        if let Some(wkt) = &self.wkt {
            let head = wkt.trim_start().to_ascii_uppercase();
            return head.starts_with("GEOGCS") || head.starts_with("GEOGCRS");
        }
        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", wkt.chars().take(50).collect::<String>());
        }
        "Unknown".to_string()
    }

    /// Name written to the GeoJSON `crs` member
    pub fn urn(&self) -> String {
        match self.epsg {
            Some(code) => format!("urn:ogc:def:crs:EPSG::{}", code),
            None => self.identifier(),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(2154);
        assert_eq!(crs.epsg(), Some(2154));
        assert_eq!(crs.identifier(), "EPSG:2154");
        assert!(!crs.is_geographic());
    }

    #[test]
    fn test_crs_from_name() {
        assert_eq!(CRS::from_name("urn:ogc:def:crs:EPSG::3035").epsg(), Some(3035));
        assert_eq!(CRS::from_name("EPSG:2154").epsg(), Some(2154));
        assert_eq!(CRS::from_name("urn:ogc:def:crs:OGC:1.3:CRS84").epsg(), Some(4326));
        assert!(CRS::from_name("+proj=longlat +datum=WGS84").proj().is_some());
    }

    #[test]
    fn test_geographic_detection() {
        assert!(CRS::wgs84().is_geographic());
        assert!(CRS::from_proj("+proj=longlat +ellps=GRS80").is_geographic());
        assert!(CRS::from_wkt("GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\"]]").is_geographic());
        assert!(!CRS::from_wkt("PROJCS[\"RGF93 / Lambert-93\"]").is_geographic());
        assert!(!CRS::from_proj("+proj=laea +lat_0=52 +lon_0=10").is_geographic());
    }

    #[test]
    fn test_crs_urn() {
        assert_eq!(CRS::wgs84().epsg(), Some(4326));
        assert_eq!(CRS::from_epsg(2154).urn(), "urn:ogc:def:crs:EPSG::2154");
    }
}
