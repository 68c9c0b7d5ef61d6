use serde::{Deserialize, Serialize};

use super::geometry::GeometryFeature;
use crate::error::{GeoiptError, Result};

/// Clicked map location in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub lat: f64,
    pub lon: f64,
}

impl QueryPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check the point is a usable WGS84 coordinate
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(GeoiptError::InvalidQueryPoint {
                reason: format!("non-finite coordinate ({}, {})", self.lat, self.lon),
            });
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(GeoiptError::InvalidQueryPoint {
                reason: format!("latitude {} outside [-90, 90]", self.lat),
            });
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(GeoiptError::InvalidQueryPoint {
                reason: format!("longitude {} outside [-180, 180]", self.lon),
            });
        }
        Ok(())
    }
}

/// One polygon containing the query point, with the file it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub source_file: String,
    pub folder_key: String,
    pub feature: GeometryFeature,
}

impl MatchResult {
    /// Storage path of the source file relative to the layers root
    pub fn source_path(&self) -> String {
        if self.folder_key.is_empty() {
            self.source_file.clone()
        } else {
            format!("{}/{}", self.folder_key, self.source_file)
        }
    }
}
