//! Geometry format readers
//!
//! Each geometry encoding implements [`GeometryReader`], and the
//! [`FormatRegistry`] dispatches a file to its reader by extension.

use crate::error::{GeoiptError, Result};
use crate::models::{GeometryFeature, LonLat};

pub mod geojson;
pub mod kml;

pub use self::geojson::{parse_geojson, zone_to_geojson, GeoJsonReader};
pub use self::kml::{parse_kml, write_zone_kml, KmlReader};

/// Rings with fewer vertices than this are degenerate and dropped
pub const MIN_RING_VERTICES: usize = 3;

/// Reader that turns a raw geometry payload into polygon features
pub trait GeometryReader: Send + Sync {
    /// Parse a payload.
    ///
    /// `source` only labels errors and log lines. A payload without any
    /// usable polygon ring is an error.
    fn read(&self, source: &str, payload: &str) -> Result<Vec<GeometryFeature>>;

    /// Get supported file extensions (e.g., ["kml"])
    fn supported_extensions(&self) -> &[&str];

    /// Get human-readable format name (e.g., "KML", "GeoJSON")
    fn format_name(&self) -> &str;
}

/// Central registry for geometry readers
pub struct FormatRegistry {
    readers: Vec<Box<dyn GeometryReader>>,
}

impl FormatRegistry {
    /// Create a new empty format registry
    pub fn new() -> Self {
        Self { readers: Vec::new() }
    }

    /// Registry with the KML and GeoJSON readers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(KmlReader));
        registry.register(Box::new(GeoJsonReader));
        registry
    }

    /// Register a geometry reader
    pub fn register(&mut self, reader: Box<dyn GeometryReader>) {
        self.readers.push(reader);
    }

    /// Pick the reader for a file name by its (case-insensitive) extension
    pub fn detect_format(&self, file_name: &str) -> Result<&dyn GeometryReader> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .ok_or_else(|| GeoiptError::UnsupportedFormat {
                extension: "none".to_string(),
                supported: self.supported_formats(),
            })?;

        self.readers
            .iter()
            .find(|r| r.supported_extensions().contains(&extension.as_str()))
            .map(|r| r.as_ref())
            .ok_or_else(|| GeoiptError::UnsupportedFormat {
                extension,
                supported: self.supported_formats(),
            })
    }

    /// Get list of all supported format extensions
    pub fn supported_formats(&self) -> Vec<String> {
        self.readers
            .iter()
            .flat_map(|r| r.supported_extensions())
            .map(|s| s.to_string())
            .collect()
    }

    /// Get all registered readers
    pub fn readers(&self) -> &[Box<dyn GeometryReader>] {
        &self.readers
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

pub(crate) fn is_usable_ring(ring: &[LonLat]) -> bool {
    ring.len() >= MIN_RING_VERTICES
}
