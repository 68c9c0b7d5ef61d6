//! Parsed polygon features shared by the KML and GeoJSON readers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A `[lon, lat]` vertex in WGS84 degrees
pub type LonLat = [f64; 2];

/// Attribute keys tried, in order, when naming a polygon for display
const DISPLAY_NAME_KEYS: &[&str] = &["name", "Nombre", "NOMBRE", "ZONA", "Zona", "CODIGO"];

/// Attribute keys tried, in order, when labelling an exported zone
const ZONE_LABEL_KEYS: &[&str] = &["NOM", "ZONA", "NOMBRE_PM"];

/// Geometry type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GeometryKind {
    #[default]
    Polygon,
    MultiPolygon,
}

/// One polygon-bearing feature from a KML Placemark or a GeoJSON Feature.
///
/// Each ring is an outer boundary. Holes are not represented, so a point
/// inside a hole of the source polygon is reported as contained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryFeature {
    pub kind: GeometryKind,
    pub rings: Vec<Vec<LonLat>>,
    pub attributes: BTreeMap<String, String>,
}

impl GeometryFeature {
    pub fn new(kind: GeometryKind, rings: Vec<Vec<LonLat>>, attributes: BTreeMap<String, String>) -> Self {
        Self { kind, rings, attributes }
    }

    /// Convenience constructor for a single-ring polygon without attributes
    pub fn polygon(ring: Vec<LonLat>) -> Self {
        Self::new(GeometryKind::Polygon, vec![ring], BTreeMap::new())
    }

    /// Add an attribute, builder style
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Total vertex count across all rings
    pub fn vertex_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }

    /// Human readable name for reports
    pub fn display_name(&self) -> String {
        self.first_attribute(DISPLAY_NAME_KEYS)
            .unwrap_or("Polígono sin nombre")
            .to_string()
    }

    /// Zone label used as the Placemark name on export
    pub fn zone_label(&self) -> String {
        self.first_attribute(ZONE_LABEL_KEYS)
            .unwrap_or("Zona consultada")
            .to_string()
    }

    fn first_attribute(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.attribute(k))
            .find(|v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<LonLat> {
        vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]
    }

    #[test]
    fn test_display_name_fallbacks() {
        let feature = GeometryFeature::polygon(square());
        assert_eq!(feature.display_name(), "Polígono sin nombre");

        let feature = feature.with_attribute("ZONA", "H1");
        assert_eq!(feature.display_name(), "H1");

        let feature = feature.with_attribute("NOMBRE", "Zona Habitacional");
        assert_eq!(feature.display_name(), "Zona Habitacional");
    }

    #[test]
    fn test_display_name_skips_blank_values() {
        let feature = GeometryFeature::polygon(square())
            .with_attribute("name", "  ")
            .with_attribute("CODIGO", "ZU-3");
        assert_eq!(feature.display_name(), "ZU-3");
    }

    #[test]
    fn test_zone_label() {
        let feature = GeometryFeature::polygon(square());
        assert_eq!(feature.zone_label(), "Zona consultada");

        let feature = feature.with_attribute("NOMBRE_PM", "PRC Copiapó");
        assert_eq!(feature.zone_label(), "PRC Copiapó");

        let feature = feature.with_attribute("ZONA", "ZH-2");
        assert_eq!(feature.zone_label(), "ZH-2");
    }

    #[test]
    fn test_serialization() {
        let feature = GeometryFeature::polygon(square()).with_attribute("ZONA", "H1");
        let json = serde_json::to_string(&feature).unwrap();
        assert!(json.contains("\"Polygon\""));

        let parsed: GeometryFeature = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, feature);
        assert_eq!(parsed.vertex_count(), 5);
    }
}
