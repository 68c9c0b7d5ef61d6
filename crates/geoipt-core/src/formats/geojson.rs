//! GeoJSON format reader and zone export

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{is_usable_ring, GeometryReader};
use crate::error::{GeoiptError, Result};
use crate::models::{GeometryFeature, GeometryKind, LonLat};

/// GeoJSON format reader
pub struct GeoJsonReader;

impl GeometryReader for GeoJsonReader {
    fn read(&self, source: &str, payload: &str) -> Result<Vec<GeometryFeature>> {
        let document: JsonValue = serde_json::from_str(payload).map_err(|e| self.parse_error(source, e))?;

        let features = self.extract_features(source, &document)?;
        if features.is_empty() {
            return Err(self.parse_error(source, "no Polygon or MultiPolygon features"));
        }

        debug!(source, features = features.len(), "Parsed GeoJSON");
        Ok(features)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json", "geojson"]
    }

    fn format_name(&self) -> &str {
        "GeoJSON"
    }
}

impl GeoJsonReader {
    /// Decode features one at a time so one bad feature does not sink the file
    fn extract_features(&self, source: &str, document: &JsonValue) -> Result<Vec<GeometryFeature>> {
        match document.get("type").and_then(JsonValue::as_str) {
            Some("FeatureCollection") => {
                let items = document
                    .get("features")
                    .and_then(JsonValue::as_array)
                    .ok_or_else(|| self.parse_error(source, "FeatureCollection without a features array"))?;

                Ok(items
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, item)| self.convert_feature(source, idx, item))
                    .collect())
            }
            Some("Feature") => Ok(self.convert_feature(source, 0, document).into_iter().collect()),
            Some(_) => {
                // Bare geometry
                let rings = match serde_json::from_value::<geojson::Geometry>(document.clone()) {
                    Ok(geometry) => polygon_rings(&geometry.value),
                    Err(e) => {
                        debug!(source, error = %e, "Walking loosely typed GeoJSON geometry");
                        loose_polygon_rings(document)
                    }
                };
                Ok(rings
                    .map(|(kind, rings)| GeometryFeature::new(kind, rings, BTreeMap::new()))
                    .into_iter()
                    .collect())
            }
            None => Err(self.parse_error(source, "document has no GeoJSON type")),
        }
    }

    fn convert_feature(&self, source: &str, idx: usize, item: &JsonValue) -> Option<GeometryFeature> {
        let feature: geojson::Feature = match serde_json::from_value(item.clone()) {
            Ok(feature) => feature,
            Err(e) => {
                debug!(source, index = idx, error = %e, "Walking loosely typed GeoJSON feature");
                return self.convert_loose_feature(source, idx, item);
            }
        };

        let geometry = feature.geometry.as_ref()?;
        let (kind, rings) = polygon_rings(&geometry.value)?;

        let attributes = feature
            .properties
            .as_ref()
            .map(|props| props.iter().map(|(k, v)| (k.clone(), stringify(v))).collect())
            .unwrap_or_default();

        Some(GeometryFeature::new(kind, rings, attributes))
    }

    /// Fallback for features the typed decoder rejects, such as a ring
    /// holding a non-numeric position
    fn convert_loose_feature(&self, source: &str, idx: usize, item: &JsonValue) -> Option<GeometryFeature> {
        let Some((kind, rings)) = item.get("geometry").and_then(loose_polygon_rings) else {
            warn!(source, index = idx, "Skipping malformed GeoJSON feature");
            return None;
        };

        let attributes = item
            .get("properties")
            .and_then(JsonValue::as_object)
            .map(|props| props.iter().map(|(k, v)| (k.clone(), stringify(v))).collect())
            .unwrap_or_default();

        Some(GeometryFeature::new(kind, rings, attributes))
    }

    fn parse_error(&self, source: &str, reason: impl std::fmt::Display) -> GeoiptError {
        GeoiptError::GeometryParse {
            path: source.to_string(),
            format: self.format_name().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Parse a GeoJSON payload, logging and returning an empty list on failure
pub fn parse_geojson(payload: &str) -> Vec<GeometryFeature> {
    match GeoJsonReader.read("<inline>", payload) {
        Ok(features) => features,
        Err(e) => {
            warn!(error = %e, "GeoJSON payload yielded no polygons");
            Vec::new()
        }
    }
}

/// Exterior rings of a Polygon or MultiPolygon; other geometry types yield None
fn polygon_rings(value: &geojson::Value) -> Option<(GeometryKind, Vec<Vec<LonLat>>)> {
    let (kind, rings): (GeometryKind, Vec<Vec<LonLat>>) = match value {
        geojson::Value::Polygon(polygon) => (
            GeometryKind::Polygon,
            polygon.first().map(|exterior| to_ring(exterior)).into_iter().collect(),
        ),
        geojson::Value::MultiPolygon(polygons) => (
            GeometryKind::MultiPolygon,
            polygons
                .iter()
                .filter_map(|polygon| polygon.first())
                .map(|exterior| to_ring(exterior))
                .collect(),
        ),
        _ => return None,
    };

    usable_rings(kind, rings)
}

/// Same as [`polygon_rings`] over an untyped geometry object. Positions
/// without two finite numbers are dropped one by one.
fn loose_polygon_rings(geometry: &JsonValue) -> Option<(GeometryKind, Vec<Vec<LonLat>>)> {
    let coordinates = geometry.get("coordinates")?.as_array()?;
    let (kind, exteriors): (GeometryKind, Vec<&JsonValue>) = match geometry.get("type")?.as_str()? {
        "Polygon" => (GeometryKind::Polygon, coordinates.first().into_iter().collect()),
        "MultiPolygon" => (
            GeometryKind::MultiPolygon,
            coordinates
                .iter()
                .filter_map(|polygon| polygon.as_array()?.first())
                .collect(),
        ),
        _ => return None,
    };

    let rings = exteriors
        .into_iter()
        .filter_map(JsonValue::as_array)
        .map(|positions| {
            positions
                .iter()
                .filter_map(|position| match position.as_array()?.as_slice() {
                    [lon, lat, ..] => {
                        let (lon, lat) = (lon.as_f64()?, lat.as_f64()?);
                        (lon.is_finite() && lat.is_finite()).then_some([lon, lat])
                    }
                    _ => None,
                })
                .collect()
        })
        .collect();

    usable_rings(kind, rings)
}

fn usable_rings(kind: GeometryKind, rings: Vec<Vec<LonLat>>) -> Option<(GeometryKind, Vec<Vec<LonLat>>)> {
    let rings: Vec<Vec<LonLat>> = rings.into_iter().filter(|r| is_usable_ring(r)).collect();
    if rings.is_empty() {
        debug!("GeoJSON polygon has no usable exterior ring");
        return None;
    }
    Some((kind, rings))
}

fn to_ring(positions: &[Vec<f64>]) -> Vec<LonLat> {
    positions
        .iter()
        .filter_map(|position| match position.as_slice() {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some([*lon, *lat]),
            _ => None,
        })
        .collect()
}

fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert a zone to a GeoJSON Feature with its attributes as properties
pub fn zone_to_geojson(feature: &GeometryFeature) -> geojson::Feature {
    let rings: Vec<Vec<Vec<f64>>> = feature.rings.iter().map(|ring| closed_positions(ring)).collect();

    let value = if feature.kind == GeometryKind::Polygon && rings.len() == 1 {
        geojson::Value::Polygon(rings)
    } else {
        geojson::Value::MultiPolygon(rings.into_iter().map(|ring| vec![ring]).collect())
    };

    let properties: serde_json::Map<String, JsonValue> = feature
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
        .collect();

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn closed_positions(ring: &[LonLat]) -> Vec<Vec<f64>> {
    let mut positions: Vec<Vec<f64>> = ring.iter().map(|[lon, lat]| vec![*lon, *lat]).collect();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            positions.push(vec![first[0], first[1]]);
        }
    }
    positions
}
