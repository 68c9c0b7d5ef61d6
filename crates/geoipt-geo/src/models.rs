//! Conversions between the core models and the `geo` crate.
//!
//! x is longitude and y is latitude throughout.

use geo::algorithm::bounding_rect::BoundingRect;
use geo::{coord, Coord, LineString, MultiPolygon, Polygon, Rect};

use geoipt_core::models::{BoundingBox, GeometryFeature, LonLat};

/// Convert a `[lon, lat]` ring to a closed geo::LineString
pub fn ring_to_line_string(ring: &[LonLat]) -> LineString<f64> {
    let coords: Vec<Coord<f64>> = ring.iter().map(|&[x, y]| coord! { x: x, y: y }).collect();
    let mut line = LineString::new(coords);
    line.close();
    line
}

/// Every ring becomes the exterior of its own polygon
pub fn feature_to_multi_polygon(feature: &GeometryFeature) -> MultiPolygon<f64> {
    MultiPolygon::new(
        feature
            .rings
            .iter()
            .map(|ring| Polygon::new(ring_to_line_string(ring), vec![]))
            .collect(),
    )
}

/// Bounding box of all rings of a feature
pub fn feature_bounds(feature: &GeometryFeature) -> Option<BoundingBox> {
    feature_to_multi_polygon(feature)
        .bounding_rect()
        .and_then(|rect| rect.to_bounding_box())
}

/// Union of the bounds of several features
pub fn features_bounds(features: &[GeometryFeature]) -> Option<BoundingBox> {
    features
        .iter()
        .filter_map(feature_bounds)
        .reduce(|a, b| {
            BoundingBox::new(
                a.north().max(b.north()),
                a.east().max(b.east()),
                a.south().min(b.south()),
                a.west().min(b.west()),
            )
            .unwrap_or(a)
        })
}

/// Extension trait for BoundingBox with geo-crate conversions
pub trait BoundingBoxExt {
    /// Convert to geo::Rect (min = south-west, max = north-east)
    fn to_rect(&self) -> Rect<f64>;
}

impl BoundingBoxExt for BoundingBox {
    fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.west(), y: self.south() },
            coord! { x: self.east(), y: self.north() },
        )
    }
}

/// Conversion back from geo::Rect
pub trait RectExt {
    fn to_bounding_box(&self) -> Option<BoundingBox>;
}

impl RectExt for Rect<f64> {
    fn to_bounding_box(&self) -> Option<BoundingBox> {
        let (min, max) = (self.min(), self.max());
        BoundingBox::new(max.y, max.x, min.y, min.x).ok()
    }
}
