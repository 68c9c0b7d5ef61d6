use geoipt_core::models::{GeometryFeature, LonLat, QueryPoint};

/// Stand-in for a zero denominator in the crossing test
pub const RAY_CAST_EPSILON: f64 = 1e-12;

/// Even-odd crossing test of a `[lon, lat]` point against one ring.
///
/// The ring is treated as closed whether or not its last vertex repeats the
/// first. Points on the boundary are not special-cased: with a
/// counter-clockwise square `(0,0) (10,0) (10,10) (0,10)` the bottom and left
/// edges (and the `(0,0)` corner) count as inside while the top and right
/// edges and the other three corners count as outside.
pub fn point_in_ring(lon: f64, lat: f64, ring: &[LonLat]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for (i, &[xi, yi]) in ring.iter().enumerate() {
        let [xj, yj] = ring[j];
        if (yi > lat) != (yj > lat) {
            let dy = yj - yi;
            let dy = if dy == 0.0 { RAY_CAST_EPSILON } else { dy };
            if lon < (xj - xi) * (lat - yi) / dy + xi {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Index of the first ring of `feature` that contains the point
pub fn containing_ring(feature: &GeometryFeature, point: &QueryPoint) -> Option<usize> {
    feature
        .rings
        .iter()
        .position(|ring| point_in_ring(point.lon, point.lat, ring))
}

/// Whether any ring of the feature contains the point.
///
/// Every ring is an outer boundary, so a MultiPolygon matches as soon as one
/// of its parts does.
pub fn feature_contains(feature: &GeometryFeature, point: &QueryPoint) -> bool {
    containing_ring(feature, point).is_some()
}
