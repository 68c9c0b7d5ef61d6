//! Axis-aligned bounding boxes and the encodings they arrive in.
//!
//! Catalog files carry boxes as `[[south, west], [north, east]]` corner pairs,
//! the map page sends viewports as flat `N,E,S,W` or `minLon,minLat,maxLon,maxLat`
//! lists, and some listings use named min/max fields. Everything is normalized
//! into one [`BoundingBox`] here. Boxes never cross the antimeridian.

use serde::Serialize;
use serde_json::Value;

use crate::error::{GeoiptError, Result};

/// WGS84 bounding box in degrees.
///
/// Always satisfies `south <= north` and `west <= east`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    north: f64,
    east: f64,
    south: f64,
    west: f64,
}

/// Order of the four numbers in a textual viewport parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewportOrder {
    /// `north,east,south,west`
    #[default]
    Nesw,
    /// `minLon,minLat,maxLon,maxLat`
    LonLat,
}

impl BoundingBox {
    /// Build a box from its four edges
    pub fn new(north: f64, east: f64, south: f64, west: f64) -> Result<Self> {
        if ![north, east, south, west].iter().all(|v| v.is_finite()) {
            return Err(GeoiptError::InvalidBoundingBox {
                reason: format!("non-finite edge in N={north} E={east} S={south} W={west}"),
            });
        }
        if south > north {
            return Err(GeoiptError::InvalidBoundingBox {
                reason: format!("south ({south}) is above north ({north})"),
            });
        }
        if west > east {
            return Err(GeoiptError::InvalidBoundingBox {
                reason: format!("west ({west}) is east of east ({east})"),
            });
        }
        Ok(Self { north, east, south, west })
    }

    /// Build a box from `[lat, lon]` south-west and north-east corners
    pub fn from_corners(south_west: [f64; 2], north_east: [f64; 2]) -> Result<Self> {
        Self::new(north_east[0], north_east[1], south_west[0], south_west[1])
    }

    /// Build a box from a flat `[N, E, S, W]` array
    pub fn from_nesw(edges: [f64; 4]) -> Result<Self> {
        Self::new(edges[0], edges[1], edges[2], edges[3])
    }

    /// Build a box from the map viewport order `minLon, minLat, maxLon, maxLat`
    pub fn from_lon_lat_extent(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        Self::new(max_lat, max_lon, min_lat, min_lon)
    }

    /// Normalize any of the supported raw encodings.
    ///
    /// Returns `None` for absent or malformed input. Callers treat `None` as
    /// "unknown extent" and must not filter on it.
    pub fn from_value(raw: &Value) -> Option<Self> {
        match raw {
            Value::Array(items) if items.len() == 2 => {
                let south_west = lat_lon_pair(&items[0])?;
                let north_east = lat_lon_pair(&items[1])?;
                Self::from_corners(south_west, north_east).ok()
            }
            Value::Array(items) if items.len() == 4 => {
                let mut edges = [0.0; 4];
                for (slot, item) in edges.iter_mut().zip(items) {
                    *slot = as_number(item)?;
                }
                Self::from_nesw(edges).ok()
            }
            Value::Object(_) => from_named_fields(raw),
            _ => None,
        }
    }

    /// Parse a comma separated viewport parameter such as `-29,-70,-30,-71`
    pub fn parse_viewport(text: &str, order: ViewportOrder) -> Result<Self> {
        let numbers: Vec<f64> = text
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| GeoiptError::InvalidBoundingBox {
                reason: format!("'{}' is not a list of numbers: {}", text, e),
            })?;

        if numbers.len() != 4 {
            return Err(GeoiptError::InvalidBoundingBox {
                reason: format!("expected 4 numbers, got {}", numbers.len()),
            });
        }

        match order {
            ViewportOrder::Nesw => Self::new(numbers[0], numbers[1], numbers[2], numbers[3]),
            ViewportOrder::LonLat => {
                Self::from_lon_lat_extent(numbers[0], numbers[1], numbers[2], numbers[3])
            }
        }
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    /// Edges as `[N, E, S, W]`
    pub fn as_nesw(&self) -> [f64; 4] {
        [self.north, self.east, self.south, self.west]
    }

    /// Closed-interval rectangle overlap. Boxes that only touch along an edge
    /// or at a corner intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.south > other.north
            || self.north < other.south
            || self.west > other.east
            || self.east < other.west)
    }

    /// Whether the point lies inside or on the edge of the box
    pub fn contains_point(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }

    /// Center as `(lat, lon)`
    pub fn center(&self) -> (f64, f64) {
        ((self.north + self.south) / 2.0, (self.east + self.west) / 2.0)
    }
}

/// Normalize a raw box encoding, see [`BoundingBox::from_value`]
pub fn normalize(raw: &Value) -> Option<BoundingBox> {
    BoundingBox::from_value(raw)
}

/// Symmetric closed-interval intersection test
pub fn intersects(a: &BoundingBox, b: &BoundingBox) -> bool {
    a.intersects(b)
}

fn lat_lon_pair(value: &Value) -> Option<[f64; 2]> {
    match value {
        Value::Array(pair) if pair.len() >= 2 => Some([as_number(&pair[0])?, as_number(&pair[1])?]),
        _ => None,
    }
}

/// Accepts JSON numbers and numeric strings, which hand-edited listings contain
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn from_named_fields(raw: &Value) -> Option<BoundingBox> {
    let field = |keys: &[&str]| keys.iter().find_map(|k| raw.get(*k).and_then(as_number));

    let north = field(&["north", "maxLat", "max_lat", "maxy", "N"])?;
    let south = field(&["south", "minLat", "min_lat", "miny", "S"])?;
    let east = field(&["east", "maxLon", "max_lon", "maxx", "E"])?;
    let west = field(&["west", "minLon", "min_lon", "minx", "W"])?;

    BoundingBox::new(north, east, south, west).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn bbox(n: f64, e: f64, s: f64, w: f64) -> BoundingBox {
        BoundingBox::new(n, e, s, w).unwrap()
    }

    #[test]
    fn test_normalize_corner_pair() {
        let b = normalize(&json!([[0, 0], [10, 10]])).unwrap();
        assert_eq!(b, bbox(10.0, 10.0, 0.0, 0.0));
    }

    #[test]
    fn test_normalize_chilean_corner_pair() {
        let b = normalize(&json!([[-30.0, -71.0], [-29.0, -70.0]])).unwrap();
        assert_eq!(b.as_nesw(), [-29.0, -70.0, -30.0, -71.0]);
    }

    #[test]
    fn test_normalize_flat_nesw() {
        let b = normalize(&json!([10, 20, -5, 3])).unwrap();
        assert_eq!(b.as_nesw(), [10.0, 20.0, -5.0, 3.0]);
    }

    #[test]
    fn test_normalize_named_fields() {
        let b = normalize(&json!({"north": 1, "east": 2, "south": -1, "west": -2})).unwrap();
        assert_eq!(b.as_nesw(), [1.0, 2.0, -1.0, -2.0]);

        let b = normalize(&json!({"minLat": -30, "maxLat": -29, "minLon": -71, "maxLon": -70}))
            .unwrap();
        assert_eq!(b.as_nesw(), [-29.0, -70.0, -30.0, -71.0]);

        let b = normalize(&json!({"minx": -71, "miny": -30, "maxx": -70, "maxy": -29})).unwrap();
        assert_eq!(b.as_nesw(), [-29.0, -70.0, -30.0, -71.0]);
    }

    #[test]
    fn test_normalize_numeric_strings() {
        let b = normalize(&json!([["-30", "-71"], ["-29", "-70"]])).unwrap();
        assert_eq!(b.south(), -30.0);
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        assert!(normalize(&Value::Null).is_none());
        assert!(normalize(&json!([])).is_none());
        assert!(normalize(&json!([[0, 0]])).is_none());
        assert!(normalize(&json!([[0], [10, 10]])).is_none());
        assert!(normalize(&json!([1, 2, 3])).is_none());
        assert!(normalize(&json!([1, "x", 3, 4])).is_none());
        assert!(normalize(&json!({"north": 1, "south": 0})).is_none());
        assert!(normalize(&json!("0,0,10,10")).is_none());
        // inverted corners violate south <= north
        assert!(normalize(&json!([[10, 10], [0, 0]])).is_none());
    }

    #[test]
    fn test_new_rejects_non_finite() {
        assert!(BoundingBox::new(f64::NAN, 1.0, 0.0, 0.0).is_err());
        assert!(BoundingBox::new(1.0, f64::INFINITY, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_edge_touching_boxes_intersect() {
        let a = bbox(10.0, 10.0, 0.0, 0.0);
        let b = bbox(20.0, 10.0, 10.0, 0.0);
        assert!(intersects(&a, &b));
        assert!(intersects(&b, &a));
    }

    #[test]
    fn test_corner_touching_boxes_intersect() {
        let a = bbox(10.0, 10.0, 0.0, 0.0);
        let b = bbox(20.0, 20.0, 10.0, 10.0);
        assert!(a.intersects(&b));
    }

    #[test]
    fn test_disjoint_boxes() {
        let a = bbox(10.0, 10.0, 0.0, 0.0);
        let b = bbox(20.0, 30.0, 10.5, 20.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_parse_viewport_orders() {
        let nesw = BoundingBox::parse_viewport("-29, -70, -30, -71", ViewportOrder::Nesw).unwrap();
        let lonlat =
            BoundingBox::parse_viewport("-71,-30,-70,-29", ViewportOrder::LonLat).unwrap();
        assert_eq!(nesw, lonlat);

        assert!(BoundingBox::parse_viewport("1,2,3", ViewportOrder::Nesw).is_err());
        assert!(BoundingBox::parse_viewport("a,b,c,d", ViewportOrder::Nesw).is_err());
    }

    #[test]
    fn test_contains_point_and_center() {
        let b = bbox(-29.0, -70.0, -30.0, -71.0);
        assert!(b.contains_point(-29.5, -70.5));
        assert!(b.contains_point(-29.0, -70.0));
        assert!(!b.contains_point(-28.0, -70.5));
        assert_eq!(b.center(), (-29.5, -70.5));
    }

    fn arb_bbox() -> impl Strategy<Value = BoundingBox> {
        (-90.0f64..90.0, 0.0f64..30.0, -180.0f64..180.0, 0.0f64..30.0).prop_map(
            |(south, height, west, width)| {
                BoundingBox::new(south + height, west + width, south, west).unwrap()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_intersects_is_symmetric(a in arb_bbox(), b in arb_bbox()) {
            prop_assert_eq!(a.intersects(&b), b.intersects(&a));
        }

        #[test]
        fn prop_box_intersects_itself(a in arb_bbox()) {
            prop_assert!(a.intersects(&a));
        }

        #[test]
        fn prop_center_is_contained(a in arb_bbox()) {
            let (lat, lon) = a.center();
            prop_assert!(a.contains_point(lat, lon));
        }
    }
}
