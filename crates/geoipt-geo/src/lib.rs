//! GeoIPT Geo - Containment and spatial indexing
//!
//! This crate holds the geometric half of the lookup: ray-casting
//! point-in-ring tests, feature bounds computed with the `geo` crate, and an
//! R-tree over declared bounding boxes for the viewport funnel.

pub mod index;
pub mod models;
pub mod spatial;

pub use index::BBoxIndex;
pub use models::{feature_bounds, BoundingBoxExt};
pub use spatial::{feature_contains, point_in_ring, RAY_CAST_EPSILON};
