pub mod bbox;
pub mod catalog;
pub mod geometry;
pub mod query;

pub use bbox::{BoundingBox, ViewportOrder};
pub use catalog::{decode_listing, decode_manifest, InstrumentRecord, RegionDescriptor};
pub use geometry::{GeometryFeature, GeometryKind, LonLat};
pub use query::{MatchResult, QueryPoint};
