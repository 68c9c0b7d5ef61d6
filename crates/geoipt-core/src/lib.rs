//! GeoIPT Core - Domain models, geometry readers, and configuration
//!
//! This crate contains the core domain types for the zoning-instrument lookup:
//! bounding boxes, the region/instrument catalog, parsed geometry features, and
//! the KML/GeoJSON readers that produce them.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;

pub use error::{GeoiptError, Result};
