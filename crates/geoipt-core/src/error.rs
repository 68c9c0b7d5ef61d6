//! Error types for GeoIPT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoiptError {
    // Catalog errors
    #[error("Region catalog unavailable at {path}: {reason}")]
    CatalogUnavailable { path: String, reason: String },

    #[error("Instrument listing unavailable for region {region}: {reason}")]
    ListingUnavailable { region: String, reason: String },

    // Geometry errors
    #[error("Geometry file unavailable at {path}: {reason}")]
    GeometryUnavailable { path: String, reason: String },

    #[error("Failed to parse {format} geometry in {path}: {reason}")]
    GeometryParse {
        path: String,
        format: String,
        reason: String,
    },

    #[error("Unsupported geometry format '.{extension}'. Supported: {supported:?}")]
    UnsupportedFormat {
        extension: String,
        supported: Vec<String>,
    },

    // Storage errors
    #[error("Resource not found: {path}")]
    ResourceNotFound { path: String },

    #[error("Failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },

    // Query errors
    #[error("Invalid bounding box: {reason}")]
    InvalidBoundingBox { reason: String },

    #[error("Invalid query point: {reason}")]
    InvalidQueryPoint { reason: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Export errors
    #[error("Cannot export zone: {reason}")]
    Export { reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GeoiptError {
    /// Whether the error means the resource simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, GeoiptError::ResourceNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, GeoiptError>;
