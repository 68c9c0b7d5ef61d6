use async_trait::async_trait;
use geoipt_core::error::{GeoiptError, Result};
use serde_json::Value;

/// Port for reading the layer tree: region manifest, listings and geometry files.
///
/// Paths are relative to the layers root and always use `/` separators.
#[async_trait]
pub trait LayerStore: Send + Sync {
    /// Fetch a resource as text.
    ///
    /// A missing resource is `ResourceNotFound`; any other failure is `Fetch`.
    async fn fetch_text(&self, path: &str) -> Result<String>;

    /// Fetch a resource and decode it as JSON
    async fn fetch_json(&self, path: &str) -> Result<Value> {
        let text = self.fetch_text(path).await?;
        serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|e| {
            GeoiptError::Serialization(format!("Invalid JSON in {}: {}", path, e))
        })
    }

    /// Short human readable description of where resources come from
    fn describe(&self) -> String;
}
