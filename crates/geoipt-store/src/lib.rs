//! GeoIPT Store - Layer storage port and adapters
//!
//! The query pipeline reads the region manifest, the per-region listings and
//! the geometry files through the [`LayerStore`] port. Adapters serve them
//! from memory, from a directory tree or over HTTP.

pub mod fs;
pub mod http;
pub mod memory;
pub mod ports;

pub use fs::FsLayerStore;
pub use http::HttpLayerStore;
pub use memory::MemoryLayerStore;
pub use ports::LayerStore;

use geoipt_core::config::LayeredConfig;
use geoipt_core::Result;
use std::sync::Arc;
use std::time::Duration;

/// Open the store selected by the configured layers root.
///
/// An `http://` or `https://` root selects the HTTP adapter, anything else
/// is treated as a local directory.
pub fn store_from_config(config: &LayeredConfig) -> Result<Arc<dyn LayerStore>> {
    let root = config.layers_root.value.trim();
    if config.is_remote_root() {
        let timeout = Duration::from_secs(config.fetch_timeout_secs.value);
        Ok(Arc::new(HttpLayerStore::new(root, timeout)?))
    } else {
        Ok(Arc::new(FsLayerStore::new(root)))
    }
}
