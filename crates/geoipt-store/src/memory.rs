//! In-memory layer store for development and testing.

use async_trait::async_trait;
use geoipt_core::error::{GeoiptError, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::ports::LayerStore;

/// In-memory implementation of LayerStore.
///
/// Clones share the same resources and fetch counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayerStore {
    resources: Arc<RwLock<HashMap<String, String>>>,
    fetch_counts: Arc<RwLock<HashMap<String, usize>>>,
}

impl MemoryLayerStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resource at a path, replacing any previous content
    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.resources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), content.into());
    }

    /// Builder style [`insert`](Self::insert)
    pub fn with_resource(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Store a JSON document at a path
    pub fn insert_json(&self, path: impl Into<String>, value: &serde_json::Value) {
        self.insert(path, value.to_string());
    }

    /// Remove a resource, returning its content
    pub fn remove(&self, path: &str) -> Option<String> {
        self.resources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }

    /// How many times a path has been fetched, including failed fetches
    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetch_counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Total fetches across all paths
    pub fn total_fetches(&self) -> usize {
        self.fetch_counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Number of stored resources
    pub fn len(&self) -> usize {
        self.resources.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LayerStore for MemoryLayerStore {
    async fn fetch_text(&self, path: &str) -> Result<String> {
        *self
            .fetch_counts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_insert(0) += 1;

        self.resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| GeoiptError::ResourceNotFound { path: path.to_string() })
    }

    fn describe(&self) -> String {
        format!("memory ({} resources)", self.len())
    }
}
