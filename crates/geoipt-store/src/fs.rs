//! Layer store over a local directory tree.

use async_trait::async_trait;
use geoipt_core::error::{GeoiptError, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::ports::LayerStore;

/// Serves the layer tree from a root directory
#[derive(Debug, Clone)]
pub struct FsLayerStore {
    root: PathBuf,
}

impl FsLayerStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative resource path under the root.
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let mut resolved = self.root.clone();

        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(GeoiptError::Fetch {
                        path: path.to_string(),
                        reason: "path escapes the layers root".to_string(),
                    });
                }
            }
        }

        Ok(resolved)
    }
}

#[async_trait]
impl LayerStore for FsLayerStore {
    async fn fetch_text(&self, path: &str) -> Result<String> {
        let full_path = self.resolve(path)?;
        tracing::debug!(path = %full_path.display(), "Reading layer file");

        let bytes = tokio::fs::read(&full_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => GeoiptError::ResourceNotFound { path: path.to_string() },
            _ => GeoiptError::Fetch { path: path.to_string(), reason: e.to_string() },
        })?;

        // Older layer files are not always UTF-8
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path, "Layer file is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        })
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}
