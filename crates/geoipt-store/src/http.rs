//! Layer store over HTTP(S), for layer trees published on a web server.

use async_trait::async_trait;
use geoipt_core::error::{GeoiptError, Result};
use reqwest::{StatusCode, Url};
use std::time::Duration;

use crate::ports::LayerStore;

/// Fetches resources relative to a base URL
pub struct HttpLayerStore {
    /// Base URL, always ending in `/`
    base_url: Url,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpLayerStore {
    /// Create a store rooted at `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeoiptError::ConfigInvalid {
                key: "layers_root".to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { base_url, client })
    }

    /// Absolute URL of a relative resource path
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let relative = path.trim_start_matches('/');
        if relative.split('/').any(|segment| segment == "..") {
            return Err(GeoiptError::Fetch {
                path: path.to_string(),
                reason: "path escapes the layers root".to_string(),
            });
        }

        self.base_url.join(relative).map_err(|e| GeoiptError::Fetch {
            path: path.to_string(),
            reason: format!("Invalid resource URL: {}", e),
        })
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut normalized = base_url.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }

    Url::parse(&normalized).map_err(|e| GeoiptError::ConfigInvalid {
        key: "layers_root".to_string(),
        reason: format!("Invalid URL '{}': {}", base_url, e),
    })
}

#[async_trait]
impl LayerStore for HttpLayerStore {
    async fn fetch_text(&self, path: &str) -> Result<String> {
        let url = self.url_for(path)?;
        tracing::debug!(url = %url, "Fetching layer resource");

        let response = self.client.get(url).send().await.map_err(|e| GeoiptError::Fetch {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GeoiptError::ResourceNotFound { path: path.to_string() });
        }
        if !status.is_success() {
            return Err(GeoiptError::Fetch {
                path: path.to_string(),
                reason: format!("HTTP status {}", status),
            });
        }

        response.text().await.map_err(|e| GeoiptError::Fetch {
            path: path.to_string(),
            reason: format!("Failed to read response body: {}", e),
        })
    }

    fn describe(&self) -> String {
        format!("http {}", self.base_url)
    }
}
