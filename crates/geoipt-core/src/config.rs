use crate::error::{GeoiptError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_LAYERS_ROOT: &str = "capas";
pub const DEFAULT_REGION_MANIFEST: &str = "regiones.json";
pub const DEFAULT_LISTING_FILE: &str = "listado.json";
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the layer catalog and query fan-out
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub layers_root: ConfigValue<String>,
    pub region_manifest: ConfigValue<String>,
    pub listing_file: ConfigValue<String>,
    pub max_concurrent_fetches: ConfigValue<usize>,
    pub fetch_timeout_secs: ConfigValue<u64>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            layers_root: ConfigValue::new(DEFAULT_LAYERS_ROOT.to_string(), ConfigSource::Default),
            region_manifest: ConfigValue::new(
                DEFAULT_REGION_MANIFEST.to_string(),
                ConfigSource::Default,
            ),
            listing_file: ConfigValue::new(DEFAULT_LISTING_FILE.to_string(), ConfigSource::Default),
            max_concurrent_fetches: ConfigValue::new(
                DEFAULT_MAX_CONCURRENT_FETCHES,
                ConfigSource::Default,
            ),
            fetch_timeout_secs: ConfigValue::new(DEFAULT_FETCH_TIMEOUT_SECS, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeoiptError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeoiptError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(root) = file_config.layers_root {
            self.layers_root.update(root, ConfigSource::File);
        }

        if let Some(manifest) = file_config.region_manifest {
            self.region_manifest.update(manifest, ConfigSource::File);
        }

        if let Some(listing) = file_config.listing_file {
            self.listing_file.update(listing, ConfigSource::File);
        }

        if let Some(limit) = file_config.max_concurrent_fetches {
            self.max_concurrent_fetches
                .update(validate_positive("max_concurrent_fetches", limit)?, ConfigSource::File);
        }

        if let Some(timeout) = file_config.fetch_timeout_secs {
            self.fetch_timeout_secs
                .update(validate_positive("fetch_timeout_secs", timeout)?, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // GEOIPT_LAYERS_ROOT
        if let Ok(root) = env::var("GEOIPT_LAYERS_ROOT") {
            if root.trim().is_empty() {
                tracing::warn!("Ignoring empty GEOIPT_LAYERS_ROOT");
            } else {
                self.layers_root.update(root, ConfigSource::Environment);
            }
        }

        // GEOIPT_REGION_MANIFEST
        if let Ok(manifest) = env::var("GEOIPT_REGION_MANIFEST") {
            self.region_manifest.update(manifest, ConfigSource::Environment);
        }

        // GEOIPT_LISTING_FILE
        if let Ok(listing) = env::var("GEOIPT_LISTING_FILE") {
            self.listing_file.update(listing, ConfigSource::Environment);
        }

        // GEOIPT_MAX_CONCURRENT_FETCHES
        if let Ok(limit_str) = env::var("GEOIPT_MAX_CONCURRENT_FETCHES") {
            match parse_positive::<usize>("max_concurrent_fetches", &limit_str) {
                Ok(limit) => self.max_concurrent_fetches.update(limit, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOIPT_MAX_CONCURRENT_FETCHES value '{}': expected a positive integer",
                    limit_str
                ),
            }
        }

        // GEOIPT_FETCH_TIMEOUT_SECS
        if let Ok(timeout_str) = env::var("GEOIPT_FETCH_TIMEOUT_SECS") {
            match parse_positive::<u64>("fetch_timeout_secs", &timeout_str) {
                Ok(timeout) => self.fetch_timeout_secs.update(timeout, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOIPT_FETCH_TIMEOUT_SECS value '{}': expected a positive number of seconds",
                    timeout_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(root) = overrides.layers_root {
            self.layers_root.update(root, ConfigSource::Cli);
        }

        if let Some(limit) = overrides.max_concurrent_fetches {
            self.max_concurrent_fetches.update(limit.max(1), ConfigSource::Cli);
        }

        if let Some(timeout) = overrides.fetch_timeout_secs {
            self.fetch_timeout_secs.update(timeout.max(1), ConfigSource::Cli);
        }
    }

    /// Storage path layout derived from the current values
    pub fn layout(&self) -> CatalogLayout {
        CatalogLayout {
            region_manifest: self.region_manifest.value.clone(),
            listing_file: self.listing_file.value.clone(),
        }
    }

    /// Whether the layers root is served over HTTP(S) rather than from disk
    pub fn is_remote_root(&self) -> bool {
        let root = self.layers_root.value.trim_start();
        root.starts_with("http://") || root.starts_with("https://")
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "layers_root".to_string(),
            (self.layers_root.value.clone(), self.layers_root.source),
        );

        map.insert(
            "region_manifest".to_string(),
            (self.region_manifest.value.clone(), self.region_manifest.source),
        );

        map.insert(
            "listing_file".to_string(),
            (self.listing_file.value.clone(), self.listing_file.source),
        );

        map.insert(
            "max_concurrent_fetches".to_string(),
            (self.max_concurrent_fetches.value.to_string(), self.max_concurrent_fetches.source),
        );

        map.insert(
            "fetch_timeout_secs".to_string(),
            (format!("{}s", self.fetch_timeout_secs.value), self.fetch_timeout_secs.source),
        );

        map
    }
}

/// Where the manifest and listings live relative to the layers root.
///
/// Paths are `{manifest}`, `{folder}/{listing}` and `{folder}/{file}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLayout {
    pub region_manifest: String,
    pub listing_file: String,
}

impl CatalogLayout {
    pub fn manifest_path(&self) -> String {
        self.region_manifest.clone()
    }

    pub fn listing_path(&self, folder_key: &str) -> String {
        join_path(folder_key, &self.listing_file)
    }

    pub fn geometry_path(&self, folder_key: &str, file_name: &str) -> String {
        join_path(folder_key, file_name)
    }
}

impl Default for CatalogLayout {
    fn default() -> Self {
        Self {
            region_manifest: DEFAULT_REGION_MANIFEST.to_string(),
            listing_file: DEFAULT_LISTING_FILE.to_string(),
        }
    }
}

fn join_path(folder: &str, file: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", folder, file)
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    layers_root: Option<String>,
    region_manifest: Option<String>,
    listing_file: Option<String>,
    max_concurrent_fetches: Option<usize>,
    fetch_timeout_secs: Option<u64>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub layers_root: Option<String>,
    pub max_concurrent_fetches: Option<usize>,
    pub fetch_timeout_secs: Option<u64>,
}

/// Parse a strictly positive integer setting
pub fn parse_positive<T>(key: &str, s: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default + Copy,
{
    let value = s.trim().parse::<T>().map_err(|_| GeoiptError::ConfigInvalid {
        key: key.to_string(),
        reason: format!("Invalid value: {}. Expected a positive integer", s),
    })?;
    validate_positive(key, value)
}

fn validate_positive<T: PartialOrd + Default + Copy>(key: &str, value: T) -> Result<T> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(GeoiptError::ConfigInvalid {
            key: key.to_string(),
            reason: "must be at least 1".to_string(),
        })
    }
}
