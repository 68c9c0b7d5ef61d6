//! Configuration loading for CLI commands

use anyhow::{Context, Result};
use geoipt_core::config::{CliConfigOverrides, LayeredConfig};
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Config file picked up from the working directory when --config is absent
pub const DEFAULT_CONFIG_FILE: &str = "geoipt.toml";

/// Resolve layered configuration: defaults, file, environment, then flags
pub fn load_config(cli: &Cli) -> Result<LayeredConfig> {
    let config_path = config_file(cli.config.as_deref())?;

    let mut config = LayeredConfig::with_defaults();
    if let Some(path) = &config_path {
        config = config
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }
    let mut config = config.load_from_env();

    config.update_from_cli(CliConfigOverrides {
        layers_root: cli.root.clone(),
        max_concurrent_fetches: cli.max_concurrent_fetches,
        fetch_timeout_secs: cli.fetch_timeout,
    });

    tracing::debug!(
        file = ?config_path,
        root = %config.layers_root.value,
        "Configuration loaded"
    );
    Ok(config)
}

/// An explicit --config must exist; the default file is optional
fn config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => anyhow::bail!("Configuration file not found: {}", path.display()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            Ok(default.is_file().then_some(default))
        }
    }
}
