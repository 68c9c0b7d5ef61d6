//! GeoIPT CLI - Command-line interface
//!
//! Command-line adapter over the point lookup pipeline.

mod cli;
mod commands;
mod config_loader;
mod errors;
mod output;
mod output_types;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for command output
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Create async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            errors::from_anyhow(e.into()).display();
            return ExitCode::FAILURE;
        }
    };

    // Execute the command
    match runtime.block_on(commands::execute(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            errors::from_anyhow(e).display();
            ExitCode::FAILURE
        }
    }
}
