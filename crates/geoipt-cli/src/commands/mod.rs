//! Command implementations

mod config;
mod inspect;
mod query;
mod regions;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    match &cli.command {
        Commands::Query(args) => query::execute(&cli, args, &output).await,
        Commands::Regions(args) => regions::execute(&cli, args, &output).await,
        Commands::Inspect(args) => inspect::execute(args, &output).await,
        Commands::Config => config::execute(&cli, &output),
    }
}
