//! floodmap CLI - Command-line interface
//!
//! This is the main CLI adapter for the flood mapping pipeline.

mod cli;
mod commands;
mod config_loader;
mod dry_run;
mod errors;
mod output;
mod output_types;
mod progress;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use errors::CliError;

fn main() -> Result<()> {
    // Initialize tracing; logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    if let Err(error) = commands::execute(cli) {
        if let Some(cli_error) = error.downcast_ref::<CliError>() {
            cli_error.display();
            std::process::exit(1);
        }
        return Err(error);
    }

    Ok(())
}
