//! Command implementations

mod calibrate;
mod init;
mod run;
mod status;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    match cli.command {
        Commands::Init(args) => init::execute(args, &output, cli.dry_run),
        Commands::Run(args) => run::execute(args, &output, cli.dry_run),
        Commands::Calibrate(args) => calibrate::execute(args, &output, cli.dry_run),
        Commands::Status(args) => status::execute(args, &output),
    }
}
