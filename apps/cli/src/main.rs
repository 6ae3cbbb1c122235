//! octochat CLI: provision and tear down FAQ bots.
//!
//! `build` exits with the pipeline's outcome code so callers can branch on
//! "already exists" or a timed-out step without parsing output.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    let code = commands::run(cli).await?;
    Ok(ExitCode::from(code))
}
