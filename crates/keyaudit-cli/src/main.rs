// ABOUTME: Entry point for the keyaudit binary.
// ABOUTME: Parses flags, sets up logging, runs the audit and prints the report to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use keyaudit_cli::args::Cli;
use keyaudit_cli::output;
use keyaudit_core::run_audit;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    keyaudit_log::init_with_level(keyaudit_log::level_for(cli.verbose, cli.quiet));

    let config = cli.load_config()?;
    tracing::debug!(version = keyaudit_cli::VERSION, ?config, "Starting audit");

    let request = config.into_request(cli.check);
    let report = run_audit(&request).await.context("Audit aborted")?;

    println!("{}", output::render(&report, cli.format)?);
    std::process::exit(output::exit_code(&report));
}
