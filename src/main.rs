//! s3harness - Regression and load-test harness for s3cmd-style storage CLIs

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod suites;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Status lines go to stdout; keep log records out of the way
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    cli.run()
}
