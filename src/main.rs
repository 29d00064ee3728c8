//! testscope CLI entry point

use anyhow::Context;
use clap::Parser;
use testscope::cli::Cli;
use testscope::output::format_summary;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; TESTSCOPE_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("TESTSCOPE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let stats = testscope::cli::run(cli).context("testscope run failed")?;
    println!("{}", format_summary(&stats));
    Ok(())
}
