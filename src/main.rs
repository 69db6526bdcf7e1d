//! Pic Curator - rank a picture collection through pairwise comparisons.
//!
//! The binary is a thin command-line front end over the `pic_curator`
//! engine: every subcommand opens the configured library, runs one
//! operation and exits.

mod cli;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log directives used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "pic_curator=info,ingest=info,tiers=info,ranking=info,selection=info,mover=info";

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Logs go to stderr so JSON output on stdout stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run_command(&args)
}
