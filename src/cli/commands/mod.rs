//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `library`: ingestion, listing and statistics
//! - `curate`: comparison rounds, hiding, boosting and the top-10 rebuild
//! - `settings`: selection settings, persisted back to the config file

mod curate;
mod library;
mod settings;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use pic_curator::config::{self, Config};
use pic_curator::engine::Curator;

pub use curate::{cmd_bump, cmd_hide, cmd_next, cmd_rate, cmd_restore, cmd_top10};
pub use library::{cmd_ingest, cmd_list, cmd_stats};
pub use settings::{cmd_toggle, cmd_toggle_orientation};

/// Pic Curator CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: OS config directory)
    #[arg(long, global = true, env = "PIC_CURATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Managed picture root (overrides the config file)
    #[arg(long, global = true, env = "PICS_DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Scan the managed root and reconcile it with the database
    Ingest {
        /// Print every file's outcome
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show the next comparison set (neighbors first, pivot last)
    Next {
        /// Number of neighbors to show with the pivot
        #[arg(short, long)]
        count: Option<u32>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record the outcome of a comparison round
    Rate {
        /// Root-relative path of the winner
        winner: String,
        /// Root-relative paths of the losers
        #[arg(required = true)]
        losers: Vec<String>,
    },
    /// Hide an image and move it into the hidden directory
    Hide {
        /// Root-relative path of the image
        path: String,
    },
    /// Restore the most recently hidden image
    Restore,
    /// Rebuild the top-10 directory from current ratings
    Top10,
    /// Force an image back into rotation
    Bump {
        /// Root-relative path of the image
        path: String,
        /// Amount added to the boost (negative to reduce)
        #[arg(short, long, default_value_t = 1, allow_hyphen_values = true)]
        delta: i64,
    },
    /// Cycle the orientation preference (off, ascending, descending)
    ToggleOrientation,
    /// Flip a named setting
    Toggle {
        /// Setting name
        name: String,
    },
    /// List images by rating
    List {
        /// Only hidden images
        #[arg(long, conflicts_with = "visible")]
        hidden: bool,
        /// Only visible images
        #[arg(long)]
        visible: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show library statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Resolve the config file path and load it, applying the `--root` override.
fn load_config(cli: &Cli) -> (Config, Option<PathBuf>) {
    let path = cli.config.clone().or_else(config::config_path);
    let mut config = match &path {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    if let Some(root) = &cli.root {
        config.library.root = root.clone();
    }
    (config, path)
}

/// Execute the parsed command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let (config, config_path) = load_config(cli);
    let curator = rt.block_on(Curator::open(config))?;

    match &cli.command {
        Commands::Ingest { verbose } => cmd_ingest(&rt, &curator, *verbose),
        Commands::Next { count, json } => cmd_next(&rt, &curator, *count, *json),
        Commands::Rate { winner, losers } => cmd_rate(&rt, &curator, winner, losers),
        Commands::Hide { path } => cmd_hide(&rt, &curator, path),
        Commands::Restore => cmd_restore(&rt, &curator),
        Commands::Top10 => cmd_top10(&rt, &curator),
        Commands::Bump { path, delta } => cmd_bump(&rt, &curator, path, *delta),
        Commands::ToggleOrientation => cmd_toggle_orientation(&curator, config_path.as_deref()),
        Commands::Toggle { name } => cmd_toggle(&curator, name, config_path.as_deref()),
        Commands::List {
            hidden,
            visible,
            json,
        } => cmd_list(&rt, &curator, *hidden, *visible, *json),
        Commands::Stats { json } => cmd_stats(&rt, &curator, *json),
    }
}
