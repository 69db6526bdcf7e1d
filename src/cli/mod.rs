//! Command-line interface for pic-curator.
//!
//! This module provides CLI commands for ingesting a picture tree, running
//! comparison rounds and managing tiers from the terminal.

mod commands;

pub use commands::{Cli, Commands, run_command};
