//! Command-line interface for sendy.
//!
//! This module provides the CLI structure and the text rendering used by the
//! `sendy` binary.

mod commands;
pub mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{ConfigCommand, InputArgs, RoutesCommand, ShareCommand, StatsCommand};

/// sendy - Statistics for your flight history
///
/// Reads a Flighty CSV export, resolves airports against a reference table,
/// and reports distance, time in the air, delays, and your most flown
/// airlines, routes and aircraft.
#[derive(Debug, Parser)]
#[command(name = "sendy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the statistics dashboard for an export
    Stats(StatsCommand),

    /// List resolved route legs with their distances
    Routes(RoutesCommand),

    /// Create, view and manage share links
    #[command(subcommand)]
    Share(ShareCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}
