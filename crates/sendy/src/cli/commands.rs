//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::filter::DateRange;

/// Where the flights come from and which of them to use.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Flighty CSV export
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Airport reference CSV (overrides the configured path)
    #[arg(short, long, value_name = "FILE")]
    pub airports: Option<PathBuf>,

    /// Only include flights on or after this date
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub since: Option<String>,

    /// Only include flights on or before this date
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub until: Option<String>,
}

impl InputArgs {
    /// The date filter selected by `--since`/`--until`.
    #[must_use]
    pub fn range(&self) -> DateRange {
        DateRange::parse(self.since.as_deref(), self.until.as_deref())
    }
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    #[command(flatten)]
    pub input: InputArgs,

    /// Length of the top airline/route/aircraft tables (at least 1)
    #[arg(
        short = 'n',
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub top: Option<usize>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Routes command arguments.
#[derive(Debug, Args)]
pub struct RoutesCommand {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Share management commands.
#[derive(Debug, Subcommand)]
pub enum ShareCommand {
    /// Snapshot an export and print its share link
    Create {
        #[command(flatten)]
        input: InputArgs,

        /// Name shown on the shared dashboard
        #[arg(short, long)]
        name: Option<String>,

        /// Days until the link expires (overrides the configured value)
        #[arg(long, value_name = "DAYS")]
        expiry_days: Option<u32>,
    },

    /// Show a shared dashboard
    Show {
        /// Share id
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List active shares
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Revoke a share so its link stops working
    Revoke {
        /// Share id
        id: String,

        /// Delete the stored snapshot instead of only deactivating it
        #[arg(long)]
        purge: bool,
    },

    /// Delete expired shares
    Prune,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
