//! Logging configuration for sendy.
//!
//! Report output goes to stdout through `println!`. Diagnostics (skipped
//! rows, lookup misses, share activity) go through tracing to stderr, so
//! `sendy stats --json > report.json` stays clean.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
    /// Everything, including per-row tracing.
    Trace,
}

impl Verbosity {
    /// Verbosity selected by a `-v` count and a `-q` flag; `-q` wins.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Whether log lines carry their module target and line number.
    #[must_use]
    pub fn shows_source(&self) -> bool {
        matches!(self, Self::Verbose | Self::Trace)
    }
}

/// Initialize the logging system.
///
/// Call once at startup. `RUST_LOG` takes precedence over `verbosity`.
///
/// # Examples
///
/// ```no_run
/// use sendy::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(1, false));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let default_filter = format!("sendy={}", verbosity.to_level_filter());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let detailed = verbosity.shows_source();
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(detailed)
        .with_line_number(detailed)
        .with_file(false);

    // A second call finds a subscriber already installed; that's fine
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init();
}

/// Route `sendy` debug events to the test harness's captured output.
///
/// Safe to call from every test; only the first call installs a subscriber.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sendy=debug")
        .with_test_writer()
        .try_init();
}
