//! `sendy` - CLI for flight history statistics
//!
//! This binary loads a Flighty export, prints its statistics dashboard, and
//! manages share links for computed reports.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use sendy::cli::render::{render_dashboard, render_routes, render_share_list};
use sendy::cli::{Cli, Command, ConfigCommand, InputArgs, ShareCommand};
use sendy::flight::load_flights_path;
use sendy::storage::{share_url, ShareOptions};
use sendy::{init_logging, AirportTable, Config, MetricsEngine, Session, ShareStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    let result = match cli.command {
        Command::Stats(cmd) => {
            let top_n = cmd.top.unwrap_or(config.metrics.top_n);
            with_session(&config, &cmd.input, top_n, |_, session| {
                print_report(session, "Your Flights", cmd.json)
            })
        }
        Command::Routes(cmd) => {
            with_session(&config, &cmd.input, config.metrics.top_n, |_, session| {
                if cmd.json {
                    println!("{}", serde_json::to_string_pretty(&session.report().routes)?);
                } else {
                    print!("{}", render_routes(session.report()));
                }
                Ok(())
            })
        }
        Command::Share(share_cmd) => handle_share(&config, share_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    };

    match result {
        Err(e) if e.is_no_data() => {
            warn!("{e}");
            println!("No data available.");
            Ok(())
        }
        other => other.map_err(Into::into),
    }
}

/// Load airports and flights for `input`, then run `f` on the filtered session.
///
/// `f` also receives the raw export text for callers that persist it.
fn with_session<F>(config: &Config, input: &InputArgs, top_n: usize, f: F) -> sendy::Result<()>
where
    F: FnOnce(&str, &Session) -> sendy::Result<()>,
{
    let airports = load_airports(config, input)?;
    let (contents, parsed) = load_flights_path(&input.file)?;
    if parsed.skipped_rows > 0 || parsed.invalid_fields > 0 {
        warn!(
            "{}: skipped {} malformed rows, ignored {} unparseable fields",
            input.file.display(),
            parsed.skipped_rows,
            parsed.invalid_fields
        );
    }

    let mut session = Session::new(parsed, airports, MetricsEngine::new(top_n));
    let range = input.range();
    if !range.is_unbounded() {
        session.apply_filter(range);
    }
    f(&contents, &session)
}

/// A missing airport table degrades to an empty one; other failures propagate.
fn load_airports(config: &Config, input: &InputArgs) -> sendy::Result<AirportTable> {
    let path = input
        .airports
        .clone()
        .unwrap_or_else(|| config.airports_path());
    match AirportTable::load_path(&path) {
        Ok((table, _)) => Ok(table),
        Err(e) if e.is_no_data() => {
            warn!(
                "No airport data at {}; distances and countries will be unavailable",
                path.display()
            );
            Ok(AirportTable::empty())
        }
        Err(e) => Err(e),
    }
}

fn print_report(session: &Session, title: &str, json: bool) -> sendy::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(session.report())?);
    } else {
        print!("{}", render_dashboard(title, session.range(), session.report()));
    }
    Ok(())
}

fn handle_share(config: &Config, cmd: ShareCommand) -> sendy::Result<()> {
    let store = ShareStore::open(config.database_path())?;

    match cmd {
        ShareCommand::Create {
            input,
            name,
            expiry_days,
        } => with_session(config, &input, config.metrics.top_n, |contents, session| {
            let options = ShareOptions {
                owner_name: name,
                range: session.range(),
                expiry_days: expiry_days.unwrap_or(config.share.expiry_days).max(1),
            };
            let share_id = store.create_share(contents, session.report(), &options)?;
            info!("Created share {share_id}");
            println!("{}", share_url(&config.share.base_url, &share_id));
            Ok(())
        }),
        ShareCommand::Show { id, json } => {
            let shared = store.load_shared(&id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&shared.report)?);
            } else {
                print!(
                    "{}",
                    render_dashboard(&shared.info.title(), shared.info.range, &shared.report)
                );
                println!();
                println!(
                    "Shared {} | expires {}",
                    shared.info.created_at.format("%Y-%m-%d"),
                    shared.info.expires_at.format("%Y-%m-%d")
                );
            }
            Ok(())
        }
        ShareCommand::List { json } => {
            let shares = store.list_active_shares()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&shares)?);
            } else {
                print!(
                    "{}",
                    render_share_list(&shares, &config.share.base_url, Utc::now())
                );
                let stats = store.stats()?;
                println!(
                    "{} active of {} stored ({} bytes)",
                    stats.active_shares, stats.total_shares, stats.db_size_bytes
                );
            }
            Ok(())
        }
        ShareCommand::Revoke { id, purge } => {
            let changed = if purge {
                store.delete_share(&id)?
            } else {
                store.deactivate_share(&id)?
            };
            if changed {
                println!("Share {id} revoked.");
                Ok(())
            } else {
                Err(sendy::Error::share_not_found(id))
            }
        }
        ShareCommand::Prune => {
            let removed = store.prune_expired()?;
            println!("Removed {removed} expired shares.");
            Ok(())
        }
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> sendy::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Data]");
                println!("  Airports path:      {}", config.airports_path().display());
                println!();
                println!("[Metrics]");
                println!("  Top N:              {}", config.metrics.top_n);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Share]");
                println!("  Base URL:           {}", config.share.base_url);
                println!("  Expiry (days):      {}", config.share.expiry_days);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
