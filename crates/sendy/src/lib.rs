//! `sendy` - Statistics for a personal flight history
//!
//! This library loads a Flighty CSV export, resolves airport codes against a
//! reference table, and computes aggregate statistics: distance flown, time
//! in the air, delays, and the most frequent airlines, routes and aircraft.
//! Reports can be snapshotted into a local share store and viewed again by
//! share id.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod airports;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod flight;
pub mod geo;
pub mod logging;
pub mod metrics;
pub mod session;
pub mod storage;

pub use airports::{AirportRef, AirportTable};
pub use config::Config;
pub use error::{Error, Result};
pub use filter::DateRange;
pub use flight::{FlightRecord, ParsedFlights};
pub use logging::init_logging;
pub use metrics::{MetricsEngine, MetricsReport};
pub use session::Session;
pub use storage::{ShareInfo, ShareStore};
