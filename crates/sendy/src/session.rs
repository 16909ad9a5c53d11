//! Per-dataset session state.
//!
//! A [`Session`] holds one loaded export, the airport table it is resolved
//! against, the active date filter and the report for the filtered records.
//! Every change recomputes a fresh report; nothing is shared between
//! sessions.

use tracing::{debug, info};

use crate::airports::AirportTable;
use crate::filter::DateRange;
use crate::flight::{FlightRecord, ParsedFlights};
use crate::metrics::{MetricsEngine, MetricsReport};

/// A loaded dataset and its current view.
#[derive(Debug, Clone)]
pub struct Session {
    records: Vec<FlightRecord>,
    skipped_rows: usize,
    invalid_fields: usize,
    airports: AirportTable,
    engine: MetricsEngine,
    range: DateRange,
    filtered: Vec<FlightRecord>,
    report: MetricsReport,
}

impl Session {
    /// Start a session over a parsed export, unfiltered.
    #[must_use]
    pub fn new(parsed: ParsedFlights, airports: AirportTable, engine: MetricsEngine) -> Self {
        let report = engine.compute(&parsed.records, &airports);
        info!("Loaded {} flights", report.total_flights);
        Self {
            filtered: parsed.records.clone(),
            records: parsed.records,
            skipped_rows: parsed.skipped_rows,
            invalid_fields: parsed.invalid_fields,
            airports,
            engine,
            range: DateRange::unbounded(),
            report,
        }
    }

    /// Restrict the view to `range` and recompute.
    pub fn apply_filter(&mut self, range: DateRange) {
        self.range = range;
        self.filtered = range.apply(&self.records);
        self.report = self.engine.compute(&self.filtered, &self.airports);
        debug!(
            "Filter {} keeps {} of {} records",
            range,
            self.filtered.len(),
            self.records.len()
        );
    }

    /// Drop the date filter and recompute.
    pub fn reset_filter(&mut self) {
        self.apply_filter(DateRange::unbounded());
    }

    /// The report for the current view.
    #[must_use]
    pub fn report(&self) -> &MetricsReport {
        &self.report
    }

    /// The active date filter.
    #[must_use]
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Records in the current view.
    #[must_use]
    pub fn filtered_records(&self) -> &[FlightRecord] {
        &self.filtered
    }

    /// Every record in the loaded export, canceled ones included.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    /// Rows of the export that could not be decoded.
    #[must_use]
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Date/time values of the export that could not be parsed.
    #[must_use]
    pub fn invalid_fields(&self) -> usize {
        self.invalid_fields
    }

    /// The airport table the session resolves against.
    #[must_use]
    pub fn airports(&self) -> &AirportTable {
        &self.airports
    }
}
