//! Flight records and the CSV export parser.
//!
//! Each CSV row becomes a validated [`FlightRecord`] exactly once. Optional
//! columns that are absent, empty or unparseable become `None`; the rest of
//! the pipeline never touches raw strings.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info, trace, warn};

use crate::airports::normalize_code;
use crate::error::{Error, Result};

/// Columns a flight export must have.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[("From", &["from"]), ("To", &["to"])];

/// Accepted calendar date formats, tried in order.
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%Y-%m-%d", "%m/%d/%Y"];

/// Accepted naive timestamp formats, tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// One flight from the export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightRecord {
    /// Calendar date of the flight.
    pub date: Option<NaiveDate>,
    /// Operating airline; empty if unknown.
    pub airline: String,
    /// Flight number; empty if unknown.
    pub flight_number: String,
    /// Origin airport code, normalized; empty if missing.
    pub from_code: String,
    /// Destination airport code, normalized; empty if missing.
    pub to_code: String,
    /// Whether the flight was canceled.
    pub canceled: bool,
    /// Airport the flight diverted to, if any.
    pub diverted_to: Option<String>,
    /// Scheduled gate departure.
    pub scheduled_departure: Option<NaiveDateTime>,
    /// Actual gate departure.
    pub actual_departure: Option<NaiveDateTime>,
    /// Scheduled takeoff.
    pub scheduled_takeoff: Option<NaiveDateTime>,
    /// Actual takeoff.
    pub actual_takeoff: Option<NaiveDateTime>,
    /// Scheduled landing.
    pub scheduled_landing: Option<NaiveDateTime>,
    /// Actual landing.
    pub actual_landing: Option<NaiveDateTime>,
    /// Scheduled gate arrival.
    pub scheduled_arrival: Option<NaiveDateTime>,
    /// Actual gate arrival.
    pub actual_arrival: Option<NaiveDateTime>,
    /// Aircraft type name; empty if unknown.
    pub aircraft_type: String,
    /// Aircraft registration.
    pub tail_number: Option<String>,
}

impl FlightRecord {
    /// Create a record for the given route with every other field empty.
    #[must_use]
    pub fn new(from_code: &str, to_code: &str) -> Self {
        Self {
            from_code: normalize_code(from_code).unwrap_or_default(),
            to_code: normalize_code(to_code).unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Airborne time, when both actual takeoff and landing are known and
    /// landing comes after takeoff.
    #[must_use]
    pub fn flight_time(&self) -> Option<Duration> {
        let takeoff = self.actual_takeoff?;
        let landing = self.actual_landing?;
        (landing > takeoff).then(|| landing - takeoff)
    }

    /// Gate departure delay, clamped at zero for early departures.
    ///
    /// `None` when either the scheduled or actual departure is unknown.
    #[must_use]
    pub fn departure_delay(&self) -> Option<Duration> {
        let scheduled = self.scheduled_departure?;
        let actual = self.actual_departure?;
        Some((actual - scheduled).max(Duration::zero()))
    }

    /// Display key for the directed route, e.g. `JFK → LHR`.
    ///
    /// `None` if either end is missing.
    #[must_use]
    pub fn route_key(&self) -> Option<String> {
        if self.from_code.is_empty() || self.to_code.is_empty() {
            return None;
        }
        Some(format!("{} → {}", self.from_code, self.to_code))
    }
}

/// Result of parsing a flight export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFlights {
    /// Records in file order.
    pub records: Vec<FlightRecord>,
    /// Rows the CSV reader could not decode.
    pub skipped_rows: usize,
    /// Date or timestamp values present but unparseable.
    pub invalid_fields: usize,
}

/// A row as it appears in the export, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFlightRow {
    #[serde(rename = "Date", alias = "date")]
    date: Option<String>,
    #[serde(rename = "Airline", alias = "airline")]
    airline: Option<String>,
    #[serde(rename = "Flight", alias = "flight_number")]
    flight: Option<String>,
    #[serde(rename = "From", alias = "from")]
    from: Option<String>,
    #[serde(rename = "To", alias = "to")]
    to: Option<String>,
    #[serde(rename = "Canceled", alias = "canceled")]
    canceled: Option<String>,
    #[serde(rename = "Diverted To")]
    diverted_to: Option<String>,
    #[serde(rename = "Gate Departure (Scheduled)")]
    scheduled_departure: Option<String>,
    #[serde(rename = "Gate Departure (Actual)")]
    actual_departure: Option<String>,
    #[serde(rename = "Take off (Scheduled)")]
    scheduled_takeoff: Option<String>,
    #[serde(rename = "Take off (Actual)")]
    actual_takeoff: Option<String>,
    #[serde(rename = "Landing (Scheduled)")]
    scheduled_landing: Option<String>,
    #[serde(rename = "Landing (Actual)")]
    actual_landing: Option<String>,
    #[serde(rename = "Gate Arrival (Scheduled)")]
    scheduled_arrival: Option<String>,
    #[serde(rename = "Gate Arrival (Actual)")]
    actual_arrival: Option<String>,
    #[serde(rename = "Aircraft Type Name", alias = "aircraft_type")]
    aircraft_type: Option<String>,
    #[serde(rename = "Tail Number")]
    tail_number: Option<String>,
}

/// Converts raw rows, counting values that fail to parse.
#[derive(Debug, Default)]
struct RowValidator {
    invalid_fields: usize,
}

impl RowValidator {
    fn validate(&mut self, raw: RawFlightRow) -> FlightRecord {
        FlightRecord {
            date: self.date(raw.date.as_deref()),
            airline: text(raw.airline),
            flight_number: text(raw.flight),
            from_code: raw
                .from
                .as_deref()
                .and_then(normalize_code)
                .unwrap_or_default(),
            to_code: raw.to.as_deref().and_then(normalize_code).unwrap_or_default(),
            canceled: raw.canceled.as_deref().is_some_and(parse_flag),
            diverted_to: raw.diverted_to.as_deref().and_then(normalize_code),
            scheduled_departure: self.timestamp(raw.scheduled_departure.as_deref()),
            actual_departure: self.timestamp(raw.actual_departure.as_deref()),
            scheduled_takeoff: self.timestamp(raw.scheduled_takeoff.as_deref()),
            actual_takeoff: self.timestamp(raw.actual_takeoff.as_deref()),
            scheduled_landing: self.timestamp(raw.scheduled_landing.as_deref()),
            actual_landing: self.timestamp(raw.actual_landing.as_deref()),
            scheduled_arrival: self.timestamp(raw.scheduled_arrival.as_deref()),
            actual_arrival: self.timestamp(raw.actual_arrival.as_deref()),
            aircraft_type: text(raw.aircraft_type),
            tail_number: Some(text(raw.tail_number)).filter(|t| !t.is_empty()),
        }
    }

    fn date(&mut self, value: Option<&str>) -> Option<NaiveDate> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        let parsed = parse_date(value);
        if parsed.is_none() {
            trace!("Unparseable date: {value:?}");
            self.invalid_fields += 1;
        }
        parsed
    }

    fn timestamp(&mut self, value: Option<&str>) -> Option<NaiveDateTime> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        let parsed = parse_timestamp(value);
        if parsed.is_none() {
            trace!("Unparseable timestamp: {value:?}");
            self.invalid_fields += 1;
        }
        parsed
    }
}

fn text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1"
    )
}

/// Parse a calendar date in any of the accepted formats.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Parse a timestamp in any of the accepted formats.
///
/// Timestamps with an offset are converted to UTC; naive ones are kept as
/// written.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Parse a flight export from any reader. `source_name` is used in errors.
///
/// # Errors
///
/// Returns [`Error::NoData`] if the source is empty or has no data rows,
/// [`Error::Structure`] if the header lacks the `From`/`To` columns, and a
/// CSV error if the header row itself cannot be read.
pub fn parse_flights<R: Read>(reader: R, source_name: &str) -> Result<ParsedFlights> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(Error::no_data(source_name));
    }
    for (column, aliases) in REQUIRED_COLUMNS {
        let present = headers
            .iter()
            .any(|h| h == *column || aliases.contains(&h));
        if !present {
            return Err(Error::structure(format!(
                "{source_name} has no '{column}' column; is this a Flighty export?"
            )));
        }
    }

    let mut parsed = ParsedFlights::default();
    let mut validator = RowValidator::default();

    for (index, result) in rdr.deserialize::<RawFlightRow>().enumerate() {
        match result {
            Ok(raw) => parsed.records.push(validator.validate(raw)),
            Err(e) => {
                debug!("Skipping flight row {}: {}", index + 1, e);
                parsed.skipped_rows += 1;
            }
        }
    }
    parsed.invalid_fields = validator.invalid_fields;

    if parsed.records.is_empty() && parsed.skipped_rows == 0 {
        return Err(Error::no_data(source_name));
    }
    if parsed.skipped_rows > 0 {
        warn!("Skipped {} malformed flight rows", parsed.skipped_rows);
    }
    if parsed.invalid_fields > 0 {
        warn!(
            "{} date/time values could not be parsed and were ignored",
            parsed.invalid_fields
        );
    }
    info!(
        "Parsed {} flights from {}",
        parsed.records.len(),
        source_name
    );
    Ok(parsed)
}

/// Read and parse a flight export from a file.
///
/// Returns the file contents alongside the parsed flights so callers can
/// persist the export. Rows that are not valid UTF-8 are skipped by the
/// parser; in the returned text their bad bytes are replaced with U+FFFD.
///
/// # Errors
///
/// Returns [`Error::NoData`] if the file is missing or empty, plus the errors
/// of [`parse_flights`].
pub fn load_flights_path(path: impl AsRef<Path>) -> Result<(String, ParsedFlights)> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::no_data(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::no_data(path.display().to_string()));
    }
    let parsed = parse_flights(bytes.as_slice(), &path.display().to_string())?;
    let contents = String::from_utf8_lossy(&bytes).into_owned();
    Ok((contents, parsed))
}
