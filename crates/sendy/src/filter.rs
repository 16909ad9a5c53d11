//! Inclusive date-range filtering of flight records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::flight::FlightRecord;

/// An inclusive `[since, until]` window; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day kept, if bounded.
    pub since: Option<NaiveDate>,
    /// Last day kept, if bounded.
    pub until: Option<NaiveDate>,
}

impl DateRange {
    /// The range that keeps everything.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build a range from optional `YYYY-MM-DD` strings.
    ///
    /// Blank strings leave that end open. A bound that does not parse is
    /// ignored with a warning rather than rejected.
    #[must_use]
    pub fn parse(since: Option<&str>, until: Option<&str>) -> Self {
        Self {
            since: parse_bound("since", since),
            until: parse_bound("until", until),
        }
    }

    /// Whether neither end is bounded.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    /// Whether `date` falls inside the range.
    ///
    /// An undated record is only kept by an unbounded range.
    #[must_use]
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        self.since.map_or(true, |since| date >= since)
            && self.until.map_or(true, |until| date <= until)
    }

    /// Records inside the range, in their original order.
    #[must_use]
    pub fn apply(&self, records: &[FlightRecord]) -> Vec<FlightRecord> {
        records
            .iter()
            .filter(|r| self.contains(r.date))
            .cloned()
            .collect()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_bound = |bound: Option<NaiveDate>, open: &str| {
            bound.map_or_else(|| open.to_string(), |d| d.format("%Y-%m-%d").to_string())
        };
        write!(
            f,
            "{} to {}",
            fmt_bound(self.since, "Beginning"),
            fmt_bound(self.until, "End")
        )
    }
}

fn parse_bound(name: &str, value: Option<&str>) -> Option<NaiveDate> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            warn!("Ignoring {name} date '{value}': {e}");
            None
        }
    }
}
