//! Flight metrics engine.
//!
//! [`MetricsEngine::compute`] is a pure function from flight records and an
//! airport table to a [`MetricsReport`]. Missing data never fails the
//! computation: a record contributes to every metric whose inputs it has and
//! is counted in a diagnostic counter for the ones it doesn't.

use std::collections::{BTreeSet, HashMap};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::airports::AirportTable;
use crate::flight::FlightRecord;
use crate::geo::Coordinates;

/// Default length of the top-N tables.
pub const DEFAULT_TOP_N: usize = 10;

/// One row of a grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry {
    /// Group key (airline, `FROM → TO`, aircraft type).
    pub key: String,
    /// Number of flights in the group.
    pub count: usize,
}

/// A flown leg whose endpoints both resolved, for map rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    /// Origin code.
    pub from_code: String,
    /// Destination code.
    pub to_code: String,
    /// Origin position.
    pub from: Coordinates,
    /// Destination position.
    pub to: Coordinates,
    /// Great-circle distance in miles.
    pub distance_miles: f64,
}

/// Everything derived from one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Flights counted (canceled flights excluded).
    pub total_flights: usize,
    /// Canceled flights, excluded from every other metric.
    pub canceled_flights: usize,
    /// Sum of great-circle distances of resolved legs, in miles.
    pub total_distance_miles: f64,
    /// Sum of airborne time, in hours.
    pub total_flight_time_hours: f64,
    /// Sum of gate departure delays, in hours.
    pub total_delay_hours: f64,
    /// Distinct resolved airports.
    pub total_airports: usize,
    /// Distinct non-empty airlines.
    pub total_airlines: usize,
    /// Distinct countries of resolved airports.
    pub total_countries: usize,
    /// Resolved airport codes, sorted.
    pub airports_visited: Vec<String>,
    /// Countries, sorted.
    pub countries: Vec<String>,
    /// Airport codes that did not resolve, sorted.
    pub unresolved_codes: Vec<String>,
    /// Airline with the most flights.
    pub top_airline: Option<String>,
    /// Aircraft type with the most flights.
    pub most_flown_aircraft: Option<String>,
    /// Top airlines by flight count.
    pub top_airlines: Vec<CountEntry>,
    /// Top directed routes by flight count.
    pub top_routes: Vec<CountEntry>,
    /// Top aircraft types by flight count.
    pub top_aircraft: Vec<CountEntry>,
    /// Resolved legs in input order.
    pub routes: Vec<RouteLeg>,
    /// Flights without a usable takeoff/landing pair.
    pub incomplete_flight_times: usize,
    /// Flights with at least one unresolved endpoint.
    pub unresolved_routes: usize,
}

impl MetricsReport {
    /// Whether the report covers no flights at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_flights == 0 && self.canceled_flights == 0
    }
}

/// Occurrence counter that remembers first-seen order.
#[derive(Debug, Default)]
struct OrderedCounter {
    index: HashMap<String, usize>,
    entries: Vec<CountEntry>,
}

impl OrderedCounter {
    fn add(&mut self, key: &str) {
        if key.is_empty() {
            return;
        }
        if let Some(&i) = self.index.get(key) {
            self.entries[i].count += 1;
        } else {
            self.index.insert(key.to_string(), self.entries.len());
            self.entries.push(CountEntry {
                key: key.to_string(),
                count: 1,
            });
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries by descending count; the stable sort keeps first-seen order
    /// among equal counts.
    fn ranked(mut self) -> Vec<CountEntry> {
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries
    }
}

fn top(ranked: &[CountEntry], n: usize) -> Vec<CountEntry> {
    ranked.iter().take(n).cloned().collect()
}

/// Running total of whole seconds, saturating at the `i64` bounds.
#[derive(Debug, Default, Clone, Copy)]
struct SecondsTotal(i64);

impl SecondsTotal {
    fn add(&mut self, duration: Duration) {
        self.0 = self.0.saturating_add(duration.num_seconds());
    }

    #[allow(clippy::cast_precision_loss)]
    fn hours(self) -> f64 {
        self.0 as f64 / 3600.0
    }
}

/// Computes [`MetricsReport`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsEngine {
    top_n: usize,
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

impl MetricsEngine {
    /// Engine producing top-N tables of length at most `top_n`.
    #[must_use]
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Length limit of the top-N tables.
    #[must_use]
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Compute the report for `records` against `airports`.
    #[must_use]
    pub fn compute(&self, records: &[FlightRecord], airports: &AirportTable) -> MetricsReport {
        let mut report = MetricsReport::default();

        let mut flight_time = SecondsTotal::default();
        let mut delay = SecondsTotal::default();
        let mut visited = BTreeSet::new();
        let mut unresolved = BTreeSet::new();
        let mut countries = BTreeSet::new();
        let mut airlines = OrderedCounter::default();
        let mut routes = OrderedCounter::default();
        let mut aircraft = OrderedCounter::default();

        for record in records {
            if record.canceled {
                report.canceled_flights += 1;
                continue;
            }
            report.total_flights += 1;

            let from = resolve(airports, &record.from_code, &mut visited, &mut unresolved);
            let to = resolve(airports, &record.to_code, &mut visited, &mut unresolved);
            for code in [&record.from_code, &record.to_code] {
                if let Some(country) = airports.country(code) {
                    countries.insert(country.to_string());
                }
            }

            if let (Some(from), Some(to)) = (from, to) {
                let distance_miles = from.distance_miles(&to);
                report.total_distance_miles += distance_miles;
                report.routes.push(RouteLeg {
                    from_code: record.from_code.clone(),
                    to_code: record.to_code.clone(),
                    from,
                    to,
                    distance_miles,
                });
            } else {
                trace!(
                    "Unresolved route {} → {}",
                    record.from_code,
                    record.to_code
                );
                report.unresolved_routes += 1;
            }

            match record.flight_time() {
                Some(t) => flight_time.add(t),
                None => report.incomplete_flight_times += 1,
            }
            if let Some(d) = record.departure_delay() {
                delay.add(d);
            }

            airlines.add(&record.airline);
            aircraft.add(&record.aircraft_type);
            if let Some(key) = record.route_key() {
                routes.add(&key);
            }
        }

        report.total_flight_time_hours = flight_time.hours();
        report.total_delay_hours = delay.hours();

        report.total_airports = visited.len();
        report.airports_visited = visited.into_iter().collect();
        report.unresolved_codes = unresolved.into_iter().collect();
        report.total_countries = countries.len();
        report.countries = countries.into_iter().collect();

        report.total_airlines = airlines.len();
        let airlines = airlines.ranked();
        let aircraft = aircraft.ranked();
        report.top_airline = airlines.first().map(|e| e.key.clone());
        report.most_flown_aircraft = aircraft.first().map(|e| e.key.clone());
        report.top_airlines = top(&airlines, self.top_n);
        report.top_aircraft = top(&aircraft, self.top_n);
        report.top_routes = top(&routes.ranked(), self.top_n);

        debug!(
            "Computed metrics: {} flights, {:.0} mi, {} airports, {} unresolved routes",
            report.total_flights,
            report.total_distance_miles,
            report.total_airports,
            report.unresolved_routes
        );
        report
    }
}

/// Look up `code`, recording it as visited or unresolved.
fn resolve(
    airports: &AirportTable,
    code: &str,
    visited: &mut BTreeSet<String>,
    unresolved: &mut BTreeSet<String>,
) -> Option<Coordinates> {
    if code.is_empty() {
        return None;
    }
    let coordinates = airports.coordinates(code);
    if coordinates.is_some() {
        visited.insert(code.to_string());
    } else {
        unresolved.insert(code.to_string());
    }
    coordinates
}

/// Compute a report with the default top-N length.
#[must_use]
pub fn compute(records: &[FlightRecord], airports: &AirportTable) -> MetricsReport {
    MetricsEngine::default().compute(records, airports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::AirportRef;
    use crate::flight::parse_timestamp;
    use crate::geo::haversine_miles;

    fn airport(code: &str, latitude: f64, longitude: f64, country: &str) -> AirportRef {
        AirportRef {
            code: code.to_string(),
            latitude,
            longitude,
            country: country.to_string(),
        }
    }

    fn airports() -> AirportTable {
        vec![
            airport("JFK", 40.639_801, -73.778_900, "US"),
            airport("LHR", 51.470_600, -0.461_941, "GB"),
            airport("SFO", 37.618_999, -122.375, "US"),
            airport("NRT", 35.764_702, 140.386_002, "JP"),
            airport("CDG", 49.012_798, 2.55, "FR"),
        ]
        .into_iter()
        .collect()
    }

    fn flight(from: &str, to: &str, airline: &str, aircraft: &str) -> FlightRecord {
        FlightRecord {
            airline: airline.to_string(),
            aircraft_type: aircraft.to_string(),
            ..FlightRecord::new(from, to)
        }
    }

    fn sample() -> Vec<FlightRecord> {
        vec![
            flight("JFK", "LHR", "BA", "Boeing 777"),
            flight("LHR", "JFK", "BA", "Boeing 777"),
            flight("SFO", "NRT", "UA", "Boeing 787"),
            flight("NRT", "SFO", "UA", "Boeing 787"),
            flight("LHR", "CDG", "AF", "Airbus A320"),
            flight("JFK", "LHR", "VS", "Airbus A350"),
            flight("XXX", "CDG", "", ""),
        ]
    }

    #[test]
    fn test_round_trip_scenario() {
        let records = vec![
            flight("JFK", "LHR", "BA", "Boeing 777"),
            flight("LHR", "JFK", "BA", "Boeing 777"),
        ];
        let table = airports();
        let report = compute(&records, &table);

        let leg = haversine_miles(
            &table.coordinates("JFK").unwrap(),
            &table.coordinates("LHR").unwrap(),
        );
        assert!((leg - 3451.0).abs() < 5.0);
        assert_eq!(report.total_flights, 2);
        assert!((report.total_distance_miles - 2.0 * leg).abs() < 1e-9);
        assert_eq!(report.airports_visited, vec!["JFK", "LHR"]);
        assert_eq!(report.total_airports, 2);
        assert_eq!(report.most_flown_aircraft.as_deref(), Some("Boeing 777"));
        assert_eq!(report.top_airline.as_deref(), Some("BA"));
        assert_eq!(report.total_countries, 2);
    }

    #[test]
    fn test_unresolved_from_code_scenario() {
        let records = vec![flight("ZZZ", "LHR", "BA", "")];
        let report = compute(&records, &airports());

        assert_eq!(report.total_flights, 1);
        assert_eq!(report.total_distance_miles, 0.0);
        assert_eq!(report.airports_visited, vec!["LHR"]);
        assert_eq!(report.unresolved_codes, vec!["ZZZ"]);
        assert_eq!(report.unresolved_routes, 1);
        assert!(report.routes.is_empty());
        assert_eq!(report.countries, vec!["GB"]);
    }

    #[test]
    fn test_early_departure_contributes_no_delay() {
        let mut record = flight("JFK", "LHR", "BA", "");
        record.scheduled_departure = parse_timestamp("2023-01-01T10:00");
        record.actual_departure = parse_timestamp("2023-01-01T09:50");
        let report = compute(&[record], &airports());
        assert_eq!(report.total_delay_hours, 0.0);
    }

    #[test]
    fn test_delay_and_flight_time_totals() {
        let mut late = flight("JFK", "LHR", "BA", "");
        late.scheduled_departure = parse_timestamp("2023-01-01T10:00");
        late.actual_departure = parse_timestamp("2023-01-01T11:30");
        late.actual_takeoff = parse_timestamp("2023-01-01T12:00");
        late.actual_landing = parse_timestamp("2023-01-01T19:00");

        let mut early = flight("LHR", "JFK", "BA", "");
        early.scheduled_departure = parse_timestamp("2023-01-05T10:00");
        early.actual_departure = parse_timestamp("2023-01-05T09:00");
        early.actual_takeoff = parse_timestamp("2023-01-05T09:30");
        early.actual_landing = parse_timestamp("2023-01-05T17:30");

        let no_times = flight("SFO", "NRT", "UA", "");

        let report = compute(&[late, early, no_times], &airports());
        assert!((report.total_delay_hours - 1.5).abs() < 1e-9);
        assert!((report.total_flight_time_hours - 15.0).abs() < 1e-9);
        assert_eq!(report.incomplete_flight_times, 1);
    }

    #[test]
    fn test_extreme_spans_sum_past_the_duration_range() {
        let csv = format!(
            "From,To,Gate Departure (Scheduled),Gate Departure (Actual),Take off (Actual),Landing (Actual)\n{}",
            "JFK,LHR,-262000-01-01T00:00,+262000-01-01T00:00,-262000-01-01T00:00,+262000-01-01T00:00\n"
                .repeat(600)
        );
        let parsed = crate::flight::parse_flights(csv.as_bytes(), "t").unwrap();
        assert_eq!(parsed.records.len(), 600);
        assert_eq!(parsed.invalid_fields, 0);

        let span = parsed.records[0].flight_time().unwrap().num_seconds();
        let total = span * 600;
        // Past what a millisecond-based duration can hold
        assert!(total > i64::MAX / 1000);

        let report = compute(&parsed.records, &airports());
        assert_eq!(report.total_flights, 600);
        #[allow(clippy::cast_precision_loss)]
        let hours = total as f64 / 3600.0;
        assert_eq!(report.total_flight_time_hours, hours);
        assert_eq!(report.total_delay_hours, hours);
    }

    #[test]
    fn test_seconds_total_saturates() {
        let mut total = SecondsTotal(i64::MAX - 5);
        total.add(Duration::seconds(10));
        assert_eq!(total.0, i64::MAX);
        total.add(Duration::seconds(1));
        assert_eq!(total.0, i64::MAX);
    }

    #[test]
    fn test_leg_distances_sum_to_total() {
        let report = compute(&sample(), &airports());
        let sum: f64 = report.routes.iter().map(|r| r.distance_miles).sum();
        assert_eq!(sum, report.total_distance_miles);
        assert_eq!(report.routes.len(), 6);
        assert_eq!(report.unresolved_routes, 1);
    }

    #[test]
    fn test_routes_keep_input_order() {
        let report = compute(&sample(), &airports());
        let keys: Vec<(&str, &str)> = report
            .routes
            .iter()
            .map(|r| (r.from_code.as_str(), r.to_code.as_str()))
            .collect();
        assert_eq!(keys[0], ("JFK", "LHR"));
        assert_eq!(keys[1], ("LHR", "JFK"));
        assert_eq!(keys[5], ("JFK", "LHR"));
    }

    #[test]
    fn test_top_tables_sorted_with_first_seen_ties() {
        let report = compute(&sample(), &airports());

        let airlines: Vec<(&str, usize)> = report
            .top_airlines
            .iter()
            .map(|e| (e.key.as_str(), e.count))
            .collect();
        assert_eq!(airlines, vec![("BA", 2), ("UA", 2), ("AF", 1), ("VS", 1)]);

        assert_eq!(report.top_routes[0].key, "JFK → LHR");
        assert_eq!(report.top_routes[0].count, 2);
        assert_eq!(report.top_routes[1].key, "LHR → JFK");
        assert_eq!(report.total_airlines, 4);
        assert_eq!(report.most_flown_aircraft.as_deref(), Some("Boeing 777"));
    }

    #[test]
    fn test_top_n_truncates() {
        let records: Vec<FlightRecord> = (0..15)
            .map(|i| flight("JFK", "LHR", &format!("Airline {i:02}"), ""))
            .collect();

        let report = MetricsEngine::new(10).compute(&records, &airports());
        assert_eq!(report.top_airlines.len(), 10);
        assert_eq!(report.total_airlines, 15);
        assert_eq!(report.top_airlines[0].key, "Airline 00");

        let report = MetricsEngine::new(3).compute(&records, &airports());
        assert_eq!(report.top_airlines.len(), 3);
    }

    #[test]
    fn test_top_tables_never_increase() {
        let report = compute(&sample(), &airports());
        for table in [&report.top_airlines, &report.top_routes, &report.top_aircraft] {
            assert!(table.len() <= DEFAULT_TOP_N);
            assert!(table.windows(2).all(|w| w[0].count >= w[1].count));
        }
    }

    #[test]
    fn test_distinct_counts_are_monotonic() {
        let records = sample();
        let table = airports();
        let mut previous = MetricsReport::default();
        for n in 0..=records.len() {
            let report = compute(&records[..n], &table);
            assert!(report.total_airports >= previous.total_airports);
            assert!(report.total_airlines >= previous.total_airlines);
            assert!(report.total_countries >= previous.total_countries);
            previous = report;
        }
    }

    #[test]
    fn test_compute_is_idempotent() {
        let records = sample();
        let table = airports();
        assert_eq!(compute(&records, &table), compute(&records, &table));
    }

    #[test]
    fn test_canceled_flights_are_excluded() {
        let mut canceled = flight("SFO", "NRT", "UA", "Boeing 787");
        canceled.canceled = true;
        let records = vec![flight("JFK", "LHR", "BA", "Boeing 777"), canceled];

        let report = compute(&records, &airports());
        assert_eq!(report.total_flights, 1);
        assert_eq!(report.canceled_flights, 1);
        assert_eq!(report.airports_visited, vec!["JFK", "LHR"]);
        assert_eq!(report.total_airlines, 1);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_empty_airline_and_aircraft_are_ignored() {
        let records = vec![flight("JFK", "LHR", "", ""), flight("JFK", "LHR", "", "")];
        let report = compute(&records, &airports());
        assert_eq!(report.total_airlines, 0);
        assert!(report.top_airline.is_none());
        assert!(report.most_flown_aircraft.is_none());
        assert!(report.top_aircraft.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let report = compute(&[], &airports());
        assert!(report.is_empty());
        assert_eq!(report.total_distance_miles, 0.0);
        assert!(report.top_routes.is_empty());
    }

    #[test]
    fn test_empty_airport_table_resolves_nothing() {
        let report = compute(&sample(), &AirportTable::empty());
        assert_eq!(report.total_flights, 7);
        assert_eq!(report.total_distance_miles, 0.0);
        assert_eq!(report.total_airports, 0);
        assert_eq!(report.unresolved_routes, 7);
        assert_eq!(report.top_routes[0].key, "JFK → LHR");
    }

    #[test]
    fn test_report_serializes() {
        let report = compute(&sample(), &airports());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("total_distance_miles"));
        let back: MetricsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.top_routes, report.top_routes);
    }
}
