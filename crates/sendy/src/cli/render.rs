//! Plain-text rendering of reports and shares for the terminal.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::filter::DateRange;
use crate::metrics::{CountEntry, MetricsReport};
use crate::storage::{share_url, ShareInfo};

const LABEL_WIDTH: usize = 20;

/// Insert thousands separators into the integer part of a formatted number.
#[must_use]
pub fn group_digits(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.find('.') {
        Some(idx) => unsigned.split_at(idx),
        None => (unsigned, ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}{frac_part}")
}

/// `24,345 miles`
#[must_use]
pub fn format_miles(miles: f64) -> String {
    format!("{} miles", group_digits(&format!("{miles:.0}")))
}

/// `1,051.2 hours`
#[must_use]
pub fn format_hours(hours: f64) -> String {
    format!("{} hours", group_digits(&format!("{hours:.1}")))
}

/// Render the statistics dashboard.
#[must_use]
pub fn render_dashboard(title: &str, range: DateRange, report: &MetricsReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    let _ = write!(out, "Analyzing {} flights", group_digits(&report.total_flights.to_string()));
    if !range.is_unbounded() {
        let _ = write!(out, " ({range})");
    }
    let _ = writeln!(out);
    if report.canceled_flights > 0 {
        let _ = writeln!(out, "{} canceled flights excluded", report.canceled_flights);
    }
    let _ = writeln!(out);

    if report.is_empty() {
        let _ = writeln!(out, "No flights in this range.");
        return out;
    }

    let rows = [
        ("Total Flights", report.total_flights.to_string()),
        ("Distance Traveled", format_miles(report.total_distance_miles)),
        ("Flight Time", format_hours(report.total_flight_time_hours)),
        ("Delay Time", format_hours(report.total_delay_hours)),
        ("Airports Visited", report.total_airports.to_string()),
        ("Airlines Flown", report.total_airlines.to_string()),
        ("Countries Visited", report.total_countries.to_string()),
        (
            "Most Flown Aircraft",
            report
                .most_flown_aircraft
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
        ),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "{label:<LABEL_WIDTH$}{value}");
    }

    write_table(&mut out, "Top Airlines", &report.top_airlines);
    write_table(&mut out, "Top Routes", &report.top_routes);
    write_table(&mut out, "Top Aircraft Types", &report.top_aircraft);

    if !report.unresolved_codes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Unknown airports: {} ({} legs without a distance)",
            report.unresolved_codes.join(", "),
            report.unresolved_routes
        );
    }
    if report.incomplete_flight_times > 0 {
        let _ = writeln!(
            out,
            "{} flights without usable takeoff/landing times",
            report.incomplete_flight_times
        );
    }

    out
}

fn write_table(out: &mut String, heading: &str, entries: &[CountEntry]) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{heading}");
    let width = entries
        .iter()
        .map(|e| e.key.chars().count())
        .max()
        .unwrap_or(0);
    for entry in entries {
        let _ = writeln!(out, "  {:<width$}  {}", entry.key, entry.count);
    }
}

/// Render the resolved route legs, longest first.
#[must_use]
pub fn render_routes(report: &MetricsReport) -> String {
    let mut out = String::new();

    if report.routes.is_empty() {
        let _ = writeln!(out, "No route data available");
        return out;
    }

    let mut legs: Vec<_> = report.routes.iter().collect();
    legs.sort_by(|a, b| b.distance_miles.total_cmp(&a.distance_miles));

    for leg in &legs {
        let _ = writeln!(
            out,
            "{} \u{2192} {}  {:>12}",
            leg.from_code,
            leg.to_code,
            format_miles(leg.distance_miles)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total legs: {} | Airports visited: {}",
        legs.len(),
        report.total_airports
    );
    out
}

/// Render the active shares as a table.
#[must_use]
pub fn render_share_list(shares: &[ShareInfo], base_url: &str, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    if shares.is_empty() {
        let _ = writeln!(out, "No active shares.");
        return out;
    }

    for share in shares {
        let days_left = (share.expires_at - now).num_days();
        let _ = writeln!(
            out,
            "{}  {:<20}  {:>5} flights  expires in {} days",
            share.share_id,
            share.title(),
            share.total_flights,
            days_left.max(0)
        );
        let _ = writeln!(out, "  {}", share_url(base_url, &share.share_id));
    }
    out
}
