//! Airport reference table.
//!
//! Maps an airport code to its coordinates and country. The table is loaded
//! from a CSV file with `code, latitude, longitude, country` columns; the
//! OurAirports column names (`iata_code`, `latitude_deg`, `longitude_deg`,
//! `iso_country`) are accepted too.
//!
//! Duplicate codes resolve first-write-wins. Rows without a code, with
//! unusable coordinates, or that the CSV reader cannot decode are skipped and
//! counted rather than failing the load.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::geo::Coordinates;

/// One airport in the reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportRef {
    /// Normalized (trimmed, upper-case) airport code.
    pub code: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Country, as given by the source (ISO code for OurAirports data).
    pub country: String,
}

impl AirportRef {
    /// The airport's position.
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// A row as it appears in the source file, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAirportRow {
    #[serde(alias = "iata_code", alias = "iata", alias = "IATA")]
    code: Option<String>,
    #[serde(alias = "latitude_deg", alias = "lat")]
    latitude: Option<String>,
    #[serde(alias = "longitude_deg", alias = "lon", alias = "lng")]
    longitude: Option<String>,
    #[serde(alias = "iso_country")]
    country: Option<String>,
}

impl RawAirportRow {
    fn into_airport(self) -> Option<AirportRef> {
        let code = normalize_code(self.code.as_deref()?)?;
        let latitude: f64 = self.latitude?.trim().parse().ok()?;
        let longitude: f64 = self.longitude?.trim().parse().ok()?;
        let coordinates = Coordinates::new(latitude, longitude)?;
        Some(AirportRef {
            code,
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            country: self.country.unwrap_or_default().trim().to_string(),
        })
    }
}

/// Counters describing how a load went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Airports inserted into the table.
    pub loaded: usize,
    /// Rows skipped for a missing code, bad coordinates or a decode error.
    pub skipped_rows: usize,
    /// Rows ignored because their code was already present.
    pub duplicate_codes: usize,
}

/// Airport code to [`AirportRef`] mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AirportTable {
    airports: HashMap<String, AirportRef>,
}

impl AirportTable {
    /// A table with no airports; every lookup misses.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoData`] if the file is missing, empty or has no data
    /// rows, and an I/O error if it exists but cannot be read.
    pub fn load_path(path: impl AsRef<Path>) -> Result<(Self, LoadReport)> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::no_data(path.display().to_string()));
        }
        debug!("Loading airports from {}", path.display());
        let file = std::fs::File::open(path)?;
        let (table, report) = Self::from_reader(file, &path.display().to_string())?;
        info!(
            "Loaded {} airports from {} ({} skipped, {} duplicates)",
            report.loaded,
            path.display(),
            report.skipped_rows,
            report.duplicate_codes
        );
        Ok((table, report))
    }

    /// Load the table from any CSV reader. `source_name` is used in errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoData`] if the source has no data rows, and a CSV
    /// error if the header row itself cannot be read.
    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<(Self, LoadReport)> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(reader);

        if rdr.headers()?.is_empty() {
            return Err(Error::no_data(source_name));
        }

        let mut table = Self::empty();
        let mut report = LoadReport::default();
        let mut rows = 0usize;

        for (index, result) in rdr.deserialize::<RawAirportRow>().enumerate() {
            rows += 1;
            let airport = match result {
                Ok(raw) => raw.into_airport(),
                Err(e) => {
                    trace!("Airport row {} unreadable: {}", index + 1, e);
                    None
                }
            };
            let Some(airport) = airport else {
                report.skipped_rows += 1;
                continue;
            };
            if table.insert(airport) {
                report.loaded += 1;
            } else {
                report.duplicate_codes += 1;
            }
        }

        if rows == 0 {
            return Err(Error::no_data(source_name));
        }
        if report.skipped_rows > 0 {
            warn!(
                "Skipped {} airport rows without a code or usable coordinates",
                report.skipped_rows
            );
        }
        Ok((table, report))
    }

    /// Insert an airport unless its code is already present.
    ///
    /// Returns `true` if the airport was inserted.
    pub fn insert(&mut self, airport: AirportRef) -> bool {
        if self.airports.contains_key(&airport.code) {
            return false;
        }
        self.airports.insert(airport.code.clone(), airport);
        true
    }

    /// Look up an airport by code (case-insensitive, whitespace-trimmed).
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&AirportRef> {
        let code = normalize_code(code)?;
        self.airports.get(&code)
    }

    /// Coordinates of a code, if it resolves.
    #[must_use]
    pub fn coordinates(&self, code: &str) -> Option<Coordinates> {
        self.get(code).map(AirportRef::coordinates)
    }

    /// Country of a code, if it resolves and the country is known.
    #[must_use]
    pub fn country(&self, code: &str) -> Option<&str> {
        self.get(code)
            .map(|a| a.country.as_str())
            .filter(|c| !c.is_empty())
    }

    /// Whether the code resolves.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Number of airports in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    /// Whether the table has no airports.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

impl FromIterator<AirportRef> for AirportTable {
    fn from_iter<I: IntoIterator<Item = AirportRef>>(iter: I) -> Self {
        let mut table = Self::empty();
        for airport in iter {
            table.insert(airport);
        }
        table
    }
}

/// Trim and upper-case an airport code; `None` if nothing is left.
#[must_use]
pub fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim();
    (!code.is_empty()).then(|| code.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(csv: &str) -> Result<(AirportTable, LoadReport)> {
        AirportTable::from_reader(csv.as_bytes(), "test")
    }

    #[test]
    fn test_load_basic() {
        let (table, report) = load(
            "code,latitude,longitude,country\n\
             JFK,40.6398,-73.7789,US\n\
             LHR,51.4706,-0.461941,GB\n",
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped_rows, 0);
        assert_eq!(table.country("LHR"), Some("GB"));
        let jfk = table.coordinates("JFK").unwrap();
        assert!((jfk.latitude - 40.6398).abs() < 1e-9);
    }

    #[test]
    fn test_load_ourairports_headers() {
        let (table, _) = load(
            "id,ident,type,name,latitude_deg,longitude_deg,iso_country,iata_code\n\
             1,KJFK,large_airport,John F Kennedy,40.6398,-73.7789,US,JFK\n",
        )
        .unwrap();

        assert_eq!(table.get("JFK").unwrap().country, "US");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let (table, _) = load("code,latitude,longitude,country\nsfo,37.6,-122.4,US\n").unwrap();
        assert!(table.contains("SFO"));
        assert!(table.contains(" sfo "));
        assert!(!table.contains(""));
    }

    #[test]
    fn test_duplicate_codes_first_write_wins() {
        let (table, report) = load(
            "code,latitude,longitude,country\n\
             LHR,51.47,-0.46,GB\n\
             LHR,0.0,0.0,XX\n",
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(report.duplicate_codes, 1);
        assert_eq!(table.country("LHR"), Some("GB"));
    }

    #[test]
    fn test_rows_without_code_or_coordinates_are_skipped() {
        let (table, report) = load(
            "code,latitude,longitude,country\n\
             ,1.0,2.0,US\n\
             BAD,north,2.0,US\n\
             OOR,95.0,2.0,US\n\
             NOL,10.0,,US\n\
             OK,10.0,20.0,US\n",
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(report.skipped_rows, 4);
        assert!(table.contains("OK"));
    }

    #[test]
    fn test_unknown_code_is_none() {
        let (table, _) = load("code,latitude,longitude,country\nJFK,40.6,-73.7,US\n").unwrap();
        assert!(table.get("XXX").is_none());
        assert!(table.coordinates("XXX").is_none());
        assert!(table.country("XXX").is_none());
    }

    #[test]
    fn test_empty_country_is_none() {
        let (table, _) = load("code,latitude,longitude,country\nZZZ,1.0,1.0,\n").unwrap();
        assert!(table.contains("ZZZ"));
        assert!(table.country("ZZZ").is_none());
    }

    #[test]
    fn test_empty_source_is_no_data() {
        assert!(load("").unwrap_err().is_no_data());
        assert!(load("code,latitude,longitude,country\n")
            .unwrap_err()
            .is_no_data());
    }

    #[test]
    fn test_missing_file_is_no_data() {
        let err = AirportTable::load_path("/nonexistent/airports.csv").unwrap_err();
        assert!(err.is_no_data());
    }

    #[test]
    fn test_load_path_from_file() {
        let path = std::env::temp_dir().join(format!("sendy_airports_{}.csv", std::process::id()));
        std::fs::write(&path, "code,latitude,longitude,country\nCDG,49.0,2.55,FR\n").unwrap();

        let (table, report) = AirportTable::load_path(&path).unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(table.country("CDG"), Some("FR"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_from_iterator_first_write_wins() {
        let table: AirportTable = vec![
            AirportRef {
                code: "AAA".to_string(),
                latitude: 1.0,
                longitude: 1.0,
                country: "A".to_string(),
            },
            AirportRef {
                code: "AAA".to_string(),
                latitude: 2.0,
                longitude: 2.0,
                country: "B".to_string(),
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(table.len(), 1);
        assert_eq!(table.country("AAA"), Some("A"));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" jfk "), Some("JFK".to_string()));
        assert_eq!(normalize_code("   "), None);
    }
}
