//! Share store.
//!
//! Persists a snapshot of an export (the raw CSV plus the report computed
//! from it) under a short share id, so it can be viewed again until the share
//! expires or is revoked. Backed by `SQLite`.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::filter::DateRange;
use crate::metrics::MetricsReport;

/// Length of a share id.
pub const SHARE_ID_LEN: usize = 8;

/// Candidate ids tried before giving up on a collision streak.
const MAX_ID_ATTEMPTS: u32 = 16;

/// Columns selected for [`ShareInfo`], in `row_to_info` order.
const INFO_COLUMNS: &str = "share_id, dataset_hash, owner_name, range_since, range_until, \
     total_flights, is_active, created_at, expires_at, deactivated_at";

/// Options for a new share.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareOptions {
    /// Name shown as "<name>'s Flights".
    pub owner_name: Option<String>,
    /// Date filter the report was computed with.
    pub range: DateRange,
    /// Days until the share expires.
    pub expiry_days: u32,
}

/// Metadata about a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareInfo {
    /// The share id.
    pub share_id: String,
    /// BLAKE3 hash of the shared CSV.
    pub dataset_hash: String,
    /// Owner name, if given.
    pub owner_name: Option<String>,
    /// Date filter the report was computed with.
    pub range: DateRange,
    /// Flights in the shared report.
    pub total_flights: i64,
    /// Whether the share has not been revoked.
    pub is_active: bool,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
    /// When the share stops being valid.
    pub expires_at: DateTime<Utc>,
    /// When the share was revoked, if it was.
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl ShareInfo {
    /// Whether the share has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the share can be viewed at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }

    /// Dashboard title for the share.
    #[must_use]
    pub fn title(&self) -> String {
        match &self.owner_name {
            Some(name) => format!("{name}'s Flights"),
            None => "Shared Flights".to_string(),
        }
    }
}

/// A share loaded for viewing.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedDataset {
    /// Share metadata.
    pub info: ShareInfo,
    /// The export exactly as it was shared.
    pub flights_csv: String,
    /// The report as it was computed at share time.
    pub report: MetricsReport,
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Shares stored, including expired and revoked ones.
    pub total_shares: i64,
    /// Shares that are active and unexpired.
    pub active_shares: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// `SQLite`-backed share store.
#[derive(Debug)]
pub struct ShareStore {
    path: PathBuf,
    conn: Connection,
}

impl ShareStore {
    /// Open or create a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the database
    /// cannot be opened, or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening share store at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Share store opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a snapshot and return its new share id.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized, no unused id
    /// can be found, or the insert fails.
    pub fn create_share(
        &self,
        flights_csv: &str,
        report: &MetricsReport,
        options: &ShareOptions,
    ) -> Result<String> {
        let dataset_hash = dataset_hash(flights_csv);
        let created_at = Utc::now();
        let expires_at = created_at + Duration::days(i64::from(options.expiry_days));

        let share_id = self.allocate_share_id()?;
        let report_json = serde_json::to_string(report)?;
        let total_flights = i64::try_from(report.total_flights).unwrap_or(i64::MAX);
        let owner_name = options
            .owner_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        self.conn.execute(
            r"
            INSERT INTO shares (share_id, dataset_hash, owner_name, range_since, range_until,
                                total_flights, flights_csv, report_json, is_active,
                                created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10)
            ",
            params![
                share_id,
                dataset_hash,
                owner_name,
                options.range.since.map(format_date),
                options.range.until.map(format_date),
                total_flights,
                flights_csv,
                report_json,
                format_timestamp(created_at),
                format_timestamp(expires_at),
            ],
        )?;

        info!(
            "Created share {} ({} flights, expires {})",
            share_id,
            report.total_flights,
            expires_at.format("%Y-%m-%d")
        );
        Ok(share_id)
    }

    fn allocate_share_id(&self) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = generate_share_id();
            if !self.share_exists(&candidate)? {
                return Ok(candidate);
            }
            debug!("Share id {} already taken, retrying", candidate);
        }
        Err(Error::ShareIdExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Whether a share with this id is stored, valid or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn share_exists(&self, share_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM shares WHERE share_id = ?1",
            [share_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Metadata for a share, whether or not it is still valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_share_info(&self, share_id: &str) -> Result<Option<ShareInfo>> {
        let info = self
            .conn
            .query_row(
                &format!("SELECT {INFO_COLUMNS} FROM shares WHERE share_id = ?1"),
                [share_id],
                Self::row_to_info,
            )
            .optional()?;
        Ok(info)
    }

    /// Whether `share_id` is well-formed, stored, active and unexpired.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn validate_share_id(&self, share_id: &str) -> Result<bool> {
        if !is_valid_share_id_format(share_id) {
            return Ok(false);
        }
        let Some(info) = self.get_share_info(share_id)? else {
            return Ok(false);
        };
        if info.is_expired_at(Utc::now()) {
            debug!("Share {} has expired", share_id);
        }
        Ok(info.is_valid_at(Utc::now()))
    }

    /// Load a valid share for viewing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShareNotFound`] if the id is unknown, revoked or
    /// expired, and a JSON error if the stored report cannot be decoded.
    pub fn load_shared(&self, share_id: &str) -> Result<SharedDataset> {
        if !self.validate_share_id(share_id)? {
            return Err(Error::share_not_found(share_id));
        }
        let info = self
            .get_share_info(share_id)?
            .ok_or_else(|| Error::share_not_found(share_id))?;
        let (flights_csv, report_json): (String, String) = self.conn.query_row(
            "SELECT flights_csv, report_json FROM shares WHERE share_id = ?1",
            [share_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let report = serde_json::from_str(&report_json)?;
        Ok(SharedDataset {
            info,
            flights_csv,
            report,
        })
    }

    /// Revoke a share without deleting its data.
    ///
    /// Returns `false` if no active share has this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn deactivate_share(&self, share_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE shares SET is_active = 0, deactivated_at = ?2 WHERE share_id = ?1 AND is_active = 1",
            params![share_id, format_timestamp(Utc::now())],
        )?;
        if affected > 0 {
            info!("Share {} deactivated", share_id);
        } else {
            warn!("No active share {} to deactivate", share_id);
        }
        Ok(affected > 0)
    }

    /// Delete a share and its data.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_share(&self, share_id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM shares WHERE share_id = ?1", [share_id])?;
        Ok(affected > 0)
    }

    /// All shares that are active and unexpired, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_active_shares(&self) -> Result<Vec<ShareInfo>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INFO_COLUMNS} FROM shares
             WHERE is_active = 1 AND expires_at > ?1
             ORDER BY created_at DESC"
        ))?;
        let shares = stmt
            .query_map([format_timestamp(Utc::now())], Self::row_to_info)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(shares)
    }

    /// Delete every expired share. Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_expired(&self) -> Result<usize> {
        let affected = self.conn.execute(
            "DELETE FROM shares WHERE expires_at <= ?1",
            [format_timestamp(Utc::now())],
        )?;
        if affected > 0 {
            info!("Pruned {} expired shares", affected);
        }
        Ok(affected)
    }

    /// Number of stored shares.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM shares", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let total_shares = self.count()?;
        let active_shares: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM shares WHERE is_active = 1 AND expires_at > ?1",
            [format_timestamp(Utc::now())],
            |row| row.get(0),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            total_shares,
            active_shares,
            db_size_bytes,
        })
    }

    fn row_to_info(row: &rusqlite::Row) -> rusqlite::Result<ShareInfo> {
        let since: Option<String> = row.get(3)?;
        let until: Option<String> = row.get(4)?;
        let created_at: String = row.get(7)?;
        let expires_at: String = row.get(8)?;
        let deactivated_at: Option<String> = row.get(9)?;

        Ok(ShareInfo {
            share_id: row.get(0)?,
            dataset_hash: row.get(1)?,
            owner_name: row.get(2)?,
            range: DateRange {
                since: since.as_deref().and_then(parse_date),
                until: until.as_deref().and_then(parse_date),
            },
            total_flights: row.get(5)?,
            is_active: row.get(6)?,
            created_at: parse_stored_timestamp(&created_at),
            expires_at: parse_stored_timestamp(&expires_at),
            deactivated_at: deactivated_at.as_deref().map(parse_stored_timestamp),
        })
    }
}

/// BLAKE3 hex digest of an export.
#[must_use]
pub fn dataset_hash(flights_csv: &str) -> String {
    blake3::hash(flights_csv.as_bytes()).to_hex().to_string()
}

/// Whether `share_id` has the shape of a share id.
#[must_use]
pub fn is_valid_share_id_format(share_id: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9]{8}$").expect("Invalid share id pattern"))
        .is_match(share_id)
}

/// Public URL of a share.
#[must_use]
pub fn share_url(base_url: &str, share_id: &str) -> String {
    format!("{}/share/{share_id}", base_url.trim_end_matches('/'))
}

/// A fresh id of [`SHARE_ID_LEN`] alphanumeric characters from the
/// thread-local CSPRNG. Share ids are unguessable link credentials.
fn generate_share_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_ID_LEN)
        .map(char::from)
        .collect()
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_stored_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(
        |_| {
            warn!("Unparseable stored timestamp {value:?}, treating as expired");
            DateTime::<Utc>::default()
        },
        |dt| dt.with_timezone(&Utc),
    )
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
