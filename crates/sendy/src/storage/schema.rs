//! `SQLite` schema definitions for the share store.

/// SQL statement to create the shares table.
///
/// Each row is a snapshot of one export: the raw CSV, the report computed
/// from it, and the share's lifecycle metadata. Timestamps are RFC 3339,
/// date bounds `YYYY-MM-DD`.
pub const CREATE_SHARES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS shares (
    share_id TEXT PRIMARY KEY,
    dataset_hash TEXT NOT NULL,
    owner_name TEXT,
    range_since TEXT,
    range_until TEXT,
    total_flights INTEGER NOT NULL,
    flights_csv TEXT NOT NULL,
    report_json TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    deactivated_at TEXT
)
";

/// Index on `expires_at` for pruning and listing.
pub const CREATE_EXPIRES_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_shares_expires ON shares(expires_at)
";

/// Index on `dataset_hash` for finding shares of the same export.
pub const CREATE_HASH_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_shares_hash ON shares(dataset_hash)
";

/// Partial index over live shares, added by schema version 2.
///
/// Covers the `is_active = 1 AND expires_at > now` lookups behind
/// `list_active_shares` and `stats` without scanning revoked rows.
pub const CREATE_ACTIVE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_shares_active ON shares(expires_at) WHERE is_active = 1
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Version 1 schema creation statements in order.
///
/// Later versions are applied by the migration chain.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_SHARES_TABLE,
    CREATE_EXPIRES_INDEX,
    CREATE_HASH_INDEX,
    CREATE_METADATA_TABLE,
];
