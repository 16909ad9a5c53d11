//! Error types for sendy.
//!
//! Row-level problems and airport lookup misses never surface here; they are
//! recovered locally and reported as counters. This enum covers the failures
//! that reach the caller: missing input, structurally invalid input,
//! configuration, storage and I/O.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for sendy operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Input Errors ===
    /// The input source is missing or holds no data.
    #[error("no data available: {source_name}")]
    NoData {
        /// What was being loaded (usually a file path).
        source_name: String,
    },

    /// The input does not have the expected tabular shape.
    #[error("invalid input structure: {message}")]
    Structure {
        /// Description of what is wrong with the input.
        message: String,
    },

    /// The CSV reader failed in a way that cannot be skipped row by row.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // === Storage Errors ===
    /// Failed to open or create the share database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Share Errors ===
    /// No active share exists for the given id.
    #[error("share '{id}' is invalid or has expired")]
    ShareNotFound {
        /// The requested share id.
        id: String,
    },

    /// Could not allocate an unused share id.
    #[error("could not allocate a unique share id after {attempts} attempts")]
    ShareIdExhausted {
        /// Number of candidate ids tried.
        attempts: u32,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for sendy operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a "no data available" error for the named source.
    #[must_use]
    pub fn no_data(source_name: impl Into<String>) -> Self {
        Self::NoData {
            source_name: source_name.into(),
        }
    }

    /// Create a structural input error.
    #[must_use]
    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure {
            message: message.into(),
        }
    }

    /// Create a share-not-found error.
    #[must_use]
    pub fn share_not_found(id: impl Into<String>) -> Self {
        Self::ShareNotFound { id: id.into() }
    }

    /// Check if this error means there was simply nothing to load.
    #[must_use]
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }

    /// Check if this error is a structural input problem.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_display() {
        let err = Error::no_data("flights.csv");
        assert_eq!(err.to_string(), "no data available: flights.csv");
        assert!(err.is_no_data());
        assert!(!err.is_structural());
    }

    #[test]
    fn test_structure_display() {
        let err = Error::structure("missing column 'From'");
        assert_eq!(
            err.to_string(),
            "invalid input structure: missing column 'From'"
        );
        assert!(err.is_structural());
        assert!(!err.is_no_data());
    }

    #[test]
    fn test_share_not_found_display() {
        let err = Error::share_not_found("aB3dE5fG");
        assert!(err.to_string().contains("aB3dE5fG"));
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_share_id_exhausted_display() {
        let err = Error::ShareIdExhausted { attempts: 16 };
        assert!(err.to_string().contains("16"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "top_n must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("top_n"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
