//! Configuration management for sendy.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML
//! file, then `SENDY_`-prefixed environment variables.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::DEFAULT_TOP_N;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "sendy";

/// Default airport reference file name.
const AIRPORTS_FILE_NAME: &str = "airports.csv";

/// Default share database file name.
const DATABASE_FILE_NAME: &str = "shares.db";

/// Application configuration.
///
/// Loaded from (highest precedence first):
/// 1. Environment variables (prefixed with `SENDY_`)
/// 2. TOML config file at `~/.config/sendy/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reference data configuration.
    pub data: DataConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
    /// Share store configuration.
    pub storage: StorageConfig,
    /// Share link configuration.
    pub share: ShareConfig,
}

/// Reference data configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path to the airport reference CSV.
    /// Defaults to `~/.local/share/sendy/airports.csv`
    pub airports_path: Option<PathBuf>,
}

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Length of the top airline/route/aircraft tables.
    pub top_n: usize,
}

/// Share store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the share database.
    /// Defaults to `~/.local/share/sendy/shares.db`
    pub database_path: Option<PathBuf>,
}

/// Share link configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Base URL share links are built on.
    pub base_url: String,
    /// Days until a new share expires.
    pub expiry_days: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            expiry_days: 30,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SENDY_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.metrics.top_n == 0 {
            return Err(Error::ConfigValidation {
                message: "metrics.top_n must be greater than 0".to_string(),
            });
        }

        if self.share.expiry_days == 0 {
            return Err(Error::ConfigValidation {
                message: "share.expiry_days must be greater than 0".to_string(),
            });
        }

        let base_url = self.share.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::ConfigValidation {
                message: format!("share.base_url must be an http(s) URL: {base_url:?}"),
            });
        }

        Ok(())
    }

    /// Get the airport reference path, resolving defaults if not set.
    #[must_use]
    pub fn airports_path(&self) -> PathBuf {
        self.data
            .airports_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(AIRPORTS_FILE_NAME))
    }

    /// Get the share database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.data.airports_path.is_none());
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.metrics.top_n, 10);
        assert_eq!(config.share.expiry_days, 30);
        assert_eq!(config.share.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_top_n() {
        let mut config = Config::default();
        config.metrics.top_n = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("top_n"));
    }

    #[test]
    fn test_validate_zero_expiry() {
        let mut config = Config::default();
        config.share.expiry_days = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("expiry_days"));
    }

    #[test]
    fn test_validate_bad_base_url() {
        let mut config = Config::default();
        config.share.base_url = "ftp://example.com".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("base_url"));
    }

    #[test]
    fn test_airports_path_default() {
        let config = Config::default();
        assert!(config.airports_path().to_string_lossy().contains("airports.csv"));
    }

    #[test]
    fn test_airports_path_custom() {
        let mut config = Config::default();
        config.data.airports_path = Some(PathBuf::from("/data/airports.csv"));
        assert_eq!(config.airports_path(), PathBuf::from("/data/airports.csv"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config.database_path().to_string_lossy().contains("shares.db"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("sendy"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("sendy_config_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[metrics]\ntop_n = 5\n\n[share]\nbase_url = \"https://sendy.example\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.metrics.top_n, 5);
        assert_eq!(config.share.base_url, "https://sendy.example");
        assert_eq!(config.share.expiry_days, 30);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_invalid_toml_values_fail_validation() {
        let path =
            std::env::temp_dir().join(format!("sendy_bad_config_{}.toml", std::process::id()));
        std::fs::write(&path, "[metrics]\ntop_n = 0\n").unwrap();

        let result = Config::load_from(Some(path.clone()));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_metrics_config_deserialize() {
        let metrics: MetricsConfig = serde_json::from_str(r#"{"top_n": 3}"#).unwrap();
        assert_eq!(metrics.top_n, 3);
    }

    #[test]
    fn test_share_config_serialize() {
        let json = serde_json::to_string(&ShareConfig::default()).unwrap();
        assert!(json.contains("expiry_days"));
    }
}
