//! Runtime configuration from the environment (and an optional `.env` file).

use std::path::PathBuf;
use std::time::Duration;

use crate::data::h8::DEFAULT_H8_URL;
use crate::error::{AppError, EXIT_CONFIG, EXIT_IO};

const DEFAULT_DATABASE_PATH: &str = "data/bankpulse.db";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub data_dir: PathBuf,
    pub h8_data_url: String,
    pub fetch_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            h8_data_url: DEFAULT_H8_URL.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let fetch_timeout = match non_empty("H8_FETCH_TIMEOUT_SECS") {
            None => defaults.fetch_timeout,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(AppError::new(
                        EXIT_CONFIG,
                        format!("H8_FETCH_TIMEOUT_SECS must be a positive integer, got '{raw}'."),
                    ));
                }
            },
        };

        Ok(Self {
            database_path: non_empty("DATABASE_PATH").map_or(defaults.database_path, PathBuf::from),
            data_dir: non_empty("DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            h8_data_url: non_empty("H8_DATA_URL").unwrap_or(defaults.h8_data_url),
            fetch_timeout,
        })
    }

    /// Create the data directory if it does not exist yet.
    pub fn ensure_data_dir(&self) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            AppError::new(
                EXIT_IO,
                format!("Failed to create data directory '{}': {e}", self.data_dir.display()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_PATH", "  ")])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.fetch_timeout, Duration::from_secs(60));
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_PATH", "/tmp/h8.db"),
            ("H8_DATA_URL", "http://localhost/h8.zip"),
            ("H8_FETCH_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/h8.db"));
        assert_eq!(config.h8_data_url, "http://localhost/h8.zip");
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn data_dir_is_created_on_demand() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().join("nested").join("data");
        let config = AppConfig::from_lookup(lookup(&[("DATA_DIR", data_dir.to_str().unwrap())])).unwrap();
        assert_eq!(config.data_dir, data_dir);

        config.ensure_data_dir().unwrap();
        assert!(data_dir.is_dir());
        // Existing directory is fine.
        config.ensure_data_dir().unwrap();
    }

    #[test]
    fn data_dir_under_a_file_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain");
        std::fs::write(&file, b"x").unwrap();
        let config = AppConfig { data_dir: file.join("data"), ..AppConfig::default() };
        assert_eq!(config.ensure_data_dir().unwrap_err().exit_code(), EXIT_IO);
    }

    #[test]
    fn bad_timeout_is_a_config_error() {
        let err = AppConfig::from_lookup(lookup(&[("H8_FETCH_TIMEOUT_SECS", "0")])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }
}
