//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default image cache ceiling (50 MiB).
pub const DEFAULT_IMAGE_CACHE_MAX_BYTES: u64 = 50 * 1024 * 1024;

/// Offline cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file backing the store
    pub database_path: PathBuf,
    /// Base URL of the backend collaborator
    pub api_base_url: String,
    /// Image cache ceiling in bytes
    pub image_cache_max_bytes: u64,
    /// Expiry sweep interval in seconds
    pub sweep_interval: u64,
    /// Connectivity probe interval in seconds
    pub connectivity_interval: u64,
    /// Connectivity probe timeout in milliseconds
    pub probe_timeout_ms: u64,
    /// Bulk populate / image fetch timeout in milliseconds
    pub fetch_timeout_ms: u64,
    /// Pending actions older than this are dropped by cache optimization
    pub pending_max_age_days: i64,
    /// Local status HTTP port
    pub status_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `OFFLINE_DB_PATH` - Database file (default: offline_cache.db)
    /// - `API_BASE_URL` - Backend base URL (default: http://localhost:3000)
    /// - `IMAGE_CACHE_MAX_BYTES` - Image cache ceiling (default: 50 MiB)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 3600)
    /// - `CONNECTIVITY_INTERVAL` - Probe frequency in seconds (default: 30)
    /// - `PROBE_TIMEOUT_MS` - Probe timeout (default: 5000)
    /// - `FETCH_TIMEOUT_MS` - Fetch timeout (default: 10000)
    /// - `PENDING_MAX_AGE_DAYS` - Outbox retention (default: 30)
    /// - `STATUS_PORT` - Status HTTP port (default: 3100)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_path: env::var("OFFLINE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            image_cache_max_bytes: parse_env("IMAGE_CACHE_MAX_BYTES")
                .unwrap_or(defaults.image_cache_max_bytes),
            sweep_interval: parse_env("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            connectivity_interval: parse_env("CONNECTIVITY_INTERVAL")
                .unwrap_or(defaults.connectivity_interval),
            probe_timeout_ms: parse_env("PROBE_TIMEOUT_MS").unwrap_or(defaults.probe_timeout_ms),
            fetch_timeout_ms: parse_env("FETCH_TIMEOUT_MS").unwrap_or(defaults.fetch_timeout_ms),
            pending_max_age_days: parse_env("PENDING_MAX_AGE_DAYS")
                .unwrap_or(defaults.pending_max_age_days),
            status_port: parse_env("STATUS_PORT").unwrap_or(defaults.status_port),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("offline_cache.db"),
            api_base_url: "http://localhost:3000".to_string(),
            image_cache_max_bytes: DEFAULT_IMAGE_CACHE_MAX_BYTES,
            sweep_interval: 3600,
            connectivity_interval: 30,
            probe_timeout_ms: 5_000,
            fetch_timeout_ms: 10_000,
            pending_max_age_days: 30,
            status_port: 3100,
        }
    }
}
