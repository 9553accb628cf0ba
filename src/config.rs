//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables
//! or a JSON document.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// 50 MiB
pub const DEFAULT_MAX_MEMORY_SIZE: usize = 50 * 1024 * 1024;
/// 30 minutes
pub const DEFAULT_TTL_MS: u64 = 30 * 60 * 1000;
/// 5 minutes
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 5 * 60 * 1000;
pub const DEFAULT_MAX_ENTRIES: usize = 1000;
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;

/// Cache configuration parameters.
///
/// Field names follow the camelCase option names used by the host service.
/// Unknown fields are ignored when deserializing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Maximum aggregate size of all entries in bytes
    pub max_memory_size: usize,
    /// Default TTL in milliseconds, 0 = entries never expire
    #[serde(rename = "defaultTTL")]
    pub default_ttl: u64,
    /// Background cleanup interval in milliseconds
    pub cleanup_interval: u64,
    /// Whether large values are compressed
    pub compression: bool,
    /// Serialized size in bytes at which compression kicks in
    pub compression_threshold: usize,
    /// Whether hit/miss counters are recorded
    pub enable_statistics: bool,
    /// Optional directory for best-effort snapshots
    pub persistent_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_MAX_MEMORY_SIZE` - Memory budget in bytes (default: 50 MiB)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in milliseconds (default: 30 minutes)
    /// - `CACHE_CLEANUP_INTERVAL` - Cleanup frequency in milliseconds (default: 5 minutes)
    /// - `CACHE_COMPRESSION` - Enable compression (default: true)
    /// - `CACHE_COMPRESSION_THRESHOLD` - Compression threshold in bytes (default: 1024)
    /// - `CACHE_ENABLE_STATISTICS` - Record statistics (default: true)
    /// - `CACHE_PERSISTENT_PATH` - Snapshot directory (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("CACHE_MAX_ENTRIES", defaults.max_entries),
            max_memory_size: env_or("CACHE_MAX_MEMORY_SIZE", defaults.max_memory_size),
            default_ttl: env_or("CACHE_DEFAULT_TTL", defaults.default_ttl),
            cleanup_interval: env_or("CACHE_CLEANUP_INTERVAL", defaults.cleanup_interval),
            compression: env_or("CACHE_COMPRESSION", defaults.compression),
            compression_threshold: env_or(
                "CACHE_COMPRESSION_THRESHOLD",
                defaults.compression_threshold,
            ),
            enable_statistics: env_or("CACHE_ENABLE_STATISTICS", defaults.enable_statistics),
            persistent_path: env::var("CACHE_PERSISTENT_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Parses a JSON configuration document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CacheError::Initialization(format!("invalid cache config: {}", e)))
    }

    /// Default TTL as a duration, `None` when entries never expire.
    pub fn default_ttl_duration(&self) -> Option<Duration> {
        (self.default_ttl > 0).then(|| Duration::from_millis(self.default_ttl))
    }

    pub fn cleanup_period(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_memory_size: DEFAULT_MAX_MEMORY_SIZE,
            default_ttl: DEFAULT_TTL_MS,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL_MS,
            compression: true,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            enable_statistics: true,
            persistent_path: None,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.max_memory_size, 50 * 1024 * 1024);
        assert_eq!(config.default_ttl, 30 * 60 * 1000);
        assert_eq!(config.cleanup_interval, 5 * 60 * 1000);
        assert!(config.compression);
        assert!(config.persistent_path.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "CACHE_MAX_ENTRIES",
            "CACHE_MAX_MEMORY_SIZE",
            "CACHE_DEFAULT_TTL",
            "CACHE_CLEANUP_INTERVAL",
            "CACHE_COMPRESSION",
            "CACHE_COMPRESSION_THRESHOLD",
            "CACHE_ENABLE_STATISTICS",
            "CACHE_PERSISTENT_PATH",
        ] {
            env::remove_var(name);
        }

        assert_eq!(Config::from_env(), Config::default());
    }

    #[test]
    fn test_config_from_json_ignores_unknown_fields() {
        let config = Config::from_json(
            r#"{"maxMemorySize": 1024, "defaultTTL": 0, "compression": false, "colour": "blue"}"#,
        )
        .unwrap();

        assert_eq!(config.max_memory_size, 1024);
        assert_eq!(config.default_ttl, 0);
        assert!(!config.compression);
        assert_eq!(config.max_entries, DEFAULT_MAX_ENTRIES);
        assert_eq!(config.cleanup_interval, DEFAULT_CLEANUP_INTERVAL_MS);
    }

    #[test]
    fn test_config_from_json_invalid() {
        let result = Config::from_json(r#"{"maxEntries": "lots"}"#);
        assert!(matches!(result, Err(CacheError::Initialization(_))));
    }

    #[test]
    fn test_zero_ttl_means_no_expiry() {
        let config = Config {
            default_ttl: 0,
            ..Config::default()
        };
        assert_eq!(config.default_ttl_duration(), None);
        assert_eq!(
            Config::default().default_ttl_duration(),
            Some(Duration::from_millis(DEFAULT_TTL_MS))
        );
    }
}
