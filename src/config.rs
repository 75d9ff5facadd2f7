//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::EngineSettings;
use crate::error::{CacheError, Result};
use crate::options::{CacheOptions, Proposed};
use crate::refresh::RefreshTargets;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweep interval in milliseconds, 0 disables the sweep
    pub sweep_interval_ms: u64,
    /// Bound on a waiting get and on one refresh invocation, in milliseconds
    pub refresh_timeout_ms: u64,
    /// Raw static start list, `name[:validity_ms[:evict_ms]]` comma separated
    pub caches: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL_MS` - Expiry sweep frequency (default: 1000, 0 = off)
    /// - `REFRESH_TIMEOUT_MS` - Refresh wait bound (default: 5000)
    /// - `CACHES` - Instances to start at boot (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            sweep_interval_ms: env::var("SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval_ms),
            refresh_timeout_ms: env::var("REFRESH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.refresh_timeout_ms),
            caches: env::var("CACHES").unwrap_or(defaults.caches),
        }
    }

    /// Engine settings derived from this configuration.
    pub fn engine_settings(&self, targets: Arc<RefreshTargets>) -> EngineSettings {
        EngineSettings {
            refresh_timeout: Duration::from_millis(self.refresh_timeout_ms),
            sweep_interval: (self.sweep_interval_ms > 0)
                .then(|| Duration::from_millis(self.sweep_interval_ms)),
            targets,
        }
    }

    /// The static `(name, options)` start list.
    pub fn static_caches(&self) -> Result<Vec<(String, CacheOptions)>> {
        parse_caches(&self.caches)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            sweep_interval_ms: 1000,
            refresh_timeout_ms: 5000,
            caches: String::new(),
        }
    }
}

// == Start List Parsing ==
/// Parses `name[:validity_ms[:evict_ms]]` entries separated by commas.
///
/// Only the shape is checked here. The values, including ones that are not
/// numbers at all, go through the same validation as any runtime
/// `start_cache`.
pub fn parse_caches(list: &str) -> Result<Vec<(String, CacheOptions)>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_cache)
        .collect()
}

fn parse_cache(entry: &str) -> Result<(String, CacheOptions)> {
    let mut parts = entry.split(':').map(str::trim);
    let name = parts.next().unwrap_or_default().to_string();
    if name.is_empty() {
        return Err(CacheError::InvalidCacheName(entry.to_string()));
    }

    let mut options = CacheOptions::new();
    if let Some(validity) = parts.next() {
        options.validity = Some(parse_ms(validity));
    }
    if let Some(evict) = parts.next() {
        options.evict = Some(parse_ms(evict));
    }
    if parts.next().is_some() {
        return Err(CacheError::InvalidCacheName(entry.to_string()));
    }
    Ok((name, options))
}

fn parse_ms(raw: &str) -> Proposed<i64> {
    raw.parse().map_or(Proposed::Malformed, Proposed::Value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.sweep_interval_ms, 1000);
        assert_eq!(config.refresh_timeout_ms, 5000);
        assert!(config.caches.is_empty());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SERVER_PORT");
        env::remove_var("SWEEP_INTERVAL_MS");
        env::remove_var("REFRESH_TIMEOUT_MS");
        env::remove_var("CACHES");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.sweep_interval_ms, 1000);
        assert_eq!(config.refresh_timeout_ms, 5000);
        assert!(config.static_caches().unwrap().is_empty());
    }

    #[test]
    fn test_engine_settings_disable_sweep() {
        let config = Config {
            sweep_interval_ms: 0,
            ..Config::default()
        };
        let settings = config.engine_settings(Arc::new(RefreshTargets::new()));
        assert!(settings.sweep_interval.is_none());
        assert_eq!(settings.refresh_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_caches() {
        let caches = parse_caches("users:60000:1000, sessions:500 ,plain").unwrap();
        assert_eq!(caches.len(), 3);

        assert_eq!(caches[0].0, "users");
        assert_eq!(caches[0].1.validity, Some(Proposed::Value(60_000)));
        assert_eq!(caches[0].1.evict, Some(Proposed::Value(1_000)));

        assert_eq!(caches[1].0, "sessions");
        assert_eq!(caches[1].1.validity, Some(Proposed::Value(500)));
        assert_eq!(caches[1].1.evict, None);

        assert_eq!(caches[2].0, "plain");
        assert_eq!(caches[2].1.validity, None);
    }

    #[test]
    fn test_parse_caches_bad_number_is_malformed() {
        let caches = parse_caches("users:soon,sessions:10:later").unwrap();
        assert_eq!(caches[0].1.validity, Some(Proposed::Malformed));
        assert_eq!(caches[1].1.validity, Some(Proposed::Value(10)));
        assert_eq!(caches[1].1.evict, Some(Proposed::Malformed));
    }

    #[test]
    fn test_parse_caches_bad_shape() {
        assert!(matches!(
            parse_caches(":10"),
            Err(CacheError::InvalidCacheName(_))
        ));
        assert!(matches!(
            parse_caches("users:1:2:3"),
            Err(CacheError::InvalidCacheName(_))
        ));
    }

    #[test]
    fn test_negative_values_pass_through_to_validation() {
        let caches = parse_caches("users:-1").unwrap();
        assert_eq!(caches[0].1.validity, Some(Proposed::Value(-1)));
    }
}
