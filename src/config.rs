//! TOML configuration.
//!
//! A layered model with defaults for every key: an explicit path wins, then
//! the `TOWERSCOPE_CONFIG` environment variable, then `./towerscope.toml`,
//! then compiled-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::hexgrid::DEFAULT_RESOLUTION;
use crate::detect::DEFAULT_Z_THRESHOLD;

pub const CONFIG_ENV: &str = "TOWERSCOPE_CONFIG";
pub const LOCAL_CONFIG: &str = "towerscope.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration in precedence order.
    ///
    /// An explicit path that fails to load is an error; the implicit
    /// locations fall through to the next layer with a warning.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "{} set but file could not be loaded, trying fallback", CONFIG_ENV
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// Warehouse
// ---------------------------------------------------------------------------

/// Where tower and ticket records are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// SQLite mirror of the warehouse tables.
    pub database_path: PathBuf,
    /// Tickets older than this many days are ignored.
    pub lookback_days: u32,
    /// Skip the warehouse entirely and serve sample data.
    pub sample_only: bool,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/towerscope.db"),
            lookback_days: 90,
            sample_only: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Defaults for the analytics helpers when a caller does not override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub anomaly_threshold: f64,
    pub forecast_window: usize,
    pub forecast_horizon: usize,
    /// Trailing points compared against the forecast in the summary.
    pub recent_days: usize,
    pub hex_resolution: u8,
    pub top_n: usize,
    pub moving_average_window: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: DEFAULT_Z_THRESHOLD,
            forecast_window: 30,
            forecast_horizon: 7,
            recent_days: 7,
            hex_resolution: DEFAULT_RESOLUTION,
            top_n: 10,
            moving_average_window: 7,
        }
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a fetched dataset stays fresh. Zero disables caching.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.analytics.anomaly_threshold, 3.0);
        assert_eq!(cfg.analytics.forecast_window, 30);
        assert_eq!(cfg.analytics.hex_resolution, 7);
        assert_eq!(cfg.cache.ttl_secs, 300);
        assert!(!cfg.warehouse.sample_only);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[analytics]\nanomaly_threshold = 2.0\n\n[warehouse]\nsample_only = true\n"
        )
        .unwrap();

        let cfg = Config::resolve(Some(file.path())).unwrap();
        assert_eq!(cfg.analytics.anomaly_threshold, 2.0);
        assert_eq!(cfg.analytics.forecast_horizon, 7);
        assert!(cfg.warehouse.sample_only);
        assert_eq!(cfg.api, ApiConfig::default());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        assert!(Config::resolve(Some(Path::new("/nonexistent/towerscope.toml"))).is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
