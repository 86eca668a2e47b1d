//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PHARMSTOCK_DATABASE_PATH=/var/lib/pharmstock/pharmstock.db         │
//! │     PHARMSTOCK_DEFAULT_MARKUP_BPS=2500                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pharmstock/pharmstock.toml (Linux)                       │
//! │     ~/Library/Application Support/com.pharmstock.pharmstock/... (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/pharmstock/pharmstock.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [inventory]
//! default_markup_bps = 3000  # 30% over unit cost
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;
use pharmstock_core::DEFAULT_MARKUP_BPS;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long a writer waits for the SQLite write lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "pharmstock", "pharmstock")
        .map(|dirs| dirs.data_dir().join("pharmstock.db"))
        .unwrap_or_else(|| PathBuf::from("./pharmstock.db"))
}

fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_busy_timeout() -> u64 {
    5000
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            busy_timeout_ms: default_busy_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: true,
        }
    }
}

/// `[inventory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Markup over unit cost for batches received without a selling price.
    #[serde(default = "default_markup")]
    pub default_markup_bps: u32,
}

fn default_markup() -> u32 {
    DEFAULT_MARKUP_BPS
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            default_markup_bps: default_markup(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub inventory: InventorySettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`pharmstock.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections must not exceed max_connections".into(),
            ));
        }

        if self.inventory.default_markup_bps > 100_000 {
            return Err(ConfigError::Invalid(
                "inventory.default_markup_bps must be at most 100000 (1000%)".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("PHARMSTOCK_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("PHARMSTOCK_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid PHARMSTOCK_MAX_CONNECTIONS"),
            }
        }

        if let Some(ms) = lookup("PHARMSTOCK_BUSY_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring invalid PHARMSTOCK_BUSY_TIMEOUT_MS"),
            }
        }

        if let Some(bps) = lookup("PHARMSTOCK_DEFAULT_MARKUP_BPS") {
            match bps.parse::<u32>() {
                Ok(n) => {
                    debug!(markup_bps = n, "Overriding default markup from environment");
                    self.inventory.default_markup_bps = n;
                }
                Err(_) => warn!(value = %bps, "Ignoring invalid PHARMSTOCK_DEFAULT_MARKUP_BPS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "pharmstock", "pharmstock")
            .map(|dirs| dirs.config_dir().join("pharmstock.toml"))
    }

    /// Builds the pool configuration.
    pub fn db_config(&self) -> DbConfig {
        let db = &self.database;
        DbConfig::new(db.path.clone())
            .max_connections(db.max_connections)
            .min_connections(db.min_connections)
            .connect_timeout(Duration::from_secs(db.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(db.busy_timeout_ms))
            .idle_timeout(Duration::from_secs(db.idle_timeout_secs))
            .run_migrations(db.run_migrations)
            .default_markup_bps(self.inventory.default_markup_bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.inventory.default_markup_bps, DEFAULT_MARKUP_BPS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/pharmstock-test.db"

            [inventory]
            default_markup_bps = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/pharmstock-test.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.inventory.default_markup_bps, 2500);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config: AppConfig = toml::from_str(
            r#"
            [inventory]
            default_markup_bps = 2500
            "#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            ("PHARMSTOCK_DEFAULT_MARKUP_BPS", "4000"),
            ("PHARMSTOCK_MAX_CONNECTIONS", "not-a-number"),
            ("PHARMSTOCK_DATABASE_PATH", "/data/ps.db"),
        ]);
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.inventory.default_markup_bps, 4000);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.path, PathBuf::from("/data/ps.db"));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 2;
        config.database.min_connections = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let path = std::env::temp_dir().join(format!("pharmstock-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[database]\nbusy_timeout_ms = 250\n").unwrap();

        let config = AppConfig::load(Some(path.clone())).unwrap();
        assert_eq!(config.database.busy_timeout_ms, 250);

        let db_config = config.db_config();
        assert_eq!(db_config.busy_timeout, Duration::from_millis(250));

        std::fs::remove_file(path).ok();
    }
}
