//! # Application Configuration
//!
//! Process-level configuration: where the database lives and how logging
//! is filtered. Shop behaviour (tax module, currency, ...) lives in the
//! settings registry instead, so operators can change it at runtime.
//!
//! ## Load Order (later overrides earlier)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Defaults                                                            │
//! │  2. satchmo.toml   (explicit path, else the platform config dir)       │
//! │  3. Environment    SATCHMO_DB_PATH, SATCHMO_DB_MAX_CONNECTIONS,        │
//! │                    SATCHMO_DB_MIN_CONNECTIONS, SATCHMO_LOG             │
//! │  4. validate()                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example `satchmo.toml`
//! ```toml
//! [database]
//! path = "/var/lib/satchmo/satchmo.db"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//!
//! [logging]
//! filter = "info,satchmo=debug,sqlx=warn"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

/// Default `RUST_LOG`-style filter.
pub const DEFAULT_LOG_FILTER: &str = "info,satchmo=debug,sqlx=warn";

const CONFIG_FILE_NAME: &str = "satchmo.toml";
const DATABASE_FILE_NAME: &str = "satchmo.db";

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    pub path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 30,
            run_migrations: true,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` wins over it.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading app config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns the default if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load app config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a config file without applying overrides.
    pub fn from_file(path: &Path) -> DbResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file, creating the parent directory.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::AppConfig("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "App config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::AppConfig("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::AppConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(DbError::AppConfig(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(DbError::AppConfig("logging.filter must not be empty".into()));
        }

        Ok(())
    }

    /// Applies `SATCHMO_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = var("SATCHMO_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("SATCHMO_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid SATCHMO_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(min) = var("SATCHMO_DB_MIN_CONNECTIONS") {
            match min.parse::<u32>() {
                Ok(n) => self.database.min_connections = n,
                Err(_) => warn!(value = %min, "Ignoring invalid SATCHMO_DB_MIN_CONNECTIONS"),
            }
        }

        if let Some(filter) = var("SATCHMO_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Pool configuration for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> DbConfig {
        let db = &self.database;
        let config = if db.path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&db.path)
                .max_connections(db.max_connections)
                .min_connections(db.min_connections)
        };
        config
            .connect_timeout(Duration::from_secs(db.connect_timeout_secs))
            .run_migrations(db.run_migrations)
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "satchmo", "satchmo")
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.database.path.ends_with(DATABASE_FILE_NAME));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();

        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 2;
        config.database.min_connections = 3;
        assert!(config.validate().is_err());

        config.database.min_connections = 1;
        config.database.path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SATCHMO_DB_PATH", "/tmp/shop.db"),
            ("SATCHMO_DB_MAX_CONNECTIONS", "9"),
            ("SATCHMO_DB_MIN_CONNECTIONS", "many"),
            ("SATCHMO_LOG", "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.database.max_connections, 9);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            path = ":memory:"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.db_config().is_in_memory());
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[logging]"));
    }
}
