//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::dialect::Dialect;
use crate::engine::DEFAULT_MAX_CONCURRENT_QUERIES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub datasource: DataSourceInfo,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings of one datasource
///
/// The bundled SQLite driver reads `url` and `json_data.max_open_conns`.
/// `database`, `user`, `password` and the remaining `json_data` settings are
/// carried unchanged for drivers supplied through [`crate::db::DbConnection`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSourceInfo {
    #[serde(default)]
    pub dialect: Dialect,

    /// Driver URL; for SQLite a file path or `:memory:`
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub user: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    #[serde(default)]
    pub json_data: JsonData,
}

/// Pool tuning and dialect settings
///
/// `timescaledb` selects the Postgres grouping SQL. Idle connections, lifetime,
/// time zone, TLS and `time_interval` are settings for external drivers and
/// the caller computing `$__interval`; the engine only passes them along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonData {
    #[serde(default = "default_max_open_conns")]
    pub max_open_conns: usize,

    #[serde(default = "default_max_idle_conns")]
    pub max_idle_conns: usize,

    #[serde(default = "default_conn_max_lifetime")]
    pub conn_max_lifetime_secs: u64,

    /// Session time zone (MySQL `time_zone`, Postgres `TimeZone`)
    #[serde(default)]
    pub timezone: Option<String>,

    /// Use TimescaleDB `time_bucket` for Postgres grouping
    #[serde(default)]
    pub timescaledb: bool,

    /// Minimum interval suggested for `$__interval`
    #[serde(default)]
    pub time_interval: Option<String>,

    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,

    #[serde(default)]
    pub encrypt: Option<String>,

    #[serde(default)]
    pub tls_skip_verify: bool,
}

fn default_max_open_conns() -> usize {
    100
}

fn default_max_idle_conns() -> usize {
    100
}

fn default_conn_max_lifetime() -> u64 {
    14400 // 4 hours
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

impl Default for JsonData {
    fn default() -> Self {
        Self {
            max_open_conns: default_max_open_conns(),
            max_idle_conns: default_max_idle_conns(),
            conn_max_lifetime_secs: default_conn_max_lifetime(),
            timezone: None,
            timescaledb: false,
            time_interval: None,
            ssl_mode: default_ssl_mode(),
            encrypt: None,
            tls_skip_verify: false,
        }
    }
}

/// Query engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum rows read per query, 0 for no limit
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,

    #[serde(default = "default_user_error")]
    pub user_facing_default_error: String,

    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,
}

fn default_row_limit() -> usize {
    1_000_000
}

fn default_user_error() -> String {
    "please inspect the server logs for the detailed error message".to_string()
}

fn default_max_concurrent_queries() -> usize {
    DEFAULT_MAX_CONCURRENT_QUERIES
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            row_limit: default_row_limit(),
            user_facing_default_error: default_user_error(),
            max_concurrent_queries: default_max_concurrent_queries(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("sqleng").join("config.toml")),
            Some(PathBuf::from("/etc/sqleng/config.toml")),
            Some(PathBuf::from("./sqleng.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Datasource overrides
        if let Some(dialect) = var("SQLENG_DIALECT") {
            match dialect.parse() {
                Ok(d) => self.datasource.dialect = d,
                Err(e) => tracing::warn!("Ignoring SQLENG_DIALECT: {}", e),
            }
        }
        if let Some(url) = var("SQLENG_URL") {
            self.datasource.url = url;
        }
        if let Some(user) = var("SQLENG_USER") {
            self.datasource.user = user;
        }
        if let Some(password) = var("SQLENG_PASSWORD") {
            self.datasource.password = password;
        }
        if let Some(conns) = var("SQLENG_MAX_OPEN_CONNS") {
            if let Ok(n) = conns.parse() {
                self.datasource.json_data.max_open_conns = n;
            }
        }

        // Engine overrides
        if let Some(limit) = var("SQLENG_ROW_LIMIT") {
            if let Ok(n) = limit.parse() {
                self.engine.row_limit = n;
            }
        }
        if let Some(max) = var("SQLENG_MAX_CONCURRENT_QUERIES") {
            if let Ok(n) = max.parse() {
                self.engine.max_concurrent_queries = n;
            }
        }

        // Logging overrides
        if let Some(level) = var("SQLENG_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("SQLENG_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# sqleng Configuration
#
# Environment variables override these settings:
# - SQLENG_DIALECT
# - SQLENG_URL
# - SQLENG_USER
# - SQLENG_PASSWORD
# - SQLENG_MAX_OPEN_CONNS
# - SQLENG_ROW_LIMIT
# - SQLENG_MAX_CONCURRENT_QUERIES
# - SQLENG_LOG_LEVEL
# - SQLENG_LOG_FORMAT

[datasource]
# SQL dialect: mysql, postgres or sqlite
dialect = "sqlite"

# Database URL (for sqlite: a file path or ":memory:")
url = ":memory:"

database = ""
user = ""

[datasource.json_data]
# Connection pool sizing
max_open_conns = 100
max_idle_conns = 100

# Maximum connection lifetime (seconds)
conn_max_lifetime_secs = 14400

# Use TimescaleDB time_bucket() for $__timeGroup (postgres only)
timescaledb = false

# TLS mode: disable, require, verify-ca, verify-full
ssl_mode = "disable"
tls_skip_verify = false

[engine]
# Maximum rows returned per query (0 = unlimited)
row_limit = 1000000

# Message shown to users in place of internal errors
user_facing_default_error = "please inspect the server logs for the detailed error message"

# Queries of one request running at the same time
max_concurrent_queries = 10

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.datasource.dialect, Dialect::Sqlite);
        assert_eq!(config.datasource.url, ":memory:");
        assert_eq!(config.datasource.json_data, JsonData::default());
        assert_eq!(config.engine.row_limit, 1_000_000);
        assert_eq!(config.engine.max_concurrent_queries, DEFAULT_MAX_CONCURRENT_QUERIES);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[datasource]\ndialect = \"postgres\"\nurl = \"postgres://db/metrics\"\n\n\
             [datasource.json_data]\ntimescaledb = true\n\n[engine]\nrow_limit = 500"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.datasource.dialect, Dialect::Postgres);
        assert!(config.datasource.json_data.timescaledb);
        assert_eq!(config.datasource.json_data.max_open_conns, 100);
        assert_eq!(config.engine.row_limit, 500);
        assert_eq!(config.engine.user_facing_default_error, default_user_error());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[datasource\nurl = 1").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SQLENG_DIALECT", "mysql"),
            ("SQLENG_URL", "tcp(localhost:3306)/metrics"),
            ("SQLENG_ROW_LIMIT", "42"),
            ("SQLENG_MAX_CONCURRENT_QUERIES", "not a number"),
            ("SQLENG_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.datasource.dialect, Dialect::MySql);
        assert_eq!(config.datasource.url, "tcp(localhost:3306)/metrics");
        assert_eq!(config.engine.row_limit, 42);
        assert_eq!(config.engine.max_concurrent_queries, DEFAULT_MAX_CONCURRENT_QUERIES);
        assert_eq!(config.logging.format, "json");
    }
}
