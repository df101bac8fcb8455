//! SQL dialects
//!
//! Each dialect bundles what the engine needs to know about one database family:
//!
//! - a [`MacroEngine`] rewriting `$__` macros into native SQL
//! - a [`QueryResultTransformer`] classifying driver errors and converting values
//! - default time-column names and string-like (metric) column types
//!
//! # Dialects
//!
//! | Dialect  | Time literal            | Bucketing                          |
//! |----------|-------------------------|------------------------------------|
//! | mysql    | `FROM_UNIXTIME(s)`      | `UNIX_TIMESTAMP(c) DIV s * s`      |
//! | postgres | `'rfc3339'`             | `floor(extract(epoch from c)/s)*s` |
//! | sqlite   | `datetime(s, 'unixepoch')` | `(strftime('%s', c) / s) * s`   |

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::{MySqlMacroEngine, MySqlTransformer};
pub use postgres::{PostgresMacroEngine, PostgresTransformer};
pub use sqlite::{SqliteMacroEngine, SqliteTransformer};

use crate::config::JsonData;
use crate::engine::QueryResultTransformer;
use crate::macros::MacroEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Supported database families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Postgres,
    #[default]
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Build the dialect's macro engine
    pub fn macro_engine(&self, json_data: &JsonData, user_error: &str) -> Arc<dyn MacroEngine> {
        match self {
            Dialect::MySql => Arc::new(MySqlMacroEngine::new(user_error)),
            Dialect::Postgres => Arc::new(PostgresMacroEngine::new(user_error, json_data.timescaledb)),
            Dialect::Sqlite => Arc::new(SqliteMacroEngine::new(user_error)),
        }
    }

    /// Build the dialect's result transformer
    pub fn transformer(&self) -> Arc<dyn QueryResultTransformer> {
        match self {
            Dialect::MySql => Arc::new(MySqlTransformer),
            Dialect::Postgres => Arc::new(PostgresTransformer),
            Dialect::Sqlite => Arc::new(SqliteTransformer),
        }
    }

    /// Column names treated as the time column
    pub fn time_column_names(&self) -> Vec<String> {
        let names: &[&str] = match self {
            Dialect::MySql | Dialect::Sqlite => &["time", "time_sec"],
            Dialect::Postgres => &["time"],
        };
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Declared types whose columns may serve as the metric column
    pub fn metric_column_types(&self) -> Vec<String> {
        let types: &[&str] = match self {
            Dialect::MySql => &["CHAR", "VARCHAR", "TINYTEXT", "TEXT", "MEDIUMTEXT", "LONGTEXT"],
            Dialect::Postgres => &["UNKNOWN", "TEXT", "VARCHAR", "CHAR"],
            Dialect::Sqlite => &["TEXT", "VARCHAR", "CHAR"],
        };
        types.iter().map(|s| s.to_string()).collect()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(format!("unknown dialect: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("MySQL".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert_eq!("postgresql".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_dialect_defaults() {
        assert_eq!(Dialect::Postgres.time_column_names(), vec!["time"]);
        assert!(Dialect::MySql.metric_column_types().contains(&"LONGTEXT".to_string()));
        assert_eq!(Dialect::Sqlite.macro_engine(&JsonData::default(), "x").dialect(), "sqlite");
    }
}
