//! # sqleng
//!
//! Generic SQL datasource engine: dialect-aware macro interpolation,
//! concurrent query execution against a pooled connection, and a
//! relational-to-timeseries pipeline producing columnar frames.
//!
//! ## Features
//!
//! - **Macros**: `$__timeFilter`, `$__timeGroup`, `$__unixEpochFilter` and friends,
//!   per dialect (MySQL, PostgreSQL/TimescaleDB, SQLite)
//! - **Isolation**: every query of a batch succeeds or fails on its own
//! - **Time series**: float coercion, long → wide pivot, gap filling
//! - **Redaction**: internal driver errors are logged and replaced by a
//!   configured user-facing message
//!
//! ## Modules
//!
//! - [`macros`]: macro scanning, security gate, interval parsing
//! - [`dialect`]: per-dialect macro engines and result transformers
//! - [`db`]: connection and cursor traits, rusqlite-backed connection
//! - [`frame`]: columnar frames, long → wide, resampling
//! - [`engine`]: dispatcher, materializer, reshaper, health check
//! - [`query`]: request and response model
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqleng::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = SqliteConnection::open("metrics.db", 4)?;
//!     let config = Config::default();
//!     let handler = DataSourceHandler::for_dialect(
//!         Dialect::Sqlite,
//!         DataPluginConfiguration::from_config(&config),
//!         Arc::new(conn),
//!     );
//!
//!     let range = TimeRange::last(chrono::Duration::hours(6));
//!     let request = QueryDataRequest::new(vec![DataQuery::new(
//!         "A",
//!         "SELECT $__unixEpochGroupAlias(ts, 5m), avg(value) FROM cpu \
//!          WHERE $__unixEpochFilter(ts) GROUP BY 1 ORDER BY 1",
//!         range,
//!     )]);
//!
//!     let response = handler
//!         .query_data(&request, &tokio_util::sync::CancellationToken::new())
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod dialect;
pub mod engine;
pub mod frame;
pub mod macros;
pub mod query;

// Re-export top-level types for convenience
pub use config::{generate_default_config, Config, ConfigError, DataSourceInfo, JsonData, LoggingConfig};

pub use db::{ColumnInfo, DbConnection, DbError, DbResult, RowCursor, SqliteConnection, Value};

pub use dialect::Dialect;

pub use engine::{
    DataPluginConfiguration, DataSourceHandler, EngineError, EngineResult, HealthCheckResult,
    HealthStatus, Interpolator, QueryResultTransformer,
};

pub use frame::{Field, FieldType, FieldValues, FillMissing, FillMode, Frame, Notice};

pub use macros::{Interpolated, MacroEngine, MacroError, MacroResult};

pub use query::{
    DataQuery, DataResponse, ErrorSource, Format, QueryDataRequest, QueryDataResponse, TimeRange,
};
