//! Query engine
//!
//! - **handler**: `DataSourceHandler`, the batch dispatcher
//! - **interpolate**: global (dialect-independent) substitutions
//! - **materialize**: cursor → frame, column roles, row limit
//! - **timeseries**: rename, float coercion, long → wide, resampling
//! - **transformer**: dialect error classification and value converters
//! - **health**: connection health check
//! - **error**: error types
//!
//! # Example
//!
//! ```rust,no_run
//! use sqleng::db::SqliteConnection;
//! use sqleng::dialect::Dialect;
//! use sqleng::engine::{DataPluginConfiguration, DataSourceHandler};
//! use sqleng::query::{DataQuery, QueryDataRequest, TimeRange};
//! use sqleng::Config;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let conn = Arc::new(SqliteConnection::from_info(&config.datasource)?);
//! let handler = DataSourceHandler::for_dialect(
//!     Dialect::Sqlite,
//!     DataPluginConfiguration::from_config(&config),
//!     conn,
//! );
//!
//! let range = TimeRange::last(chrono::Duration::hours(1));
//! let request = QueryDataRequest::new(vec![DataQuery::new(
//!     "A",
//!     "SELECT $__timeGroupAlias(ts, '1m'), avg(v) FROM m WHERE $__timeFilter(ts) GROUP BY 1",
//!     range,
//! )]);
//! let response = handler.query_data(&request, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod health;
mod interpolate;
mod materialize;
mod timeseries;
mod transformer;

pub use error::{EngineError, EngineResult};
pub use handler::{DataPluginConfiguration, DataSourceHandler, DEFAULT_MAX_CONCURRENT_QUERIES};
pub use health::{HealthCheckResult, HealthStatus};
pub use interpolate::{GlobalInterpolator, Interpolator};
pub use materialize::{build_frame, epoch_precision_to_ms, parse_time_text, read_rows, QueryModel, RawRows};
pub use timeseries::reshape;
pub use transformer::{redact, text_to_float, text_to_time, Converter, QueryResultTransformer};
