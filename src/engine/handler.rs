//! Query dispatcher
//!
//! # Architecture
//!
//! ```text
//!                QueryDataRequest
//!                       │ validate every query body
//!                       ▼
//!   ┌──────────── JoinSet (Semaphore: max_concurrent_queries) ────────────┐
//!   │ task per RefID:                                                     │
//!   │   global interpolation → dialect macros → DbConnection::query       │
//!   │   → read_rows → build_frame → reshape (time_series)                 │
//!   │ panics caught at the task boundary, cancellation via token          │
//!   └─────────────────────────────────────────────────────────────────────┘
//!                       ▼
//!               QueryDataResponse { RefID → DataResponse }
//! ```
//!
//! Each query fails on its own: an error becomes that RefID's response and
//! never aborts the rest of the batch.

use super::error::{EngineError, EngineResult};
use super::interpolate::{GlobalInterpolator, Interpolator};
use super::materialize::{build_frame, read_rows, QueryModel};
use super::timeseries::reshape;
use super::transformer::{Converter, QueryResultTransformer};
use crate::config::{Config, DataSourceInfo};
use crate::db::{DbConnection, DbError};
use crate::dialect::Dialect;
use crate::frame::Frame;
use crate::macros::MacroEngine;
use crate::query::{DataQuery, DataResponse, Format, QueryDataRequest, QueryDataResponse, QueryJson};
use futures_util::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Default number of queries of one batch running at the same time
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 10;

/// Per-datasource engine settings
#[derive(Debug, Clone)]
pub struct DataPluginConfiguration {
    pub ds_info: DataSourceInfo,
    /// Column names treated as the time column
    pub time_column_names: Vec<String>,
    /// Declared types eligible as the metric column
    pub metric_column_types: Vec<String>,
    /// Maximum rows read per query, 0 for no limit
    pub row_limit: usize,
    /// Shown to callers in place of internal failure details
    pub user_facing_default_error: String,
    pub max_concurrent_queries: usize,
}

impl DataPluginConfiguration {
    /// Settings for a datasource using its dialect's column defaults
    pub fn from_config(config: &Config) -> Self {
        let dialect = config.datasource.dialect;
        Self {
            ds_info: config.datasource.clone(),
            time_column_names: dialect.time_column_names(),
            metric_column_types: dialect.metric_column_types(),
            row_limit: config.engine.row_limit,
            user_facing_default_error: config.engine.user_facing_default_error.clone(),
            max_concurrent_queries: config.engine.max_concurrent_queries,
        }
    }
}

/// Serves query batches and health checks for one datasource
///
/// Cloning is cheap; clones share the connection and settings.
#[derive(Clone)]
pub struct DataSourceHandler {
    pub(super) inner: Arc<HandlerInner>,
}

#[derive(Clone)]
pub(super) struct HandlerInner {
    pub(super) config: DataPluginConfiguration,
    pub(super) connection: Arc<dyn DbConnection>,
    pub(super) macro_engine: Arc<dyn MacroEngine>,
    pub(super) transformer: Arc<dyn QueryResultTransformer>,
    pub(super) interpolator: Arc<dyn Interpolator>,
    pub(super) converters: Vec<Converter>,
}

impl DataSourceHandler {
    pub fn new(
        config: DataPluginConfiguration,
        connection: Arc<dyn DbConnection>,
        macro_engine: Arc<dyn MacroEngine>,
        transformer: Arc<dyn QueryResultTransformer>,
    ) -> Self {
        let converters = transformer.converters();
        tracing::info!(
            dialect = macro_engine.dialect(),
            row_limit = config.row_limit,
            max_concurrent_queries = config.max_concurrent_queries,
            "Created datasource handler"
        );
        Self {
            inner: Arc::new(HandlerInner {
                config,
                connection,
                macro_engine,
                transformer,
                interpolator: Arc::new(GlobalInterpolator),
                converters,
            }),
        }
    }

    /// Handler wired with the dialect's macro engine and transformer
    pub fn for_dialect(dialect: Dialect, config: DataPluginConfiguration, connection: Arc<dyn DbConnection>) -> Self {
        let macro_engine = dialect.macro_engine(&config.ds_info.json_data, &config.user_facing_default_error);
        Self::new(config, connection, macro_engine, dialect.transformer())
    }

    /// Builder method: replace the global interpolation hook
    pub fn with_interpolator(self, interpolator: Arc<dyn Interpolator>) -> Self {
        let mut inner = (*self.inner).clone();
        inner.interpolator = interpolator;
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &DataPluginConfiguration {
        &self.inner.config
    }

    pub fn connection(&self) -> &Arc<dyn DbConnection> {
        &self.inner.connection
    }

    /// Run every query of a batch concurrently
    ///
    /// Fails as a whole only when a query body cannot be decoded or carries
    /// fill parameters. Queries with empty SQL get no response entry.
    pub async fn query_data(&self, request: &QueryDataRequest, cancel: &CancellationToken) -> EngineResult<QueryDataResponse> {
        let mut jobs = Vec::with_capacity(request.queries.len());
        for query in &request.queries {
            let json = query
                .query_json()
                .map_err(|e| EngineError::InvalidQueryJson(e.to_string()))?;
            if json.has_fill_params() {
                return Err(EngineError::FillParamsNotSupported);
            }
            if json.raw_sql.is_empty() {
                tracing::debug!(ref_id = %query.ref_id, "Skipping query with empty SQL");
                continue;
            }
            jobs.push((query.clone(), json));
        }

        let semaphore = Arc::new(Semaphore::new(self.inner.config.max_concurrent_queries.max(1)));
        let mut tasks = JoinSet::new();
        let mut ref_ids = HashMap::with_capacity(jobs.len());

        for (query, json) in jobs {
            let handler = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let ref_id = query.ref_id.clone();
            let span = tracing::info_span!("sql_query", ref_id = %ref_id);

            let handle = tasks.spawn(
                async move {
                    let ref_id = query.ref_id.clone();
                    let _permit = semaphore.acquire_owned().await.ok();
                    let response = AssertUnwindSafe(handler.execute_query(query, json, cancel))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| handler.panic_response(payload));
                    (ref_id, response)
                }
                .instrument(span),
            );
            ref_ids.insert(handle.id(), ref_id);
        }

        let responses = self.collect_responses(tasks, ref_ids).await;
        Ok(QueryDataResponse { responses })
    }

    /// Wait for every task, giving a task that never returned an error response
    async fn collect_responses(
        &self,
        mut tasks: JoinSet<(String, DataResponse)>,
        mut ref_ids: HashMap<task::Id, String>,
    ) -> HashMap<String, DataResponse> {
        let mut responses = HashMap::with_capacity(ref_ids.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, (ref_id, response))) => {
                    ref_ids.remove(&id);
                    responses.insert(ref_id, response);
                }
                Err(e) => match ref_ids.remove(&e.id()) {
                    Some(ref_id) => {
                        tracing::error!(ref_id = %ref_id, error = %e, "Query task did not complete");
                        responses.insert(ref_id, self.join_error_response(e));
                    }
                    None => tracing::error!(error = %e, "Untracked query task did not complete"),
                },
            }
        }
        responses
    }

    async fn execute_query(&self, query: DataQuery, json: QueryJson, cancel: CancellationToken) -> DataResponse {
        let time_range = query.time_range;
        let sql = self.inner.interpolator.interpolate(&query, &time_range, &json.raw_sql);

        let interpolated = match self.inner.macro_engine.interpolate(&query, &time_range, &sql) {
            Ok(interpolated) => interpolated,
            Err(err) => return self.error_response(EngineError::from(err), &sql),
        };

        let mut model = QueryModel::new(json.format, time_range, interpolated.fill, interpolated.sql);
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(EngineError::Canceled),
            result = self.run(&mut model) => result,
        };

        match result {
            Ok(frame) => DataResponse::from_frame(frame),
            Err(err) => self.error_response(err, &model.interpolated_sql),
        }
    }

    async fn run(&self, model: &mut QueryModel) -> EngineResult<Frame> {
        let config = &self.inner.config;

        let mut cursor = self
            .inner
            .connection
            .query(&model.interpolated_sql)
            .await
            .map_err(|e| self.query_error(&e))?;

        model.classify(cursor.columns(), &config.time_column_names, &config.metric_column_types);

        let raw = read_rows(cursor.as_mut(), config.row_limit)
            .await
            .map_err(|e| self.query_error(&e))?;
        drop(cursor);

        let frame = build_frame(raw, model, &self.inner.converters, config.row_limit)?;
        if model.format == Format::TimeSeries && frame.rows() > 0 {
            return reshape(frame, model);
        }
        Ok(frame)
    }

    fn query_error(&self, err: &DbError) -> EngineError {
        EngineError::Query(
            self.inner
                .transformer
                .transform_query_error(err, &self.inner.config.user_facing_default_error),
        )
    }

    /// Error response carrying the SQL that was (or would have been) executed
    fn error_response(&self, err: EngineError, sql: &str) -> DataResponse {
        tracing::error!(error = %err, source = ?err.source(), "Query failed");
        let mut frame = Frame::new("", Vec::new());
        frame.set_executed_query(sql);
        DataResponse {
            frames: vec![frame],
            error: Some(err.to_string()),
            error_source: Some(err.source()),
        }
    }

    fn join_error_response(&self, err: JoinError) -> DataResponse {
        if err.is_panic() {
            return self.panic_response(err.into_panic());
        }
        let err = EngineError::TaskAborted;
        DataResponse {
            frames: Vec::new(),
            error: Some(err.to_string()),
            error_source: Some(err.source()),
        }
    }

    fn panic_response(&self, payload: Box<dyn Any + Send>) -> DataResponse {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| format!("unexpected error - {}", self.inner.config.user_facing_default_error));
        tracing::error!(panic = %message, "Query panicked");

        let err = EngineError::Panic(message);
        DataResponse {
            frames: Vec::new(),
            error: Some(err.to_string()),
            error_source: Some(err.source()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JsonData;
    use crate::db::{DbResult, RowCursor, SqliteConnection};
    use crate::frame::{FieldType, FieldValues, NoticeSeverity};
    use crate::query::{ErrorSource, TimeRange};
    use async_trait::async_trait;

    const SCHEMA: &str = "
        CREATE TABLE metrics (time INTEGER, host TEXT, value REAL);
        INSERT INTO metrics VALUES (1500000000, 'a', 1.0);
        INSERT INTO metrics VALUES (1500000000, 'b', 2.0);
        INSERT INTO metrics VALUES (1500000060, 'a', 3.0);
        INSERT INTO metrics VALUES (1500000060, 'b', 4.0);
    ";

    fn plugin_config(row_limit: usize) -> DataPluginConfiguration {
        DataPluginConfiguration {
            ds_info: DataSourceInfo::default(),
            time_column_names: Dialect::Sqlite.time_column_names(),
            metric_column_types: Dialect::Sqlite.metric_column_types(),
            row_limit,
            user_facing_default_error: "please contact your administrator".into(),
            max_concurrent_queries: 4,
        }
    }

    fn sqlite_handler(row_limit: usize) -> DataSourceHandler {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        DataSourceHandler::for_dialect(Dialect::Sqlite, plugin_config(row_limit), Arc::new(conn))
    }

    fn range() -> TimeRange {
        TimeRange::from_unix(1_500_000_000, 1_500_000_120)
    }

    fn request(queries: Vec<DataQuery>) -> QueryDataRequest {
        QueryDataRequest::new(queries)
    }

    async fn run(handler: &DataSourceHandler, queries: Vec<DataQuery>) -> QueryDataResponse {
        handler
            .query_data(&request(queries), &CancellationToken::new())
            .await
            .unwrap()
    }

    /// Connection whose statements fail, hang or panic
    enum MockConnection {
        Fail(DbError),
        Hang,
        Panic,
    }

    #[async_trait]
    impl DbConnection for MockConnection {
        async fn query(&self, _sql: &str) -> DbResult<Box<dyn RowCursor>> {
            match self {
                MockConnection::Fail(err) => Err(err.clone()),
                MockConnection::Hang => std::future::pending().await,
                MockConnection::Panic => panic!("driver exploded"),
            }
        }

        async fn ping(&self) -> DbResult<()> {
            match self {
                MockConnection::Fail(err) => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }

    /// Connection that panics on `SELECT 1`, hangs on `SELECT 2` and hands
    /// everything else to SQLite
    struct ScriptedConnection(SqliteConnection);

    #[async_trait]
    impl DbConnection for ScriptedConnection {
        async fn query(&self, sql: &str) -> DbResult<Box<dyn RowCursor>> {
            match sql {
                "SELECT 1" => panic!("driver exploded"),
                "SELECT 2" => std::future::pending().await,
                other => self.0.query(other).await,
            }
        }

        async fn ping(&self) -> DbResult<()> {
            self.0.ping().await
        }
    }

    fn mock_handler(conn: MockConnection) -> DataSourceHandler {
        DataSourceHandler::for_dialect(Dialect::MySql, plugin_config(0), Arc::new(conn))
    }

    #[tokio::test]
    async fn test_long_to_wide_end_to_end() {
        let handler = sqlite_handler(0);
        let response = run(
            &handler,
            vec![DataQuery::new(
                "A",
                "SELECT time, host, value FROM metrics WHERE $__unixEpochFilter(time) ORDER BY time",
                range(),
            )],
        )
        .await;

        let data = response.get("A").unwrap();
        assert!(!data.is_error(), "{:?}", data.error);
        let frame = &data.frames[0];
        assert_eq!(frame.fields.len(), 3);
        assert_eq!(frame.fields[0].name, "Time");
        assert_eq!(frame.fields[0].field_type(), FieldType::Time);
        assert_eq!(frame.fields[1].name, "a");
        assert_eq!(frame.fields[1].values, FieldValues::Float64(vec![Some(1.0), Some(3.0)]));
        assert_eq!(frame.fields[2].name, "b");
        assert_eq!(frame.fields[2].values, FieldValues::Float64(vec![Some(2.0), Some(4.0)]));
        assert_eq!(
            frame.executed_query(),
            Some("SELECT time, host, value FROM metrics WHERE time >= 1500000000 AND time <= 1500000120 ORDER BY time")
        );
    }

    #[tokio::test]
    async fn test_table_format_keeps_columns() {
        let handler = sqlite_handler(0);
        let query = DataQuery::new("A", "SELECT host, value FROM metrics", range()).format(Format::Table);
        let response = run(&handler, vec![query]).await;

        let frame = &response.get("A").unwrap().frames[0];
        assert_eq!(frame.fields[0].name, "host");
        assert_eq!(frame.rows(), 4);
    }

    #[tokio::test]
    async fn test_fill_from_time_group() {
        let handler = sqlite_handler(0);
        let query = DataQuery::new(
            "A",
            "SELECT $__unixEpochGroupAlias(time, 30s, previous), sum(value) AS v \
             FROM metrics GROUP BY 1 ORDER BY 1",
            range(),
        );
        let response = run(&handler, vec![query]).await;

        let frame = &response.get("A").unwrap().frames[0];
        assert_eq!(frame.rows(), 5);
        assert_eq!(
            frame.fields[1].values,
            FieldValues::Float64(vec![Some(3.0), Some(3.0), Some(7.0), Some(7.0), Some(7.0)])
        );
    }

    #[tokio::test]
    async fn test_empty_sql_is_skipped() {
        let handler = sqlite_handler(0);
        let response = run(
            &handler,
            vec![
                DataQuery::new("A", "", range()),
                DataQuery::new("B", "SELECT value FROM metrics", range()).format(Format::Table),
            ],
        )
        .await;

        assert_eq!(response.len(), 1);
        assert!(response.get("B").is_some());
    }

    #[tokio::test]
    async fn test_fill_params_reject_batch() {
        let handler = sqlite_handler(0);
        let mut query = DataQuery::new("A", "SELECT 1", range());
        query.json["fill"] = serde_json::json!(true);

        let err = handler
            .query_data(&request(vec![query]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::FillParamsNotSupported);
        assert_eq!(err.to_string(), "query fill-parameters not supported");
    }

    #[tokio::test]
    async fn test_invalid_query_json_rejects_batch() {
        let handler = sqlite_handler(0);
        let mut query = DataQuery::new("A", "SELECT 1", range());
        query.json["format"] = serde_json::json!("pie_chart");

        let err = handler
            .query_data(&request(vec![query]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidQueryJson(_)));
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let handler = sqlite_handler(0);
        let response = run(
            &handler,
            vec![
                DataQuery::new("A", "SELECT $__nope(x)", range()),
                DataQuery::new("B", "SELECT * FROM missing_table", range()),
                DataQuery::new("C", "SELECT value FROM metrics", range()).format(Format::Table),
                DataQuery::new("D", "SELECT host FROM metrics", range()),
            ],
        )
        .await;

        let a = response.get("A").unwrap();
        assert_eq!(a.error.as_deref(), Some("unknown macro __nope"));
        assert_eq!(a.error_source, Some(ErrorSource::Plugin));

        let b = response.get("B").unwrap();
        assert_eq!(b.error.as_deref(), Some("no such table: missing_table"));
        assert_eq!(b.error_source, Some(ErrorSource::Downstream));
        assert_eq!(b.frames[0].executed_query(), Some("SELECT * FROM missing_table"));

        assert!(!response.get("C").unwrap().is_error());

        let d = response.get("D").unwrap();
        assert_eq!(d.error.as_deref(), Some("no time column found"));
        assert_eq!(d.error_source, Some(ErrorSource::Downstream));
    }

    #[tokio::test]
    async fn test_restricted_statement_never_executes() {
        let handler = mock_handler(MockConnection::Panic);
        let response = run(&handler, vec![DataQuery::new("A", "SELECT current_user()", range())]).await;

        let a = response.get("A").unwrap();
        assert_eq!(
            a.error.as_deref(),
            Some("invalid query - please contact your administrator")
        );
        assert_eq!(a.error_source, Some(ErrorSource::Plugin));
    }

    #[tokio::test]
    async fn test_driver_errors_are_redacted() {
        let handler = mock_handler(MockConnection::Fail(DbError::driver("1045", "Access denied for user 'x'")));
        let response = run(&handler, vec![DataQuery::new("A", "SELECT 1", range())]).await;
        assert_eq!(
            response.get("A").unwrap().error.as_deref(),
            Some("query failed - please contact your administrator")
        );

        let handler = mock_handler(MockConnection::Fail(DbError::driver("1054", "Unknown column 'y'")));
        let response = run(&handler, vec![DataQuery::new("A", "SELECT y", range())]).await;
        assert_eq!(response.get("A").unwrap().error.as_deref(), Some("Unknown column 'y'"));
    }

    #[tokio::test]
    async fn test_panic_becomes_error_response() {
        let handler = mock_handler(MockConnection::Panic);
        let response = run(&handler, vec![DataQuery::new("A", "SELECT 1", range())]).await;

        let a = response.get("A").unwrap();
        assert_eq!(a.error.as_deref(), Some("driver exploded"));
        assert_eq!(a.error_source, Some(ErrorSource::Plugin));
    }

    #[tokio::test]
    async fn test_cancellation() {
        let handler = mock_handler(MockConnection::Hang);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let response = handler
            .query_data(
                &request(vec![
                    DataQuery::new("A", "SELECT 1", range()),
                    DataQuery::new("B", "SELECT 2", range()),
                ]),
                &cancel,
            )
            .await
            .unwrap();

        for ref_id in ["A", "B"] {
            let data = response.get(ref_id).unwrap();
            assert_eq!(data.error.as_deref(), Some("query canceled"));
            assert_eq!(data.error_source, Some(ErrorSource::Downstream));
        }
    }

    #[tokio::test]
    async fn test_panicking_and_hanging_queries_leave_siblings_alone() {
        let sqlite = SqliteConnection::open_in_memory().unwrap();
        sqlite.execute_batch(SCHEMA).unwrap();
        let handler = DataSourceHandler::for_dialect(
            Dialect::Sqlite,
            plugin_config(0),
            Arc::new(ScriptedConnection(sqlite)),
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let batch = request(vec![
            DataQuery::new("A", "SELECT 1", range()),
            DataQuery::new("B", "SELECT 2", range()),
            DataQuery::new("C", "SELECT value FROM metrics", range()).format(Format::Table),
        ]);
        let response = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            handler.query_data(&batch, &cancel),
        )
        .await
        .expect("batch finished")
        .unwrap();

        assert_eq!(response.len(), 3);

        let a = response.get("A").unwrap();
        assert_eq!(a.error.as_deref(), Some("driver exploded"));
        assert_eq!(a.error_source, Some(ErrorSource::Plugin));

        let b = response.get("B").unwrap();
        assert_eq!(b.error.as_deref(), Some("query canceled"));
        assert_eq!(b.error_source, Some(ErrorSource::Downstream));

        let c = response.get("C").unwrap();
        assert!(!c.is_error(), "{:?}", c.error);
        assert_eq!(c.frames[0].rows(), 4);
    }

    #[tokio::test]
    async fn test_lost_tasks_still_get_a_response() {
        async fn lost() -> (String, DataResponse) {
            panic!("worker lost")
        }

        let handler = sqlite_handler(0);
        let mut tasks = JoinSet::new();
        let mut ref_ids = HashMap::new();

        let aborted = tasks.spawn(std::future::pending::<(String, DataResponse)>());
        aborted.abort();
        ref_ids.insert(aborted.id(), "A".to_string());

        let panicked = tasks.spawn(lost());
        ref_ids.insert(panicked.id(), "B".to_string());

        let finished = tasks.spawn(async { ("C".to_string(), DataResponse::from_frame(Frame::new("", Vec::new()))) });
        ref_ids.insert(finished.id(), "C".to_string());

        let responses = handler.collect_responses(tasks, ref_ids).await;
        assert_eq!(responses.len(), 3);

        let a = &responses["A"];
        assert_eq!(a.error.as_deref(), Some("query task aborted"));
        assert_eq!(a.error_source, Some(ErrorSource::Plugin));

        assert_eq!(responses["B"].error.as_deref(), Some("worker lost"));
        assert!(!responses["C"].is_error());
    }

    #[tokio::test]
    async fn test_zero_rows() {
        let handler = sqlite_handler(0);
        let response = run(
            &handler,
            vec![DataQuery::new("A", "SELECT time, host, value FROM metrics WHERE 1 = 0", range())],
        )
        .await;
        let frame = &response.get("A").unwrap().frames[0];
        assert_eq!(frame.fields.len(), 1);
        assert_eq!(frame.rows(), 0);
    }

    #[tokio::test]
    async fn test_row_limit_notice() {
        let handler = sqlite_handler(2);
        let query = DataQuery::new("A", "SELECT value FROM metrics", range()).format(Format::Table);
        let response = run(&handler, vec![query]).await;

        let frame = &response.get("A").unwrap().frames[0];
        assert_eq!(frame.rows(), 2);
        assert_eq!(frame.notices()[0].severity, NoticeSeverity::Warning);
    }

    #[tokio::test]
    async fn test_custom_interpolator() {
        struct Upper;
        impl Interpolator for Upper {
            fn interpolate(&self, _query: &DataQuery, _range: &TimeRange, sql: &str) -> String {
                sql.replace("$table", "metrics")
            }
        }

        let handler = sqlite_handler(0).with_interpolator(Arc::new(Upper));
        let query = DataQuery::new("A", "SELECT count(*) AS n FROM $table", range()).format(Format::Table);
        let response = run(&handler, vec![query]).await;
        assert_eq!(
            response.get("A").unwrap().frames[0].fields[0].values,
            FieldValues::Int64(vec![Some(4)])
        );
    }

    #[test]
    fn test_plugin_configuration_from_config() {
        let mut config = Config::default();
        config.datasource.dialect = Dialect::Postgres;
        config.datasource.json_data = JsonData {
            timescaledb: true,
            ..JsonData::default()
        };
        let plugin = DataPluginConfiguration::from_config(&config);
        assert_eq!(plugin.time_column_names, vec!["time"]);
        assert_eq!(plugin.row_limit, config.engine.row_limit);
        assert!(plugin.ds_info.json_data.timescaledb);
    }
}
