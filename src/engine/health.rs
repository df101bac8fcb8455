//! Datasource health check

use super::handler::DataSourceHandler;
use serde::Serialize;

/// Outcome of a health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
}

impl DataSourceHandler {
    /// Ping the connection
    ///
    /// Privileged callers see the full driver message; everyone else gets the
    /// same message a failing query would produce.
    pub async fn check_health(&self, privileged: bool) -> HealthCheckResult {
        let inner = &self.inner;
        match inner.connection.ping().await {
            Ok(()) => HealthCheckResult {
                status: HealthStatus::Ok,
                message: "Database Connection OK".to_string(),
            },
            Err(err) => {
                tracing::error!(
                    dialect = inner.macro_engine.dialect(),
                    url = %inner.config.ds_info.url,
                    error = %err,
                    "Check health failed"
                );
                let message = if privileged {
                    inner.transformer.describe_error(&err)
                } else {
                    inner
                        .transformer
                        .transform_query_error(&err, &inner.config.user_facing_default_error)
                };
                HealthCheckResult {
                    status: HealthStatus::Error,
                    message,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSourceInfo;
    use crate::db::{DbConnection, DbError, DbResult, RowCursor, SqliteConnection};
    use crate::dialect::Dialect;
    use crate::engine::DataPluginConfiguration;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Unreachable;

    #[async_trait]
    impl DbConnection for Unreachable {
        async fn query(&self, _sql: &str) -> DbResult<Box<dyn RowCursor>> {
            Err(DbError::Connection("dial tcp 10.0.0.1:3306: connection refused".into()))
        }

        async fn ping(&self) -> DbResult<()> {
            Err(DbError::driver("2003", "Can't connect to MySQL server on '10.0.0.1'"))
        }
    }

    fn config() -> DataPluginConfiguration {
        DataPluginConfiguration {
            ds_info: DataSourceInfo::default(),
            time_column_names: vec!["time".into()],
            metric_column_types: Vec::new(),
            row_limit: 0,
            user_facing_default_error: "contact your admin".into(),
            max_concurrent_queries: 1,
        }
    }

    #[tokio::test]
    async fn test_health_ok() {
        let conn = Arc::new(SqliteConnection::open_in_memory().unwrap());
        let handler = DataSourceHandler::for_dialect(Dialect::Sqlite, config(), conn);
        let result = handler.check_health(false).await;
        assert_eq!(result.status, HealthStatus::Ok);
        assert_eq!(result.message, "Database Connection OK");
    }

    #[tokio::test]
    async fn test_health_failure_redaction() {
        let handler = DataSourceHandler::for_dialect(Dialect::MySql, config(), Arc::new(Unreachable));

        let public = handler.check_health(false).await;
        assert_eq!(public.status, HealthStatus::Error);
        assert_eq!(public.message, "query failed - contact your admin");

        let admin = handler.check_health(true).await;
        assert_eq!(admin.status, HealthStatus::Error);
        assert_eq!(
            admin.message,
            "Can't connect to MySQL server on '10.0.0.1' (code 2003)"
        );
    }
}
