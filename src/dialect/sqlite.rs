//! SQLite dialect

use crate::db::DbError;
use crate::engine::{text_to_time, Converter, QueryResultTransformer};
use crate::frame::FieldType;
use crate::macros::{
    evaluate_unix_epoch, parse_group_args, time_column, Expansion, MacroContext,
    MacroEngine, MacroError, MacroResult,
};

/// Driver messages the user can fix
const USER_FIXABLE_MESSAGES: [&str; 3] = ["syntax error", "no such table", "no such column"];

/// SQLite macro engine
#[derive(Debug, Clone)]
pub struct SqliteMacroEngine {
    user_error: String,
}

impl SqliteMacroEngine {
    pub fn new(user_error: impl Into<String>) -> Self {
        Self {
            user_error: user_error.into(),
        }
    }
}

impl MacroEngine for SqliteMacroEngine {
    fn dialect(&self) -> &'static str {
        "sqlite"
    }

    fn user_error(&self) -> &str {
        &self.user_error
    }

    fn evaluate(&self, name: &str, args: &[String], ctx: &MacroContext<'_>) -> MacroResult<Expansion> {
        let from = ctx.time_range.from.timestamp();
        let to = ctx.time_range.to.timestamp();

        match name {
            "__time" => {
                let col = time_column(name, args)?;
                Ok(Expansion::sql(format!("{col} AS \"time\"")))
            }
            "__timeEpoch" => {
                let col = time_column(name, args)?;
                Ok(Expansion::sql(format!(
                    "CAST(strftime('%s', {col}) AS INTEGER) AS \"time\""
                )))
            }
            "__timeFilter" => {
                let col = time_column(name, args)?;
                Ok(Expansion::sql(format!(
                    "{col} BETWEEN datetime({from}, 'unixepoch') AND datetime({to}, 'unixepoch')"
                )))
            }
            "__timeFrom" => Ok(Expansion::sql(format!("datetime({from}, 'unixepoch')"))),
            "__timeTo" => Ok(Expansion::sql(format!("datetime({to}, 'unixepoch')"))),
            "__timeGroup" => {
                let group = parse_group_args(name, args)?;
                let secs = group.whole_seconds()?;
                Ok(Expansion::sql(format!(
                    "(CAST(strftime('%s', {}) AS INTEGER) / {secs}) * {secs}",
                    group.column
                ))
                .with_fill(group.fill))
            }
            "__timeGroupAlias" => Ok(self.evaluate("__timeGroup", args, ctx)?.alias(" AS \"time\"")),
            "__unixEpochGroup" => {
                let group = parse_group_args(name, args)?;
                let secs = group.whole_seconds()?;
                Ok(Expansion::sql(format!("({} / {secs}) * {secs}", group.column))
                    .with_fill(group.fill))
            }
            "__unixEpochGroupAlias" => {
                Ok(self.evaluate("__unixEpochGroup", args, ctx)?.alias(" AS \"time\""))
            }
            _ => evaluate_unix_epoch(name, args, ctx)
                .unwrap_or_else(|| Err(MacroError::UnknownMacro(name.to_string()))),
        }
    }
}

/// SQLite error and value policy
///
/// SQLite reports one generic result code for most statement errors, so the
/// classification goes by message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTransformer;

impl QueryResultTransformer for SqliteTransformer {
    fn is_user_fixable(&self, err: &DbError) -> bool {
        match err {
            DbError::Driver { message, .. } => USER_FIXABLE_MESSAGES.iter().any(|m| message.contains(m)),
            _ => false,
        }
    }

    fn converters(&self) -> Vec<Converter> {
        vec![Converter {
            name: "sqlite datetime",
            database_types: &["DATETIME", "TIMESTAMP", "DATE"],
            target: FieldType::Time,
            convert: text_to_time,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DbConnection, SqliteConnection, Value};
    use crate::query::{DataQuery, TimeRange};

    fn run(sql: &str) -> MacroResult<crate::macros::Interpolated> {
        let range = TimeRange::from_unix(1_500_000_000, 1_500_003_600);
        let query = DataQuery::new("A", sql, range);
        SqliteMacroEngine::new("x").interpolate(&query, &range, sql)
    }

    #[test]
    fn test_macros() {
        assert_eq!(
            run("$__timeFilter(ts)").unwrap().sql,
            "ts BETWEEN datetime(1500000000, 'unixepoch') AND datetime(1500003600, 'unixepoch')"
        );
        assert_eq!(
            run("$__timeGroup(ts, '1m')").unwrap().sql,
            "(CAST(strftime('%s', ts) AS INTEGER) / 60) * 60"
        );
        assert_eq!(run("$__unixEpochGroupAlias(e, 10s)").unwrap().sql, "(e / 10) * 10 AS \"time\"");
        assert!(matches!(run("$__timeEpoch()"), Err(MacroError::MissingArgument { .. })));
    }

    #[test]
    fn test_sub_second_group_interval_is_rejected() {
        assert_eq!(
            run("$__timeGroup(ts, 500ms)").unwrap_err(),
            MacroError::InvalidInterval("500ms".into())
        );
        assert_eq!(
            run("$__unixEpochGroup(e, 0.2s)").unwrap_err(),
            MacroError::InvalidInterval("0.2s".into())
        );
    }

    #[tokio::test]
    async fn test_generated_sql_runs() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE m (ts DATETIME, v REAL);
             INSERT INTO m VALUES ('2017-07-14 02:40:30', 1.0);
             INSERT INTO m VALUES ('2017-07-14 02:40:50', 3.0);
             INSERT INTO m VALUES ('2017-07-14 04:00:00', 9.0);",
        )
        .unwrap();

        let sql = run(
            "SELECT $__timeGroupAlias(ts, '1m'), avg(v) FROM m WHERE $__timeFilter(ts) GROUP BY 1",
        )
        .unwrap()
        .sql;
        let mut cursor = conn.query(&sql).await.unwrap();
        let row = cursor.next_row().await.unwrap().unwrap();
        assert_eq!(row, vec![Value::Int(1_500_000_000), Value::Float(2.0)]);
        assert!(cursor.next_row().await.unwrap().is_none());
    }

    #[test]
    fn test_user_fixable_messages() {
        let t = SqliteTransformer;
        assert!(t.is_user_fixable(&DbError::Driver {
            code: Some("1".into()),
            message: "no such table: nope".into()
        }));
        assert!(!t.is_user_fixable(&DbError::Driver {
            code: Some("5".into()),
            message: "database is locked".into()
        }));
    }
}
