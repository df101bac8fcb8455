//! PostgreSQL dialect, with optional TimescaleDB bucketing

use crate::db::DbError;
use crate::engine::{text_to_float, text_to_time, Converter, QueryResultTransformer};
use crate::frame::FieldType;
use crate::macros::{
    evaluate_unix_epoch, format_seconds, parse_group_args, seconds, time_column, Expansion,
    MacroContext, MacroEngine, MacroError, MacroResult,
};
use chrono::{SecondsFormat, SubsecRound};

/// SQLSTATEs the user can fix: syntax error, undefined column, undefined table
const USER_FIXABLE_CODES: [&str; 3] = ["42601", "42703", "42P01"];

/// PostgreSQL macro engine
#[derive(Debug, Clone)]
pub struct PostgresMacroEngine {
    user_error: String,
    timescaledb: bool,
}

impl PostgresMacroEngine {
    pub fn new(user_error: impl Into<String>, timescaledb: bool) -> Self {
        Self {
            user_error: user_error.into(),
            timescaledb,
        }
    }
}

impl MacroEngine for PostgresMacroEngine {
    fn dialect(&self) -> &'static str {
        "postgres"
    }

    fn user_error(&self) -> &str {
        &self.user_error
    }

    fn evaluate(&self, name: &str, args: &[String], ctx: &MacroContext<'_>) -> MacroResult<Expansion> {
        let literal = |t: chrono::DateTime<chrono::Utc>| {
            t.trunc_subsecs(0).to_rfc3339_opts(SecondsFormat::Secs, true)
        };
        let from = literal(ctx.time_range.from);
        let to = literal(ctx.time_range.to);

        match name {
            "__time" => {
                let col = time_column(name, args)?;
                Ok(Expansion::sql(format!("{col} AS \"time\"")))
            }
            "__timeEpoch" => {
                let col = time_column(name, args)?;
                Ok(Expansion::sql(format!("extract(epoch from {col}) as \"time\"")))
            }
            "__timeFilter" => {
                let col = time_column(name, args)?;
                Ok(Expansion::sql(format!("{col} BETWEEN '{from}' AND '{to}'")))
            }
            "__timeFrom" => Ok(Expansion::sql(format!("'{from}'"))),
            "__timeTo" => Ok(Expansion::sql(format!("'{to}'"))),
            "__timeGroup" => {
                let group = parse_group_args(name, args)?;
                let sql = if self.timescaledb {
                    format!("time_bucket('{:.0}s',{})", seconds(group.interval), group.column)
                } else {
                    let secs = format_seconds(group.interval);
                    format!("floor(extract(epoch from {})/{secs})*{secs}", group.column)
                };
                Ok(Expansion::sql(sql).with_fill(group.fill))
            }
            "__timeGroupAlias" => Ok(self.evaluate("__timeGroup", args, ctx)?.alias(" AS \"time\"")),
            "__unixEpochGroup" => {
                let group = parse_group_args(name, args)?;
                let secs = format_seconds(group.interval);
                Ok(Expansion::sql(format!("floor(({})/{secs})*{secs}", group.column))
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

/// PostgreSQL error and value policy
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresTransformer;

impl QueryResultTransformer for PostgresTransformer {
    fn is_user_fixable(&self, err: &DbError) -> bool {
        err.code().is_some_and(|code| USER_FIXABLE_CODES.contains(&code))
    }

    fn converters(&self) -> Vec<Converter> {
        vec![
            Converter {
                name: "postgres numeric",
                database_types: &["NUMERIC", "DECIMAL"],
                target: FieldType::Float64,
                convert: text_to_float,
            },
            Converter {
                name: "postgres timestamp",
                database_types: &["TIMESTAMP", "TIMESTAMPTZ", "DATE"],
                target: FieldType::Time,
                convert: text_to_time,
            },
        ]
    }
}
