//! MySQL dialect

use crate::db::DbError;
use crate::engine::{text_to_float, text_to_time, Converter, QueryResultTransformer};
use crate::frame::FieldType;
use crate::macros::{
    evaluate_unix_epoch, parse_group_args, time_column, Expansion, MacroContext,
    MacroEngine, MacroError, MacroResult,
};

/// Error numbers the user can fix: syntax error, unknown column, missing table
const USER_FIXABLE_CODES: [&str; 3] = ["1064", "1054", "1146"];

/// MySQL macro engine
#[derive(Debug, Clone)]
pub struct MySqlMacroEngine {
    user_error: String,
}

impl MySqlMacroEngine {
    pub fn new(user_error: impl Into<String>) -> Self {
        Self {
            user_error: user_error.into(),
        }
    }
}

impl MacroEngine for MySqlMacroEngine {
    fn dialect(&self) -> &'static str {
        "mysql"
    }

    fn user_error(&self) -> &str {
        &self.user_error
    }

    fn evaluate(&self, name: &str, args: &[String], ctx: &MacroContext<'_>) -> MacroResult<Expansion> {
        let from = ctx.time_range.from.timestamp();
        let to = ctx.time_range.to.timestamp();

        match name {
            "__timeEpoch" | "__time" => {
                let col = time_column(name, args)?;
                Ok(Expansion::sql(format!("UNIX_TIMESTAMP({col}) as time_sec")))
            }
            "__timeFilter" => {
                let col = time_column(name, args)?;
                // FROM_UNIXTIME rejects negative input.
                if from < 0 {
                    return Ok(Expansion::sql(format!(
                        "{col} BETWEEN DATE_ADD(FROM_UNIXTIME(0), INTERVAL {from} SECOND) AND FROM_UNIXTIME({to})"
                    )));
                }
                Ok(Expansion::sql(format!(
                    "{col} BETWEEN FROM_UNIXTIME({from}) AND FROM_UNIXTIME({to})"
                )))
            }
            "__timeFrom" => Ok(Expansion::sql(format!("FROM_UNIXTIME({from})"))),
            "__timeTo" => Ok(Expansion::sql(format!("FROM_UNIXTIME({to})"))),
            "__timeGroup" => {
                let group = parse_group_args(name, args)?;
                let secs = group.whole_seconds()?;
                Ok(Expansion::sql(format!(
                    "UNIX_TIMESTAMP({}) DIV {secs} * {secs}",
                    group.column
                ))
                .with_fill(group.fill))
            }
            "__timeGroupAlias" => Ok(self.evaluate("__timeGroup", args, ctx)?.alias(" AS \"time\"")),
            "__unixEpochGroup" => {
                let group = parse_group_args(name, args)?;
                let secs = group.whole_seconds()?;
                Ok(Expansion::sql(format!("{} DIV {secs} * {secs}", group.column))
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

/// MySQL error and value policy
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlTransformer;

impl QueryResultTransformer for MySqlTransformer {
    fn is_user_fixable(&self, err: &DbError) -> bool {
        err.code().is_some_and(|code| USER_FIXABLE_CODES.contains(&code))
    }

    fn converters(&self) -> Vec<Converter> {
        vec![
            Converter {
                name: "mysql decimal",
                database_types: &["DECIMAL", "NEWDECIMAL"],
                target: FieldType::Float64,
                convert: text_to_float,
            },
            Converter {
                name: "mysql datetime",
                database_types: &["DATETIME", "TIMESTAMP", "DATE"],
                target: FieldType::Time,
                convert: text_to_time,
            },
        ]
    }
}
