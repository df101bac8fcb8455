//! SQL macro interpolation
//!
//! Rewrites `$__name(arg1, arg2, ...)` placeholders in user SQL into
//! dialect-native SQL fragments:
//!
//! - **error**: `MacroError`
//! - **interval**: interval parsing and formatting
//! - this module: the `MacroEngine` trait, the shared scanner, the security gate
//!   and the epoch macros every dialect shares
//!
//! # Pipeline
//!
//! ```text
//! SQL → security gate → scan $name(args) → MacroEngine::evaluate → SQL + fill
//! ```
//!
//! Dialects live in [`crate::dialect`].

mod error;
mod interval;

pub use error::{MacroError, MacroResult};
pub use interval::{format_interval, format_seconds, parse_interval, seconds};

use crate::frame::{FillMissing, FillMode};
use crate::query::{DataQuery, TimeRange};
use chrono::Duration;
use regex::Regex;
use std::sync::LazyLock;

/// `$name(args)`
static MACRO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([_a-zA-Z0-9]+)\(([^)]*)\)").expect("macro pattern is valid")
});

/// Privilege-introspection constructs appearing as a standalone clause
static RESTRICTED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)([\s]*show[\s]+grants|[\s,]session_user\([^)]*\)|[\s,]current_user(\([^)]*\))?|[\s,]system_user\([^)]*\)|[\s,]user\([^)]*\))([\s,;]|$)",
    )
    .expect("restricted pattern is valid")
});

/// What a macro evaluates against
#[derive(Debug, Clone, Copy)]
pub struct MacroContext<'a> {
    pub query: &'a DataQuery,
    pub time_range: &'a TimeRange,
}

/// Output of one macro
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub sql: String,
    /// Fill policy requested by a three-argument group macro
    pub fill: Option<FillMissing>,
}

impl Expansion {
    pub fn sql(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            fill: None,
        }
    }

    /// Builder method: attach a fill policy
    pub fn with_fill(mut self, fill: Option<FillMissing>) -> Self {
        self.fill = fill;
        self
    }

    /// Builder method: append an alias
    pub fn alias(mut self, alias: &str) -> Self {
        self.sql.push_str(alias);
        self
    }
}

/// Output of a full interpolation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolated {
    pub sql: String,
    pub fill: Option<FillMissing>,
}

/// A dialect's macro engine
pub trait MacroEngine: Send + Sync {
    /// Dialect name, used in logs
    fn dialect(&self) -> &'static str;

    /// User-facing message used when a statement is refused
    fn user_error(&self) -> &str;

    /// Expand a single macro
    fn evaluate(&self, name: &str, args: &[String], ctx: &MacroContext<'_>) -> MacroResult<Expansion>;

    /// Rewrite every macro in `sql`
    fn interpolate(&self, query: &DataQuery, time_range: &TimeRange, sql: &str) -> MacroResult<Interpolated> {
        check_restricted(sql, self.dialect(), self.user_error())?;
        let ctx = MacroContext { query, time_range };
        expand_macros(sql, |name, args| self.evaluate(name, args, &ctx))
    }
}

/// Reject statements using privilege-introspection constructs
pub fn check_restricted(sql: &str, dialect: &str, user_error: &str) -> MacroResult<()> {
    if RESTRICTED_PATTERN.is_match(sql) {
        tracing::error!(
            dialect = dialect,
            "Show grants, session_user(), current_user(), system_user() or user() not allowed in query"
        );
        return Err(MacroError::Restricted(user_error.to_string()));
    }
    Ok(())
}

/// Replace every `$name(args)` in `sql` with the evaluator's output
///
/// Scanning continues past a failing macro; the first failure is returned and
/// no partial SQL escapes. When several macros request a fill policy, the last
/// one wins.
pub fn expand_macros<F>(sql: &str, mut evaluate: F) -> MacroResult<Interpolated>
where
    F: FnMut(&str, &[String]) -> MacroResult<Expansion>,
{
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    let mut fill = None;
    let mut first_error = None;

    for caps in MACRO_PATTERN.captures_iter(sql) {
        let (Some(whole), Some(name), Some(raw_args)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        out.push_str(&sql[last..whole.start()]);
        last = whole.end();

        let args = split_args(raw_args.as_str());
        match evaluate(name.as_str(), &args) {
            Ok(expansion) => {
                out.push_str(&expansion.sql);
                if expansion.fill.is_some() {
                    fill = expansion.fill;
                }
            }
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    out.push_str(&sql[last..]);
    Ok(Interpolated { sql: out, fill })
}

/// Comma-split and trim a macro's argument list; `()` has no arguments
fn split_args(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|arg| arg.trim().to_string()).collect()
}

/// Interpret the optional third argument of a group macro
pub fn parse_fill_mode(interval: Duration, arg: &str) -> MacroResult<FillMissing> {
    let mode = match arg {
        "NULL" => FillMode::Null,
        "previous" => FillMode::Previous,
        other => FillMode::Value(
            other
                .parse::<f64>()
                .map_err(|_| MacroError::InvalidFillValue(other.to_string()))?,
        ),
    };
    Ok(FillMissing::new(mode, interval))
}

/// Arguments of `__timeGroup` / `__unixEpochGroup`
#[derive(Debug, Clone, PartialEq)]
pub struct GroupArgs {
    pub column: String,
    pub interval: Duration,
    pub fill: Option<FillMissing>,
    /// The interval argument as written
    pub raw_interval: String,
}

impl GroupArgs {
    /// Bucket width for dialects that group by integer division
    ///
    /// Anything under one second would divide by zero.
    pub fn whole_seconds(&self) -> MacroResult<i64> {
        let secs = seconds(self.interval);
        if secs < 1.0 {
            return Err(MacroError::InvalidInterval(self.raw_interval.clone()));
        }
        Ok(secs.round() as i64)
    }
}

/// Parse `(col, interval[, fill])`
pub fn parse_group_args(name: &str, args: &[String]) -> MacroResult<GroupArgs> {
    if args.len() < 2 {
        return Err(MacroError::missing(name, "time column and interval"));
    }
    let interval = parse_interval(&args[1])?;
    let fill = match args.get(2) {
        Some(arg) => Some(parse_fill_mode(interval, arg)?),
        None => None,
    };
    Ok(GroupArgs {
        column: args[0].clone(),
        interval,
        fill,
        raw_interval: args[1].clone(),
    })
}

/// First argument, the time column
pub fn time_column<'a>(name: &str, args: &'a [String]) -> MacroResult<&'a str> {
    args.first()
        .map(String::as_str)
        .filter(|col| !col.is_empty())
        .ok_or_else(|| MacroError::missing(name, "time column"))
}

/// Epoch macros that read the same in every dialect
///
/// Returns `None` when `name` is not one of them.
pub fn evaluate_unix_epoch(name: &str, args: &[String], ctx: &MacroContext<'_>) -> Option<MacroResult<Expansion>> {
    let from = ctx.time_range.from;
    let to = ctx.time_range.to;
    let nanos = |t: chrono::DateTime<chrono::Utc>| t.timestamp_nanos_opt().unwrap_or(t.timestamp().saturating_mul(1_000_000_000));

    let result = match name {
        "__unixEpochFilter" => time_column(name, args).map(|col| {
            Expansion::sql(format!(
                "{col} >= {} AND {col} <= {}",
                from.timestamp(),
                to.timestamp()
            ))
        }),
        "__unixEpochNanoFilter" => time_column(name, args).map(|col| {
            Expansion::sql(format!("{col} >= {} AND {col} <= {}", nanos(from), nanos(to)))
        }),
        "__unixEpochFrom" => Ok(Expansion::sql(from.timestamp().to_string())),
        "__unixEpochTo" => Ok(Expansion::sql(to.timestamp().to_string())),
        "__unixEpochNanoFrom" => Ok(Expansion::sql(nanos(from).to_string())),
        "__unixEpochNanoTo" => Ok(Expansion::sql(nanos(to).to_string())),
        _ => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_parts() -> (DataQuery, TimeRange) {
        let range = TimeRange::from_unix(1_500_000_000, 1_500_003_600);
        (DataQuery::new("A", "", range), range)
    }

    fn echo(name: &str, args: &[String]) -> MacroResult<Expansion> {
        Ok(Expansion::sql(format!("<{}:{}>", name, args.join("|"))))
    }

    #[test]
    fn test_expand_splits_and_trims_args() {
        let out = expand_macros("SELECT $__m( a ,b,  c ) FROM t", echo).unwrap();
        assert_eq!(out.sql, "SELECT <__m:a|b|c> FROM t");
        assert_eq!(out.fill, None);
    }

    #[test]
    fn test_expand_empty_args() {
        let out = expand_macros("$__timeFrom()", echo).unwrap();
        assert_eq!(out.sql, "<__timeFrom:>");
    }

    #[test]
    fn test_expand_without_macros_is_identity() {
        let sql = "SELECT a, b FROM t WHERE c = '$notamacro'";
        assert_eq!(expand_macros(sql, echo).unwrap().sql, sql);
    }

    #[test]
    fn test_expand_returns_first_error_after_full_scan() {
        let mut seen = Vec::new();
        let err = expand_macros("$__a() $__b() $__c()", |name, _| {
            seen.push(name.to_string());
            match name {
                "__a" => Ok(Expansion::sql("ok")),
                other => Err(MacroError::UnknownMacro(other.to_string())),
            }
        })
        .unwrap_err();

        assert_eq!(err, MacroError::UnknownMacro("__b".into()));
        assert_eq!(seen, vec!["__a", "__b", "__c"]);
    }

    #[test]
    fn test_restricted_constructs() {
        for sql in [
            "SELECT current_user()",
            "select CURRENT_USER",
            "SHOW GRANTS",
            "SELECT 1, session_user()",
            "SELECT system_user();",
            "SELECT user()\nFROM dual",
        ] {
            assert_eq!(
                check_restricted(sql, "test", "contact admin"),
                Err(MacroError::Restricted("contact admin".into())),
                "{sql}"
            );
        }
    }

    #[test]
    fn test_unrestricted_lookalikes() {
        for sql in [
            "SELECT current_user_id FROM t",
            "SELECT username FROM users",
            "SELECT * FROM user_grants",
        ] {
            assert!(check_restricted(sql, "test", "x").is_ok(), "{sql}");
        }
    }

    #[test]
    fn test_parse_fill_mode() {
        let interval = Duration::minutes(1);
        assert_eq!(parse_fill_mode(interval, "NULL").unwrap().mode, FillMode::Null);
        assert_eq!(parse_fill_mode(interval, "previous").unwrap().mode, FillMode::Previous);
        assert_eq!(parse_fill_mode(interval, "1.5").unwrap().mode, FillMode::Value(1.5));
        assert_eq!(
            parse_fill_mode(interval, "nope"),
            Err(MacroError::InvalidFillValue("nope".into()))
        );
    }

    #[test]
    fn test_parse_group_args() {
        let args: Vec<String> = vec!["ts".into(), "'5m'".into()];
        let parsed = parse_group_args("__timeGroup", &args).unwrap();
        assert_eq!(parsed.column, "ts");
        assert_eq!(parsed.interval, Duration::minutes(5));
        assert_eq!(parsed.fill, None);

        assert_eq!(parsed.whole_seconds(), Ok(300));

        let err = parse_group_args("__timeGroup", &args[..1]).unwrap_err();
        assert!(matches!(err, MacroError::MissingArgument { .. }));
    }

    #[test]
    fn test_whole_seconds_rejects_sub_second() {
        let args: Vec<String> = vec!["ts".into(), "500ms".into()];
        let parsed = parse_group_args("__timeGroup", &args).unwrap();
        assert_eq!(
            parsed.whole_seconds(),
            Err(MacroError::InvalidInterval("500ms".into()))
        );

        let args: Vec<String> = vec!["ts".into(), "1500ms".into()];
        assert_eq!(parse_group_args("__timeGroup", &args).unwrap().whole_seconds(), Ok(2));
    }

    #[test]
    fn test_unix_epoch_macros() {
        let (query, range) = ctx_parts();
        let ctx = MacroContext { query: &query, time_range: &range };
        let col = vec!["t".to_string()];

        let filter = evaluate_unix_epoch("__unixEpochFilter", &col, &ctx).unwrap().unwrap();
        assert_eq!(filter.sql, "t >= 1500000000 AND t <= 1500003600");

        let nano = evaluate_unix_epoch("__unixEpochNanoFrom", &[], &ctx).unwrap().unwrap();
        assert_eq!(nano.sql, "1500000000000000000");

        let missing = evaluate_unix_epoch("__unixEpochFilter", &[], &ctx).unwrap();
        assert!(matches!(missing, Err(MacroError::MissingArgument { .. })));

        assert!(evaluate_unix_epoch("__timeFilter", &col, &ctx).is_none());
    }
}
