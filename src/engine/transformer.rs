//! Dialect result transformers
//!
//! A transformer decides how driver failures are shown to the caller and
//! which value converters the materializer applies per declared column type.

use crate::db::{DbError, Value};
use crate::frame::FieldType;
use uuid::Uuid;

/// Converts driver values of given declared types into a target field type
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    pub name: &'static str,
    /// Declared database type names (upper-case) this converter handles
    pub database_types: &'static [&'static str],
    pub target: FieldType,
    pub convert: fn(Value) -> Result<Value, String>,
}

impl Converter {
    pub fn handles(&self, database_type_name: &str) -> bool {
        self.database_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(database_type_name))
    }
}

/// Dialect policy for errors and value conversion
pub trait QueryResultTransformer: Send + Sync {
    /// Whether the driver error is something the user can fix in their SQL
    fn is_user_fixable(&self, err: &DbError) -> bool;

    /// Message returned to the caller for a failed statement
    ///
    /// User-fixable errors pass through verbatim; everything else is logged
    /// and replaced by `query failed - <user_error>`.
    fn transform_query_error(&self, err: &DbError, user_error: &str) -> String {
        if self.is_user_fixable(err) {
            return err.to_string();
        }
        redact("query failed", err, user_error)
    }

    /// Full driver message for privileged callers
    fn describe_error(&self, err: &DbError) -> String {
        match err.code() {
            Some(code) => format!("{} (code {})", err, code),
            None => err.to_string(),
        }
    }

    /// Converters keyed by declared database type
    fn converters(&self) -> Vec<Converter> {
        Vec::new()
    }
}

/// Log `err` under a fresh error id and return `<prefix> - <user_error>`
pub fn redact(prefix: &str, err: &dyn std::fmt::Display, user_error: &str) -> String {
    let error_id = Uuid::new_v4();
    tracing::error!(error_id = %error_id, error = %err, "{}", prefix);
    format!("{} - {}", prefix, user_error)
}

/// Text to float, for `DECIMAL`/`NUMERIC` columns delivered as strings
pub fn text_to_float(value: Value) -> Result<Value, String> {
    match value {
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("cannot parse '{}' as a number", s)),
        Value::Bytes(b) => text_to_float(Value::Text(String::from_utf8_lossy(&b).into_owned())),
        Value::Int(i) => Ok(Value::Float(i as f64)),
        other => Ok(other),
    }
}

/// Text to timestamp, for `DATETIME`/`TIMESTAMP`/`DATE` columns delivered as strings
pub fn text_to_time(value: Value) -> Result<Value, String> {
    match value {
        Value::Text(s) => super::materialize::parse_time_text(&s)
            .map(Value::Time)
            .ok_or_else(|| format!("cannot parse '{}' as a timestamp", s)),
        Value::Bytes(b) => text_to_time(Value::Text(String::from_utf8_lossy(&b).into_owned())),
        other => Ok(other),
    }
}
