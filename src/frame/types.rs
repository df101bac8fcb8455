//! Core frame types
//!
//! - `FieldType` / `FieldValues`: typed, nullable column storage
//! - `Field`: a named column with optional labels
//! - `Frame`: ordered set of equal-length fields plus metadata
//! - `FillMissing`: gap-filling policy for time series

use super::error::{FrameError, FrameResult};
use crate::db::Value;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Name given to the time field of time-series frames
pub const TIME_FIELD_NAME: &str = "Time";

/// Logical type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Bool,
    Int64,
    Float64,
    String,
    Time,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Bool => write!(f, "bool"),
            FieldType::Int64 => write!(f, "int64"),
            FieldType::Float64 => write!(f, "float64"),
            FieldType::String => write!(f, "string"),
            FieldType::Time => write!(f, "time"),
        }
    }
}

/// Column storage. Every variant is nullable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum FieldValues {
    Bool(Vec<Option<bool>>),
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Time(Vec<Option<DateTime<Utc>>>),
}

impl FieldValues {
    /// Create empty storage for a field type
    pub fn new(field_type: FieldType) -> Self {
        Self::with_nulls(field_type, 0)
    }

    /// Create storage holding `len` nulls
    pub fn with_nulls(field_type: FieldType, len: usize) -> Self {
        match field_type {
            FieldType::Bool => FieldValues::Bool(vec![None; len]),
            FieldType::Int64 => FieldValues::Int64(vec![None; len]),
            FieldType::Float64 => FieldValues::Float64(vec![None; len]),
            FieldType::String => FieldValues::String(vec![None; len]),
            FieldType::Time => FieldValues::Time(vec![None; len]),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValues::Bool(_) => FieldType::Bool,
            FieldValues::Int64(_) => FieldType::Int64,
            FieldValues::Float64(_) => FieldType::Float64,
            FieldValues::String(_) => FieldType::String,
            FieldValues::Time(_) => FieldType::Time,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::Bool(v) => v.len(),
            FieldValues::Int64(v) => v.len(),
            FieldValues::Float64(v) => v.len(),
            FieldValues::String(v) => v.len(),
            FieldValues::Time(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a null
    pub fn push_null(&mut self) {
        match self {
            FieldValues::Bool(v) => v.push(None),
            FieldValues::Int64(v) => v.push(None),
            FieldValues::Float64(v) => v.push(None),
            FieldValues::String(v) => v.push(None),
            FieldValues::Time(v) => v.push(None),
        }
    }

    /// Append a value, coercing it into this field's type
    ///
    /// Integers widen into floats and anything scalar renders into strings;
    /// every other mismatch is an error.
    pub fn push(&mut self, field: &str, value: Value) -> FrameResult<()> {
        match self {
            FieldValues::Bool(v) => v.push(to_bool(field, value)?),
            FieldValues::Int64(v) => v.push(to_int(field, value)?),
            FieldValues::Float64(v) => v.push(to_float(field, value)?),
            FieldValues::String(v) => v.push(to_string(value)),
            FieldValues::Time(v) => v.push(to_time(field, value)?),
        }
        Ok(())
    }

    /// Overwrite the value at `idx`, coercing like [`FieldValues::push`]
    pub fn set(&mut self, idx: usize, field: &str, value: Value) -> FrameResult<()> {
        match self {
            FieldValues::Bool(v) => v[idx] = to_bool(field, value)?,
            FieldValues::Int64(v) => v[idx] = to_int(field, value)?,
            FieldValues::Float64(v) => v[idx] = to_float(field, value)?,
            FieldValues::String(v) => v[idx] = to_string(value),
            FieldValues::Time(v) => v[idx] = to_time(field, value)?,
        }
        Ok(())
    }

    /// Read the value at `idx`; out of range reads as null
    pub fn get(&self, idx: usize) -> Value {
        let value = match self {
            FieldValues::Bool(v) => v.get(idx).cloned().flatten().map(Value::Bool),
            FieldValues::Int64(v) => v.get(idx).cloned().flatten().map(Value::Int),
            FieldValues::Float64(v) => v.get(idx).cloned().flatten().map(Value::Float),
            FieldValues::String(v) => v.get(idx).cloned().flatten().map(Value::Text),
            FieldValues::Time(v) => v.get(idx).cloned().flatten().map(Value::Time),
        };
        value.into()
    }

    /// Check whether the value at `idx` is null
    pub fn is_null(&self, idx: usize) -> bool {
        self.get(idx).is_null()
    }
}

fn mismatch(field: &str, expected: &str, value: &Value) -> FrameError {
    FrameError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        found: value.type_name().to_string(),
    }
}

fn to_bool(field: &str, value: Value) -> FrameResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        Value::Int(i) => Ok(Some(i != 0)),
        other => Err(mismatch(field, "bool", &other)),
    }
}

fn to_int(field: &str, value: Value) -> FrameResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Int(i) => Ok(Some(i)),
        Value::Bool(b) => Ok(Some(b as i64)),
        other => Err(mismatch(field, "int64", &other)),
    }
}

fn to_float(field: &str, value: Value) -> FrameResult<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Float(f) => Ok(Some(f)),
        Value::Int(i) => Ok(Some(i as f64)),
        other => Err(mismatch(field, "float64", &other)),
    }
}

fn to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Bytes(b) => Some(String::from_utf8_lossy(&b).into_owned()),
        Value::Time(t) => Some(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    }
}

fn to_time(field: &str, value: Value) -> FrameResult<Option<DateTime<Utc>>> {
    match value {
        Value::Null => Ok(None),
        Value::Time(t) => Ok(Some(t)),
        other => Err(mismatch(field, "time", &other)),
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub values: FieldValues,
}

impl Field {
    pub fn new(name: impl Into<String>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
            values,
        }
    }

    /// Placeholder field used for frames without rows
    pub fn empty() -> Self {
        Self::new("", FieldValues::Float64(Vec::new()))
    }

    /// Builder method: set labels
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.values.field_type()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert this field to nullable floats in place
    pub fn convert_to_float(&mut self) -> FrameResult<()> {
        let converted = match &self.values {
            FieldValues::Float64(_) => return Ok(()),
            FieldValues::Int64(v) => v.iter().map(|x| x.map(|i| i as f64)).collect(),
            other => {
                return Err(FrameError::UnsupportedConversion {
                    field: self.name.clone(),
                    from: other.field_type().to_string(),
                    to: FieldType::Float64.to_string(),
                })
            }
        };
        self.values = FieldValues::Float64(converted);
        Ok(())
    }
}

/// Severity of a frame notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/// A message attached to a frame for the consumer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub text: String,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Warning,
            text: text.into(),
        }
    }
}

/// Frame metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    /// SQL text that was actually sent to the database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_query_string: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

/// Shape of a frame as a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSeriesType {
    /// No time field or no value fields
    Not,
    /// Time field plus value fields, no string factors
    Wide,
    /// Time field, value fields and string factor fields
    Long,
}

/// Field roles of a frame viewed as a time series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesSchema {
    pub kind: TimeSeriesType,
    pub time_index: Option<usize>,
    pub factor_indices: Vec<usize>,
    pub value_indices: Vec<usize>,
}

/// The canonical columnar result unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,
}

impl Frame {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
            meta: None,
        }
    }

    /// Number of rows (length of the first field)
    pub fn rows(&self) -> usize {
        self.fields.first().map(Field::len).unwrap_or(0)
    }

    /// Check that every field has the same length
    pub fn is_consistent(&self) -> bool {
        let rows = self.rows();
        self.fields.iter().all(|f| f.len() == rows)
    }

    pub fn meta_mut(&mut self) -> &mut FrameMeta {
        self.meta.get_or_insert_with(FrameMeta::default)
    }

    pub fn append_notice(&mut self, notice: Notice) {
        self.meta_mut().notices.push(notice);
    }

    pub fn set_executed_query(&mut self, sql: impl Into<String>) {
        self.meta_mut().executed_query_string = Some(sql.into());
    }

    pub fn executed_query(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.executed_query_string.as_deref())
    }

    pub fn notices(&self) -> &[Notice] {
        self.meta.as_ref().map(|m| m.notices.as_slice()).unwrap_or(&[])
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Classify the frame's fields for time-series processing
    pub fn time_series_schema(&self) -> TimeSeriesSchema {
        let mut schema = TimeSeriesSchema {
            kind: TimeSeriesType::Not,
            time_index: None,
            factor_indices: Vec::new(),
            value_indices: Vec::new(),
        };

        schema.time_index = self
            .fields
            .iter()
            .position(|f| f.field_type() == FieldType::Time);
        let Some(time_index) = schema.time_index else {
            return schema;
        };

        for (i, field) in self.fields.iter().enumerate() {
            if i == time_index {
                continue;
            }
            if field.field_type() == FieldType::String {
                schema.factor_indices.push(i);
            } else {
                schema.value_indices.push(i);
            }
        }

        if schema.value_indices.is_empty() {
            return schema;
        }
        schema.kind = if schema.factor_indices.is_empty() {
            TimeSeriesType::Wide
        } else {
            TimeSeriesType::Long
        };
        schema
    }
}

/// How missing points are filled when resampling
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum FillMode {
    /// Leave gaps as null
    Null,
    /// Carry the last value forward
    Previous,
    /// Substitute a fixed value
    Value(f64),
}

/// Gap-filling policy produced by `$__timeGroup(col, interval, fill)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillMissing {
    pub mode: FillMode,
    pub interval: Duration,
}

impl FillMissing {
    pub fn new(mode: FillMode, interval: Duration) -> Self {
        Self { mode, interval }
    }
}
