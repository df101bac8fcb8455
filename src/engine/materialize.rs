//! Result materialization
//!
//! Turns a row cursor into a columnar [`Frame`]:
//!
//! ```text
//! RowCursor → read_rows (row limit) → RawRows → build_frame
//!                                                 ├─ dialect converters
//!                                                 ├─ field typing
//!                                                 └─ time-role conversion
//! ```
//!
//! # Field typing
//!
//! A column's type comes from the matching converter or the driver's scan
//! type when every value fits it. Otherwise it is inferred from the values:
//! the first non-null value decides, integers widen to floats when mixed, and
//! any other conflict falls back to strings. All-null columns without a
//! declared type are floats.

use super::error::{EngineError, EngineResult};
use super::transformer::Converter;
use crate::db::{ColumnInfo, DbResult, RowCursor, Value};
use crate::frame::{Field, FieldType, FieldValues, FillMissing, Frame, FrameError, Notice};
use crate::query::{Format, TimeRange};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Per-query model: format, time range, fill policy and column roles
#[derive(Debug, Clone, PartialEq)]
pub struct QueryModel {
    pub format: Format,
    pub time_range: TimeRange,
    pub fill: Option<FillMissing>,
    pub interpolated_sql: String,
    pub columns: Vec<ColumnInfo>,
    pub time_index: Option<usize>,
    /// `timeend` column, table format only
    pub time_end_index: Option<usize>,
    pub metric_index: Option<usize>,
}

impl QueryModel {
    pub fn new(format: Format, time_range: TimeRange, fill: Option<FillMissing>, interpolated_sql: String) -> Self {
        Self {
            format,
            time_range,
            fill,
            interpolated_sql,
            columns: Vec::new(),
            time_index: None,
            time_end_index: None,
            metric_index: None,
        }
    }

    /// Assign column roles from names and declared types
    pub fn classify(&mut self, columns: &[ColumnInfo], time_column_names: &[String], metric_column_types: &[String]) {
        self.columns = columns.to_vec();
        self.time_index = columns
            .iter()
            .position(|c| time_column_names.iter().any(|t| *t == c.name));
        self.time_end_index = match self.format {
            Format::Table => columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case("timeend")),
            Format::TimeSeries => None,
        };

        let (time_index, time_end_index) = (self.time_index, self.time_end_index);
        let is_time_role = |i: usize| Some(i) == time_index || Some(i) == time_end_index;
        self.metric_index = columns.iter().position(|c| c.name == "metric").or_else(|| {
            columns.iter().enumerate().position(|(i, c)| {
                !is_time_role(i)
                    && metric_column_types
                        .iter()
                        .any(|t| t.eq_ignore_ascii_case(base_type_name(&c.database_type_name)))
            })
        });
    }
}

/// `VARCHAR(32)` → `VARCHAR`
fn base_type_name(database_type_name: &str) -> &str {
    database_type_name
        .split('(')
        .next()
        .unwrap_or(database_type_name)
        .trim()
}

/// Rows read from a cursor, before typing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRows {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<Value>>,
    /// More rows existed past the row limit
    pub truncated: bool,
}

/// Read at most `row_limit` rows (0 reads everything)
///
/// One extra row is fetched to tell a full result from a truncated one.
pub async fn read_rows(cursor: &mut dyn RowCursor, row_limit: usize) -> DbResult<RawRows> {
    let mut raw = RawRows {
        columns: cursor.columns().to_vec(),
        ..RawRows::default()
    };

    while let Some(row) = cursor.next_row().await? {
        if row_limit > 0 && raw.rows.len() >= row_limit {
            raw.truncated = true;
            break;
        }
        raw.rows.push(row);
    }
    Ok(raw)
}

/// Build a frame from raw rows using the query model's roles
pub fn build_frame(raw: RawRows, model: &QueryModel, converters: &[Converter], row_limit: usize) -> EngineResult<Frame> {
    let mut frame = Frame::new("", Vec::new());
    frame.set_executed_query(model.interpolated_sql.clone());

    if raw.rows.is_empty() {
        frame.fields = vec![Field::empty()];
        return Ok(frame);
    }

    let column_count = raw.columns.len();
    let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(raw.rows.len()); column_count];
    for (row_idx, row) in raw.rows.into_iter().enumerate() {
        if row.len() != column_count {
            return Err(EngineError::Materialize(format!(
                "row {} has {} values, expected {}",
                row_idx,
                row.len(),
                column_count
            )));
        }
        for (col_idx, value) in row.into_iter().enumerate() {
            columns[col_idx].push(value);
        }
    }

    for (info, values) in raw.columns.iter().zip(columns) {
        let converter = converters
            .iter()
            .find(|c| c.handles(base_type_name(&info.database_type_name)));
        let values = match converter {
            Some(c) => values
                .into_iter()
                .map(c.convert)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| EngineError::Materialize(format!("column {}: {}", info.name, e)))?,
            None => values,
        };
        let hint = converter.map(|c| c.target).or(info.scan_type);
        frame.fields.push(build_field(&info.name, hint, values)?);
    }

    for idx in [model.time_index, model.time_end_index].into_iter().flatten() {
        if let Some(field) = frame.fields.get_mut(idx) {
            convert_time_field(field).map_err(EngineError::TimeConversion)?;
        }
    }

    if raw.truncated {
        frame.append_notice(Notice::warning(format!(
            "Results have been limited to {} because the SQL row limit was reached",
            row_limit
        )));
    }
    Ok(frame)
}

fn build_field(name: &str, hint: Option<FieldType>, values: Vec<Value>) -> EngineResult<Field> {
    if let Some(field_type) = hint {
        if let Ok(field_values) = fill_values(name, field_type, &values) {
            return Ok(Field::new(name, field_values));
        }
    }
    let field_type = infer_type(&values);
    let field_values =
        fill_values(name, field_type, &values).map_err(|e| EngineError::Materialize(e.to_string()))?;
    Ok(Field::new(name, field_values))
}

fn fill_values(name: &str, field_type: FieldType, values: &[Value]) -> Result<FieldValues, FrameError> {
    let mut out = FieldValues::new(field_type);
    for value in values {
        out.push(name, value.clone())?;
    }
    Ok(out)
}

fn infer_type(values: &[Value]) -> FieldType {
    let mut inferred: Option<FieldType> = None;
    for value in values {
        let current = match value {
            Value::Null => continue,
            Value::Bool(_) => FieldType::Bool,
            Value::Int(_) => FieldType::Int64,
            Value::Float(_) => FieldType::Float64,
            Value::Time(_) => FieldType::Time,
            Value::Text(_) | Value::Bytes(_) => FieldType::String,
        };
        inferred = Some(match (inferred, current) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(FieldType::Int64), FieldType::Float64) | (Some(FieldType::Float64), FieldType::Int64) => {
                FieldType::Float64
            }
            (Some(FieldType::Bool), FieldType::Int64) | (Some(FieldType::Int64), FieldType::Bool) => {
                FieldType::Int64
            }
            _ => FieldType::String,
        });
    }
    inferred.unwrap_or(FieldType::Float64)
}

/// Convert a time-role field into nullable timestamps
fn convert_time_field(field: &mut Field) -> Result<(), FrameError> {
    let converted: Vec<Option<DateTime<Utc>>> = match &field.values {
        FieldValues::Time(_) => return Ok(()),
        FieldValues::Int64(v) => v.iter().map(|x| x.and_then(|i| epoch_to_time(i as f64))).collect(),
        FieldValues::Float64(v) => v.iter().map(|x| x.and_then(epoch_to_time)).collect(),
        FieldValues::String(v) => v
            .iter()
            .map(|x| match x {
                None => Ok(None),
                Some(s) => parse_time_text(s).map(Some).ok_or_else(|| FrameError::InvalidTimestamp {
                    field: field.name.clone(),
                    value: s.clone(),
                }),
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(FrameError::UnsupportedConversion {
                field: field.name.clone(),
                from: other.field_type().to_string(),
                to: FieldType::Time.to_string(),
            })
        }
    };
    field.values = FieldValues::Time(converted);
    Ok(())
}

/// Scale an epoch of unknown precision to milliseconds
///
/// Magnitude ~1e9 is seconds, ~1e18 nanoseconds, anything else milliseconds.
pub fn epoch_precision_to_ms(value: f64) -> f64 {
    let scientific = format!("{:e}", value);
    if scientific.ends_with("e9") {
        value * 1e3
    } else if scientific.ends_with("e18") {
        value / 1e6
    } else {
        value
    }
}

fn epoch_to_time(value: f64) -> Option<DateTime<Utc>> {
    let ms = epoch_precision_to_ms(value);
    if !ms.is_finite() {
        return None;
    }
    let nanos = (ms.fract() * 1e6).round() as i64;
    Utc.timestamp_millis_opt(ms.trunc() as i64)
        .single()
        .map(|t| t + chrono::Duration::nanoseconds(nanos))
}

/// Parse RFC 3339 or `YYYY-MM-DD HH:MM:SS[.f]` (UTC) or `YYYY-MM-DD`
pub fn parse_time_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&t));
        }
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| Utc.from_utc_datetime(&t))
}
