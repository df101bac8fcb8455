//! Resampling onto a uniform time grid
//!
//! Each grid point `g` takes the last source row with `time < g + interval`
//! that has not been consumed by an earlier grid point. Grid points with no
//! such row are filled according to the fill mode.

use super::error::{FrameError, FrameResult};
use super::types::{Field, FieldType, FieldValues, FillMissing, FillMode, Frame, TimeSeriesType};
use crate::db::Value;
use chrono::{DateTime, Utc};

/// Resample a time-series frame over `[from, to]` at the fill interval
pub fn resample(
    frame: &Frame,
    fill: &FillMissing,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> FrameResult<Frame> {
    let schema = frame.time_series_schema();
    if schema.kind == TimeSeriesType::Not {
        return Err(FrameError::NotTimeSeries);
    }
    if fill.interval <= chrono::Duration::zero() {
        return Ok(frame.clone());
    }
    let time_index = schema.time_index.ok_or(FrameError::NotTimeSeries)?;

    let FieldValues::Time(times) = &frame.fields[time_index].values else {
        return Err(FrameError::NotTimeSeries);
    };
    let times = times
        .iter()
        .map(|t| t.ok_or(FrameError::NullTime))
        .collect::<FrameResult<Vec<_>>>()?;

    let mut fields: Vec<Field> = frame
        .fields
        .iter()
        .map(|f| {
            Field::new(f.name.clone(), FieldValues::new(f.field_type()))
                .with_labels(f.labels.clone())
        })
        .collect();

    let mut cursor = 0;
    let mut current = from;
    while current <= to {
        let next = current + fill.interval;

        let mut last_row = None;
        while cursor < times.len() && times[cursor] < next {
            last_row = Some(cursor);
            cursor += 1;
        }

        for (idx, field) in fields.iter_mut().enumerate() {
            let value = if idx == time_index {
                Value::Time(current)
            } else {
                match last_row {
                    Some(row) => frame.fields[idx].values.get(row),
                    None => missing_value(field, fill.mode),
                }
            };
            let name = field.name.clone();
            field.values.push(&name, value)?;
        }

        current = next;
    }

    Ok(Frame {
        name: frame.name.clone(),
        fields,
        meta: frame.meta.clone(),
    })
}

fn missing_value(field: &Field, mode: FillMode) -> Value {
    match mode {
        FillMode::Null => Value::Null,
        FillMode::Previous => field
            .len()
            .checked_sub(1)
            .map(|i| field.values.get(i))
            .unwrap_or(Value::Null),
        FillMode::Value(v) => match field.field_type() {
            FieldType::Float64 => Value::Float(v),
            FieldType::Int64 => Value::Int(v as i64),
            _ => Value::Null,
        },
    }
}
