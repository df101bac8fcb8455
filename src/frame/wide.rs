//! Long to wide conversion
//!
//! A long frame has one row per (timestamp, factor values) pair. The wide form
//! has one row per distinct timestamp and one field per (value field, factor
//! combination); factor values become labels on that field.
//!
//! ```text
//! time | metric | value          time | value{metric=a} | value{metric=b}
//! t1   | a      | 1              t1   | 1               | 2
//! t1   | b      | 2       →      t2   | 3               | 4
//! t2   | a      | 3
//! t2   | b      | 4
//! ```

use super::error::{FrameError, FrameResult};
use super::types::{
    Field, FieldType, FieldValues, FillMissing, FillMode, Frame, TimeSeriesType,
};
use crate::db::Value;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Convert a long frame into a wide frame
///
/// The long frame must be sorted ascending by time. When `fill` is given,
/// cells with no source row are filled according to its mode instead of null.
pub fn long_to_wide(long: &Frame, fill: Option<&FillMissing>) -> FrameResult<Frame> {
    let schema = long.time_series_schema();
    if schema.kind != TimeSeriesType::Long {
        return Err(FrameError::NotLong);
    }
    let time_index = schema.time_index.ok_or(FrameError::NotLong)?;
    let time_field = &long.fields[time_index];
    let FieldValues::Time(times) = &time_field.values else {
        return Err(FrameError::NotLong);
    };

    let times = sorted_times(times)?;

    let mut wide_times: Vec<Option<DateTime<Utc>>> = Vec::new();
    let mut wide_fields: Vec<Field> = Vec::new();
    let mut lookup: HashMap<(usize, Vec<Option<String>>), usize> = HashMap::new();

    for (row, t) in times.iter().enumerate() {
        if wide_times.last() != Some(&Some(*t)) {
            wide_times.push(Some(*t));
            for field in &mut wide_fields {
                let value = fill_value(field, fill);
                let name = field.name.clone();
                field.values.push(&name, value)?;
            }
        }
        let current = wide_times.len() - 1;

        let factors: Vec<Option<String>> = schema
            .factor_indices
            .iter()
            .map(|&i| match long.fields[i].values.get(row) {
                Value::Text(s) => Some(s),
                _ => None,
            })
            .collect();

        for &value_index in &schema.value_indices {
            let key = (value_index, factors.clone());
            let idx = match lookup.get(&key) {
                Some(&idx) => idx,
                None => {
                    let source = &long.fields[value_index];
                    let labels: BTreeMap<String, String> = schema
                        .factor_indices
                        .iter()
                        .zip(&factors)
                        .map(|(&fi, v)| (long.fields[fi].name.clone(), v.clone().unwrap_or_default()))
                        .collect();
                    let mut field = Field::new(
                        source.name.clone(),
                        FieldValues::new(source.field_type()),
                    )
                    .with_labels(labels);
                    for _ in 0..wide_times.len() {
                        let value = fill_value(&field, fill);
                        field.values.push(&source.name, value)?;
                    }
                    wide_fields.push(field);
                    lookup.insert(key, wide_fields.len() - 1);
                    wide_fields.len() - 1
                }
            };

            let value = long.fields[value_index].values.get(row);
            let field = &mut wide_fields[idx];
            let name = field.name.clone();
            field.values.set(current, &name, value)?;
        }
    }

    let mut fields = Vec::with_capacity(wide_fields.len() + 1);
    fields.push(Field::new(
        time_field.name.clone(),
        FieldValues::Time(wide_times),
    ));
    fields.extend(wide_fields);

    Ok(Frame {
        name: long.name.clone(),
        fields,
        meta: long.meta.clone(),
    })
}

/// Unwrap the time column, rejecting nulls and unsorted input
fn sorted_times(times: &[Option<DateTime<Utc>>]) -> FrameResult<Vec<DateTime<Utc>>> {
    let mut out = Vec::with_capacity(times.len());
    for t in times {
        let t = t.ok_or(FrameError::NullTime)?;
        if let Some(prev) = out.last() {
            if t < *prev {
                return Err(FrameError::Unsorted);
            }
        }
        out.push(t);
    }
    Ok(out)
}

/// Value for a cell that has no source row
fn fill_value(field: &Field, fill: Option<&FillMissing>) -> Value {
    match fill.map(|f| f.mode) {
        Some(FillMode::Previous) => field
            .len()
            .checked_sub(1)
            .map(|i| field.values.get(i))
            .unwrap_or(Value::Null),
        Some(FillMode::Value(v)) => match field.field_type() {
            FieldType::Float64 => Value::Float(v),
            FieldType::Int64 => Value::Int(v as i64),
            _ => Value::Null,
        },
        Some(FillMode::Null) | None => Value::Null,
    }
}
