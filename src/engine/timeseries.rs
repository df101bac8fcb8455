//! Time-series reshaping
//!
//! Applied to frames of `time_series` queries after materialization:
//!
//! 1. rename the time field to `Time`
//! 2. coerce value fields to float
//! 3. pivot long frames to wide
//! 4. resample onto the fill grid when the query asked for gap filling

use super::error::{EngineError, EngineResult};
use super::materialize::QueryModel;
use crate::frame::{
    long_to_wide, resample, FieldType, Frame, Notice, TimeSeriesType, TIME_FIELD_NAME,
};

/// Normalize a materialized frame into a time series
pub fn reshape(mut frame: Frame, model: &QueryModel) -> EngineResult<Frame> {
    let time_index = model.time_index.ok_or(EngineError::NoTimeColumn)?;
    let field_count = frame.fields.len();

    if let Some(field) = frame.fields.get_mut(time_index) {
        field.name = TIME_FIELD_NAME.to_string();
    }

    for (i, field) in frame.fields.iter_mut().enumerate() {
        if i == time_index || Some(i) == model.metric_index || field.field_type() == FieldType::String {
            continue;
        }
        field.convert_to_float().map_err(EngineError::ConvertToFloat)?;
    }

    if frame.time_series_schema().kind == TimeSeriesType::Long {
        frame = long_to_wide(&frame, model.fill.as_ref()).map_err(EngineError::LongToWide)?;

        if field_count == 3 {
            for field in &mut frame.fields {
                if field.labels.len() == 1 {
                    if let Some((_, value)) = std::mem::take(&mut field.labels).into_iter().next() {
                        field.name = value;
                    }
                }
            }
        }
    }

    if let Some(fill) = &model.fill {
        let range = model.time_range.align_start(fill.interval);
        match resample(&frame, fill, range.from, range.to) {
            Ok(resampled) => frame = resampled,
            Err(err) => {
                tracing::error!(error = %err, "Failed to resample dataframe");
                frame.append_notice(Notice::warning("Failed to resample dataframe"));
            }
        }
    }

    Ok(frame)
}
