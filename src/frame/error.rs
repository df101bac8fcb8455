//! Frame error types
//!
//! Errors raised while building or transforming columnar frames.

use thiserror::Error;

/// Errors that can occur while building or reshaping a frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// A value did not fit the field's type
    #[error("field {field}: cannot store {found} value in {expected} field")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// A field cannot be converted to the requested type
    #[error("field {field}: unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        field: String,
        from: String,
        to: String,
    },

    /// Text could not be parsed into a timestamp
    #[error("field {field}: cannot parse '{value}' as a timestamp")]
    InvalidTimestamp { field: String, value: String },

    /// Frame is not shaped like a time series
    #[error("can not fill missing, not timeseries frame")]
    NotTimeSeries,

    /// Long-to-wide was asked for a frame that is not long
    #[error("can not convert to wide series, input is not a long series")]
    NotLong,

    /// Long frames must be ordered by time
    #[error("long series must be sorted ascending by time to be converted")]
    Unsorted,

    /// A time value was null where one is required
    #[error("time point is nil")]
    NullTime,
}

/// Result type for frame operations
pub type FrameResult<T> = Result<T, FrameError>;
