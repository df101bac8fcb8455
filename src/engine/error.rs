//! Engine error types
//!
//! Every variant maps to an [`ErrorSource`]: failures of the external
//! database are `Downstream`, everything the engine itself rejects or fails to
//! build is `Plugin`.

use crate::frame::FrameError;
use crate::macros::MacroError;
use crate::query::ErrorSource;
use thiserror::Error;

/// Errors that can occur while serving a query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Macro interpolation failed (bad arguments, unknown macro, refused statement)
    #[error(transparent)]
    Interpolation(#[from] MacroError),

    /// The database failed the statement; the message is already transformed
    #[error("{0}")]
    Query(String),

    /// A time-series query produced no time column
    #[error("no time column found")]
    NoTimeColumn,

    /// Rows could not be turned into a frame
    #[error("failed to materialize rows: {0}")]
    Materialize(String),

    /// A value column could not be coerced to float
    #[error("failed to convert to float: {0}")]
    ConvertToFloat(FrameError),

    /// Long-to-wide pivot failed
    #[error("failed to convert long to wide series when converting from dataframe: {0}")]
    LongToWide(FrameError),

    /// A time column held values that are not timestamps
    #[error("failed to convert time column: {0}")]
    TimeConversion(FrameError),

    /// The request was canceled before the query finished
    #[error("query canceled")]
    Canceled,

    /// A query task panicked
    #[error("{0}")]
    Panic(String),

    /// A query task was aborted before it produced a response
    #[error("query task aborted")]
    TaskAborted,

    /// The caller supplied fill settings in the query body
    #[error("query fill-parameters not supported")]
    FillParamsNotSupported,

    /// The query body is not valid JSON for this engine
    #[error("error unmarshal query json: {0}")]
    InvalidQueryJson(String),
}

impl EngineError {
    /// Who the error is attributed to
    pub fn source(&self) -> ErrorSource {
        match self {
            EngineError::Query(_) | EngineError::NoTimeColumn | EngineError::Canceled => {
                ErrorSource::Downstream
            }
            _ => ErrorSource::Plugin,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_source() {
        assert_eq!(EngineError::Query("boom".into()).source(), ErrorSource::Downstream);
        assert_eq!(EngineError::NoTimeColumn.source(), ErrorSource::Downstream);
        assert_eq!(EngineError::Canceled.source(), ErrorSource::Downstream);
        assert_eq!(
            EngineError::from(MacroError::UnknownMacro("__x".into())).source(),
            ErrorSource::Plugin
        );
        assert_eq!(EngineError::ConvertToFloat(FrameError::NotTimeSeries).source(), ErrorSource::Plugin);
        assert_eq!(EngineError::TaskAborted.source(), ErrorSource::Plugin);
    }

    #[test]
    fn test_interpolation_error_is_transparent() {
        let err = EngineError::from(MacroError::UnknownMacro("__x".into()));
        assert_eq!(err.to_string(), "unknown macro __x");
    }
}
