//! Macro error types
//!
//! Every error here is raised before a statement reaches the database.

use thiserror::Error;

/// Errors that can occur while interpolating macros
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MacroError {
    /// The statement uses a construct the engine refuses to run
    #[error("invalid query - {0}")]
    Restricted(String),

    /// A macro was called with fewer arguments than it needs
    #[error("missing argument for macro {name}: expected {expected}")]
    MissingArgument { name: String, expected: &'static str },

    /// The interval argument is not a duration
    #[error("error parsing interval {0}")]
    InvalidInterval(String),

    /// The fill argument is neither NULL, previous, nor a number
    #[error("error parsing fill value {0}")]
    InvalidFillValue(String),

    /// No macro with this name exists for the dialect
    #[error("unknown macro {0}")]
    UnknownMacro(String),
}

impl MacroError {
    pub fn missing(name: &str, expected: &'static str) -> Self {
        MacroError::MissingArgument {
            name: name.to_string(),
            expected,
        }
    }
}

/// Result type for macro operations
pub type MacroResult<T> = Result<T, MacroError>;
