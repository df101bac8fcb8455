//! Database error types

use thiserror::Error;

/// Errors reported by a database connection or row cursor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    /// Could not open or reach the database
    #[error("Connection error: {0}")]
    Connection(String),

    /// The driver rejected or failed a statement
    ///
    /// `code` is the driver's native error code (MySQL error number,
    /// Postgres SQLSTATE, SQLite result code) when one is available.
    #[error("{message}")]
    Driver {
        code: Option<String>,
        message: String,
    },

    /// A row value could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl DbError {
    /// Build a driver error with a native code
    pub fn driver(code: impl Into<String>, message: impl Into<String>) -> Self {
        DbError::Driver {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Native driver code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            DbError::Driver { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message) => DbError::Driver {
                code: Some(failure.extended_code.to_string()),
                message: message.clone().unwrap_or_else(|| failure.to_string()),
            },
            _ => DbError::Driver {
                code: None,
                message: err.to_string(),
            },
        }
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
