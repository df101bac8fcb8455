//! Database access
//!
//! The engine never talks to a driver directly. It goes through two traits:
//!
//! - [`DbConnection`]: a pooled, shareable handle that runs statements
//! - [`RowCursor`]: the streamed result of one statement
//!
//! A rusqlite-backed [`SqliteConnection`] ships with the crate; other drivers
//! plug in by implementing the same traits.
//!
//! # Data flow
//!
//! ```text
//! SQL → DbConnection::query → RowCursor { columns, next_row()* } → Materializer
//! ```

mod error;
mod sqlite;
mod value;

pub use error::{DbError, DbResult};
pub use sqlite::SqliteConnection;
pub use value::Value;

use crate::frame::FieldType;
use async_trait::async_trait;

/// Metadata for one result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name as returned by the database
    pub name: String,
    /// Declared database type name, upper-cased (empty when unknown)
    pub database_type_name: String,
    /// Field type the driver scans into, when the declared type settles it
    pub scan_type: Option<FieldType>,
}

impl ColumnInfo {
    pub fn new(
        name: impl Into<String>,
        database_type_name: impl Into<String>,
        scan_type: Option<FieldType>,
    ) -> Self {
        Self {
            name: name.into(),
            database_type_name: database_type_name.into().to_uppercase(),
            scan_type,
        }
    }
}

/// A connection handle that is safe to share between concurrent queries
///
/// Pool sizing and lifetime belong to the implementation.
#[async_trait]
pub trait DbConnection: Send + Sync {
    /// Run a statement and return a cursor over its rows
    async fn query(&self, sql: &str) -> DbResult<Box<dyn RowCursor>>;

    /// Connectivity check
    async fn ping(&self) -> DbResult<()>;
}

/// Streamed rows of one executed statement
#[async_trait]
pub trait RowCursor: Send {
    /// Column metadata, available before the first row is fetched
    fn columns(&self) -> &[ColumnInfo];

    /// Fetch the next row, `None` once the result is exhausted
    async fn next_row(&mut self) -> DbResult<Option<Vec<Value>>>;
}
