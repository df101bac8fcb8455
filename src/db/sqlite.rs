//! SQLite connection backed by rusqlite
//!
//! rusqlite is synchronous, so statements run on tokio's blocking pool and rows
//! are streamed back to the async cursor through a bounded channel. Dropping
//! the cursor closes the channel, which stops the producer at its next row.
//! A statement still stepping when its cursor or query future is dropped is
//! interrupted, so it releases its pooled connection.
//!
//! # Pooling
//!
//! A file database opens `max_open_conns` connections and hands them out
//! round-robin. An in-memory database is private to its connection, so it
//! always uses a single one.

use super::{ColumnInfo, DbConnection, DbError, DbResult, RowCursor, Value};
use crate::config::DataSourceInfo;
use crate::frame::FieldType;
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, InterruptHandle, OpenFlags, Statement};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Rows buffered between the blocking producer and the async cursor
const ROW_BUFFER: usize = 256;

const IN_MEMORY: &str = ":memory:";

/// Pooled SQLite connection
pub struct SqliteConnection {
    pool: Vec<Slot>,
    next: AtomicUsize,
}

/// One pooled connection and the handle that interrupts it from another thread
#[derive(Clone)]
struct Slot {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
}

impl Slot {
    fn new(conn: Connection) -> Self {
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
        }
    }
}

impl SqliteConnection {
    /// Open a database file with up to `max_open_conns` connections
    pub fn open(path: impl AsRef<Path>, max_open_conns: usize) -> DbResult<Self> {
        let path = path.as_ref();
        if path == Path::new(IN_MEMORY) {
            return Self::open_in_memory();
        }

        let size = max_open_conns.max(1);
        let mut pool = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| DbError::Connection(e.to_string()))?;
            conn.busy_timeout(Duration::from_secs(5))
                .map_err(|e| DbError::Connection(e.to_string()))?;
            pool.push(Slot::new(conn));
        }

        tracing::debug!(path = ?path, connections = size, "Opened SQLite pool");
        Ok(Self {
            pool,
            next: AtomicUsize::new(0),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(Self {
            pool: vec![Slot::new(conn)],
            next: AtomicUsize::new(0),
        })
    }

    /// Open the database named by a datasource's URL
    pub fn from_info(info: &DataSourceInfo) -> DbResult<Self> {
        let path = if info.url.is_empty() {
            IN_MEMORY
        } else {
            info.url.as_str()
        };
        Self::open(path, info.json_data.max_open_conns)
    }

    /// Run one or more statements without reading results (schema setup, seeding)
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let slot = self.pick();
        let guard = slot.conn.lock().map_err(|e| DbError::Lock(e.to_string()))?;
        guard.execute_batch(sql)?;
        Ok(())
    }

    fn pick(&self) -> Slot {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        self.pool[idx].clone()
    }
}

#[async_trait]
impl DbConnection for SqliteConnection {
    async fn query(&self, sql: &str) -> DbResult<Box<dyn RowCursor>> {
        let slot = self.pick();
        let sql = sql.to_string();
        let (columns_tx, columns_rx) = oneshot::channel();
        let (rows_tx, rows_rx) = mpsc::channel(ROW_BUFFER);

        let running = Arc::new(Mutex::new(false));
        let interrupt = InterruptOnDrop {
            handle: Arc::clone(&slot.interrupt),
            running: Arc::clone(&running),
        };

        tokio::task::spawn_blocking(move || {
            let guard = match slot.conn.lock() {
                Ok(guard) => guard,
                Err(e) => {
                    let _ = columns_tx.send(Err(DbError::Lock(e.to_string())));
                    return;
                }
            };
            let _running = Running::start(&running);
            let mut stmt = match guard.prepare(&sql) {
                Ok(stmt) => stmt,
                Err(e) => {
                    let _ = columns_tx.send(Err(e.into()));
                    return;
                }
            };

            let columns = describe_columns(&stmt);
            let column_count = columns.len();
            if columns_tx.send(Ok(columns)).is_err() {
                return;
            }

            if rows_tx.is_closed() {
                return;
            }
            let mut rows = match stmt.query([]) {
                Ok(rows) => rows,
                Err(e) => {
                    let _ = rows_tx.blocking_send(Err(e.into()));
                    return;
                }
            };

            loop {
                let item = match rows.next() {
                    Ok(Some(row)) => (0..column_count)
                        .map(|i| row.get_ref(i).map(value_from_ref))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(DbError::from),
                    Ok(None) => break,
                    Err(e) => Err(e.into()),
                };
                let failed = item.is_err();
                // Receiver gone: the cursor was dropped (row limit, cancellation).
                if rows_tx.blocking_send(item).is_err() || failed {
                    break;
                }
            }
        });

        let columns = columns_rx
            .await
            .map_err(|_| DbError::Connection("sqlite worker exited before describing columns".into()))??;

        Ok(Box::new(SqliteRows {
            columns,
            rows: rows_rx,
            _interrupt: interrupt,
        }))
    }

    async fn ping(&self) -> DbResult<()> {
        let slot = self.pick();
        tokio::task::spawn_blocking(move || -> DbResult<()> {
            let guard = slot.conn.lock().map_err(|e| DbError::Lock(e.to_string()))?;
            guard.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
        .map_err(|e| DbError::Connection(e.to_string()))?
    }
}

/// Interrupts the query's statement if it is still running when dropped
///
/// `running` is only true while the query's worker holds the connection, so a
/// later statement on the same slot is never hit.
struct InterruptOnDrop {
    handle: Arc<InterruptHandle>,
    running: Arc<Mutex<bool>>,
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if let Ok(running) = self.running.lock() {
            if *running {
                tracing::debug!("Interrupting abandoned SQLite statement");
                self.handle.interrupt();
            }
        }
    }
}

/// Marks a worker as holding its connection until dropped
struct Running<'a>(&'a Mutex<bool>);

impl<'a> Running<'a> {
    fn start(flag: &'a Mutex<bool>) -> Self {
        if let Ok(mut running) = flag.lock() {
            *running = true;
        }
        Self(flag)
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        if let Ok(mut running) = self.0.lock() {
            *running = false;
        }
    }
}

/// Cursor over rows produced by the blocking worker
struct SqliteRows {
    columns: Vec<ColumnInfo>,
    rows: mpsc::Receiver<DbResult<Vec<Value>>>,
    _interrupt: InterruptOnDrop,
}

#[async_trait]
impl RowCursor for SqliteRows {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn next_row(&mut self) -> DbResult<Option<Vec<Value>>> {
        match self.rows.recv().await {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

fn describe_columns(stmt: &Statement<'_>) -> Vec<ColumnInfo> {
    stmt.columns()
        .iter()
        .map(|col| {
            let decl = col.decl_type().unwrap_or_default();
            ColumnInfo::new(col.name(), decl, scan_type(decl))
        })
        .collect()
}

/// Map a declared type to a field type using SQLite's affinity rules
fn scan_type(decl: &str) -> Option<FieldType> {
    let decl = decl.to_uppercase();
    if decl.is_empty() {
        None
    } else if decl.contains("INT") {
        Some(FieldType::Int64)
    } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
        Some(FieldType::String)
    } else if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
        Some(FieldType::Float64)
    } else if decl.contains("BOOL") {
        Some(FieldType::Bool)
    } else {
        None
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE metrics (ts INTEGER, host VARCHAR(32), value REAL, note TEXT);
             INSERT INTO metrics VALUES (1700000000, 'a', 1.5, NULL);
             INSERT INTO metrics VALUES (1700000060, 'b', 2.5, 'x');",
        )
        .unwrap();
        conn
    }

    async fn collect(cursor: &mut Box<dyn RowCursor>) -> Vec<Vec<Value>> {
        let mut rows = Vec::new();
        while let Some(row) = cursor.next_row().await.unwrap() {
            rows.push(row);
        }
        rows
    }

    #[tokio::test]
    async fn test_query_columns_and_rows() {
        let conn = seeded();
        let mut cursor = conn
            .query("SELECT ts, host, value, note FROM metrics ORDER BY ts")
            .await
            .unwrap();

        let columns = cursor.columns().to_vec();
        assert_eq!(columns[0], ColumnInfo::new("ts", "INTEGER", Some(FieldType::Int64)));
        assert_eq!(columns[1].database_type_name, "VARCHAR(32)");
        assert_eq!(columns[1].scan_type, Some(FieldType::String));
        assert_eq!(columns[2].scan_type, Some(FieldType::Float64));

        let rows = collect(&mut cursor).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![
                Value::Int(1700000000),
                Value::Text("a".into()),
                Value::Float(1.5),
                Value::Null
            ]
        );
    }

    #[tokio::test]
    async fn test_expression_columns_have_no_declared_type() {
        let conn = seeded();
        let mut cursor = conn.query("SELECT avg(value) AS v FROM metrics").await.unwrap();
        assert_eq!(cursor.columns()[0].database_type_name, "");
        assert_eq!(cursor.columns()[0].scan_type, None);
        assert_eq!(collect(&mut cursor).await, vec![vec![Value::Float(2.0)]]);
    }

    #[tokio::test]
    async fn test_syntax_error_is_driver_error() {
        let conn = seeded();
        let err = conn.query("SELEC nothing").await.err().unwrap();
        assert!(matches!(err, DbError::Driver { .. }));
        assert!(err.to_string().contains("syntax error"));
    }

    #[tokio::test]
    async fn test_dropping_cursor_early() {
        let conn = seeded();
        let mut cursor = conn.query("SELECT ts FROM metrics").await.unwrap();
        assert!(cursor.next_row().await.unwrap().is_some());
        drop(cursor);

        // The connection is released once the worker notices the closed channel.
        conn.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropping_cursor_interrupts_running_statement() {
        let conn = seeded();
        // Counts far past any test timeout before yielding its single row.
        let mut cursor = conn
            .query(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 10000000000) \
                 SELECT count(*) FROM c",
            )
            .await
            .unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(200), cursor.next_row()).await;
        assert!(pending.is_err());
        drop(cursor);

        let ping = tokio::time::timeout(Duration::from_secs(5), conn.ping()).await;
        assert!(matches!(ping, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_from_info_reads_url_and_pool_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut info = DataSourceInfo {
            url: dir.path().join("metrics.db").display().to_string(),
            user: "grafana".into(),
            password: "secret".into(),
            ..DataSourceInfo::default()
        };
        info.json_data.max_open_conns = 3;
        info.json_data.ssl_mode = "require".into();
        info.json_data.timezone = Some("Europe/Berlin".into());

        let conn = SqliteConnection::from_info(&info).unwrap();
        assert_eq!(conn.pool.len(), 3);
        conn.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")
            .unwrap();

        // Every pooled connection sees the same file.
        for _ in 0..3 {
            let mut cursor = conn.query("SELECT v FROM t").await.unwrap();
            assert_eq!(cursor.next_row().await.unwrap(), Some(vec![Value::Int(7)]));
        }

        let memory = SqliteConnection::from_info(&DataSourceInfo::default()).unwrap();
        assert_eq!(memory.pool.len(), 1);
    }

    #[test]
    fn test_scan_type_affinity() {
        assert_eq!(scan_type("BIGINT"), Some(FieldType::Int64));
        assert_eq!(scan_type("nvarchar(10)"), Some(FieldType::String));
        assert_eq!(scan_type("DOUBLE PRECISION"), Some(FieldType::Float64));
        assert_eq!(scan_type("DATETIME"), None);
    }
}
