//! SQLite backend.

use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::debug;

use super::{Backend, BoxFuture, Driver};
use crate::error::{BackendError, BackendResult};
use crate::normalize::{RawValue, RowSet};

/// A SQLite database handle.
///
/// `rusqlite::Connection` is not `Sync`, so statements on one handle are
/// serialized and run on the blocking thread pool.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Opens a database file, or an in-memory database for `:memory:` or an
    /// empty path.
    pub fn open(path: &str) -> BackendResult<Self> {
        let path = path.trim();
        let conn = if path.is_empty() || path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        debug!("Opened sqlite database at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run<T, F>(&self, f: F) -> BoxFuture<'_, BackendResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> BackendResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let guard = conn.lock();
                f(&*guard)
            })
            .await
            .map_err(|e| BackendError::Worker(e.to_string()))?
        })
    }
}

impl Backend for SqliteBackend {
    fn driver(&self) -> Driver {
        Driver::Sqlite
    }

    fn query<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, BackendResult<RowSet>> {
        let sql = sql.to_string();
        self.run(move |conn| query_rows(conn, &sql))
    }

    fn ping(&self) -> BoxFuture<'_, BackendResult<()>> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
    }
}

fn query_rows(conn: &Connection, sql: &str) -> BackendResult<RowSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let width = columns.len();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for idx in 0..width {
            cells.push(raw_value(row.get_ref(idx)?));
        }
        out.push(cells);
    }

    Ok(RowSet { columns, rows: out })
}

fn raw_value(value: ValueRef<'_>) -> RawValue {
    match value {
        ValueRef::Null => RawValue::Null,
        ValueRef::Integer(i) => RawValue::Int(i),
        ValueRef::Real(f) => RawValue::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => RawValue::Bytes(bytes.to_vec()),
    }
}
