//! Database backends.
//!
//! A backend is one live handle to one database engine. The shell talks to
//! every engine through the [`Backend`] trait, so the registry can hold
//! SQLite and PostgreSQL handles side by side.
//!
//! # Supported drivers
//!
//! | Identifier                       | Engine     | Connection string            |
//! |----------------------------------|------------|------------------------------|
//! | `sqlite`, `sqlite3`              | SQLite     | file path or `:memory:`      |
//! | `postgres`, `postgresql`, `pg`   | PostgreSQL | libpq key/value or URL form  |

mod postgres;
mod sqlite;

pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{BackendError, BackendResult};
use crate::normalize::RowSet;

/// Boxed future returned by backend operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Database engine behind a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    /// SQLite through rusqlite.
    Sqlite,
    /// PostgreSQL through tokio-postgres.
    Postgres,
}

impl Driver {
    /// Resolves a configuration driver identifier.
    pub fn parse(id: &str) -> BackendResult<Self> {
        match id.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Driver::Postgres),
            _ => Err(BackendError::UnsupportedDriver(id.to_string())),
        }
    }

    /// Returns the canonical identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
            Driver::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live connection to one database.
///
/// Implementations must be safe to share between sessions. Engines whose
/// handles cannot run statements concurrently serialize internally.
pub trait Backend: Send + Sync {
    /// Returns the engine behind this handle.
    fn driver(&self) -> Driver;

    /// Runs one statement and drains every row it returns.
    ///
    /// Statements without a result (DDL, DML) return an empty row set.
    fn query<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, BackendResult<RowSet>>;

    /// Liveness probe.
    fn ping(&self) -> BoxFuture<'_, BackendResult<()>>;
}

/// Opens a backend for a driver and a fully interpolated connection string.
pub async fn open(driver: Driver, connstr: &str) -> BackendResult<Arc<dyn Backend>> {
    match driver {
        Driver::Sqlite => Ok(Arc::new(SqliteBackend::open(connstr)?)),
        Driver::Postgres => Ok(Arc::new(PostgresBackend::connect(connstr).await?)),
    }
}
