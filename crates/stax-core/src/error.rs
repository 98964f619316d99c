//! Error types for the shell core.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a database backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// SQLite driver error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL driver error.
    #[error("postgres: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// The configured driver identifier is not supported.
    #[error("unsupported driver '{0}'")]
    UnsupportedDriver(String),

    /// A column value could not be decoded.
    #[error("cannot decode column '{column}': {reason}")]
    Decode {
        /// Column name.
        column: String,
        /// Why decoding failed.
        reason: String,
    },

    /// The statement exceeded the configured deadline.
    #[error("statement timed out after {0:?}")]
    Timeout(Duration),

    /// The connection has been closed.
    #[error("connection closed")]
    Closed,

    /// A blocking worker panicked or was cancelled.
    #[error("worker failed: {0}")]
    Worker(String),
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors surfaced by the core to the command layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No connection is registered under this name.
    #[error("unknown database '{0}'")]
    UnknownDatabase(String),

    /// The connection is registered but failed to open or probe.
    #[error("database '{name}' is unusable: {reason}")]
    Unusable {
        /// Logical database name.
        name: String,
        /// Failure recorded at connect time.
        reason: String,
    },

    /// Configuration could not be parsed or is incomplete.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Backend failure outside of per-statement execution.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
