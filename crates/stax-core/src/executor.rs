//! Script execution.
//!
//! A script is cleaned, split into statements, and every statement runs in
//! order against one named connection. A failing statement is logged and
//! skipped; its siblings still run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{BackendError, CoreResult};
use crate::record::ResultSet;
use crate::registry::ConnectionRegistry;
use crate::sql;

/// A statement that failed during script execution.
#[derive(Debug)]
pub struct StatementFailure {
    /// Zero-based position among the script's statements.
    pub index: usize,
    /// The cleaned statement text.
    pub statement: String,
    /// The backend error.
    pub error: BackendError,
}

/// Everything produced by one script.
#[derive(Debug, Default)]
pub struct ScriptOutcome {
    /// One table per successful statement, in order.
    pub tables: ResultSet,
    /// Statements that failed, in order.
    pub failures: Vec<StatementFailure>,
    /// Wall time for the whole script.
    pub elapsed: Duration,
}

impl ScriptOutcome {
    /// Returns the number of statements attempted.
    pub fn statement_count(&self) -> usize {
        self.tables.len() + self.failures.len()
    }
}

/// Runs scripts against registered connections.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    registry: Arc<ConnectionRegistry>,
    timeout: Option<Duration>,
}

impl QueryExecutor {
    /// Creates an executor without a statement deadline.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    /// Sets a per-statement deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the registry this executor resolves names against.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Executes a script and returns one table per successful statement.
    pub async fn execute(&self, database: &str, script: &str) -> CoreResult<ResultSet> {
        Ok(self.execute_detailed(database, script).await?.tables)
    }

    /// Executes a script and also reports the statements that failed.
    pub async fn execute_detailed(&self, database: &str, script: &str) -> CoreResult<ScriptOutcome> {
        let backend = self.registry.get(database)?;
        let start = Instant::now();
        let mut outcome = ScriptOutcome::default();

        for (index, statement) in sql::statements(script).into_iter().enumerate() {
            debug!("[{}] executing statement {}: {}", database, index, statement);

            let result = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, backend.query(&statement))
                    .await
                    .unwrap_or(Err(BackendError::Timeout(limit))),
                None => backend.query(&statement).await,
            };

            match result {
                Ok(rows) => outcome.tables.push(rows.into_table()),
                Err(error) => {
                    warn!("[{}] statement {} failed: {}", database, index, error);
                    outcome.failures.push(StatementFailure {
                        index,
                        statement,
                        error,
                    });
                }
            }
        }

        outcome.elapsed = start.elapsed();
        Ok(outcome)
    }
}
