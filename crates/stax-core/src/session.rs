//! Shell state shared between sessions, and per-session context.
//!
//! [`SharedState`] owns the connection registry, the variable store and the
//! configured database entries; every console or remote session holds an
//! `Arc` to it. A [`Session`] adds the state that belongs to one command
//! stream: the current database, the display mode and the timing toggle.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::DatabaseSpec;
use crate::error::{CoreError, CoreResult};
use crate::executor::{QueryExecutor, ScriptOutcome};
use crate::join;
use crate::record::{table_columns, Record, ResultSet, ResultTable};
use crate::registry::ConnectionRegistry;
use crate::render::{self, DisplayMode};
use crate::value::Value;
use crate::variables::VariableStore;

/// Name of the database that receives materialized tables.
pub const MAIN_DATABASE: &str = "main";

/// State shared by every session of one process.
#[derive(Debug)]
pub struct SharedState {
    registry: Arc<ConnectionRegistry>,
    variables: VariableStore,
    executor: QueryExecutor,
    databases: RwLock<BTreeMap<String, DatabaseSpec>>,
}

impl SharedState {
    /// Creates shared state for the given database entries. Nothing is
    /// connected until [`SharedState::connect_all`] runs.
    pub fn new(databases: BTreeMap<String, DatabaseSpec>, timeout: Option<Duration>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let executor = QueryExecutor::new(Arc::clone(&registry)).with_timeout(timeout);
        Self {
            registry,
            variables: VariableStore::new(),
            executor,
            databases: RwLock::new(databases),
        }
    }

    /// Connects (or reconnects) every configured database.
    pub async fn connect_all(&self) -> Vec<(String, CoreResult<()>)> {
        let databases = self.databases.read().clone();
        info!("Connecting {} database(s)", databases.len());
        self.registry.connect_all(&databases).await
    }

    /// Returns the connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Returns the variable store.
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    /// Returns the query executor.
    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }
}

/// One command stream's context.
#[derive(Debug, Clone)]
pub struct Session {
    shared: Arc<SharedState>,
    current: String,
    mode: DisplayMode,
    timing: bool,
}

impl Session {
    /// Creates a session.
    pub fn new(shared: Arc<SharedState>, current: impl Into<String>, mode: DisplayMode) -> Self {
        Self {
            shared,
            current: current.into(),
            mode,
            timing: false,
        }
    }

    /// Returns the shared state.
    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Returns the current database name.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Switches the current database.
    ///
    /// The name is stored even when nothing is registered under it; the
    /// error is returned so the caller can warn, and queries will fail with
    /// `UnknownDatabase` until the name becomes valid.
    pub fn use_database(&mut self, name: impl Into<String>) -> CoreResult<()> {
        self.current = name.into();
        if self.shared.registry.contains(&self.current) {
            Ok(())
        } else {
            Err(CoreError::UnknownDatabase(self.current.clone()))
        }
    }

    /// Returns the display mode.
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Sets the display mode.
    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    /// Returns whether script timings are shown.
    pub fn timing(&self) -> bool {
        self.timing
    }

    /// Turns script timings on or off.
    pub fn set_timing(&mut self, on: bool) {
        self.timing = on;
    }

    /// Runs a script against the current database.
    pub async fn execute(&self, script: &str) -> CoreResult<ScriptOutcome> {
        self.shared.executor.execute_detailed(&self.current, script).await
    }

    /// Reads a script file and runs it as one script.
    pub async fn run_file(&self, path: impl AsRef<Path>) -> CoreResult<ScriptOutcome> {
        let script = tokio::fs::read_to_string(path.as_ref()).await?;
        debug!("Running {} ({} bytes)", path.as_ref().display(), script.len());
        self.execute(&script).await
    }

    /// Renders a result set in this session's mode.
    pub fn render(&self, result: &ResultSet) -> String {
        render::render(result, self.mode)
    }

    /// Runs a script and binds its tables under `name`.
    ///
    /// Returns the execution outcome with its tables moved into the store.
    pub async fn set_variable(&self, name: &str, script: &str) -> CoreResult<ScriptOutcome> {
        let mut outcome = self.execute(script).await?;
        let tables = std::mem::take(&mut outcome.tables);
        debug!("Binding {} table(s) to '{}'", tables.len(), name);
        self.shared.variables.set(name, tables);
        Ok(outcome)
    }

    /// Returns a bound result set, empty when unbound.
    pub fn get_variable(&self, name: &str) -> ResultSet {
        self.shared.variables.get(name)
    }

    /// Removes a binding.
    pub fn unset_variable(&self, name: &str) -> bool {
        self.shared.variables.unset(name)
    }

    /// Joins the first tables of two bound variables.
    pub fn join_variables(&self, left: &str, right: &str, columns: &[String]) -> ResultTable {
        let left = self.get_variable(left);
        let right = self.get_variable(right);
        match (left.first(), right.first()) {
            (Some(l), Some(r)) => join::join(l, r, columns),
            _ => Vec::new(),
        }
    }

    /// Runs a script against the current database and copies each result
    /// table into the `main` database as `<prefix>NN`.
    ///
    /// Every table gets an integer `_id` key and one text column per result
    /// column. A result column that clashes with `_id` is stored as `_id_1`
    /// (or the next free suffix). Returns the created table names.
    pub async fn materialize(&self, prefix: &str, script: &str) -> CoreResult<Vec<String>> {
        let main = self.shared.registry.get(MAIN_DATABASE)?;
        let outcome = self.execute(script).await?;

        let mut created = Vec::new();
        for (i, table) in outcome.tables.iter().enumerate() {
            let name = format!("{}{:02}", prefix, i);
            let columns = table_columns(table);

            main.query(&create_table_sql(&name, &columns)).await?;
            for (id, record) in table.iter().enumerate() {
                main.query(&insert_sql(&name, &columns, id + 1, record)).await?;
            }
            info!("Materialized {} row(s) into main.{}", table.len(), name);
            created.push(name);
        }
        Ok(created)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

/// Picks the stored name of each result column. Identifiers compare
/// case-insensitively, so `_ID` clashes with the key column too.
fn stored_columns(columns: &[String]) -> Vec<String> {
    let mut stored: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        if !column.eq_ignore_ascii_case("_id") {
            stored.push(column.clone());
            continue;
        }
        let taken = |name: &str| {
            columns
                .iter()
                .chain(stored.iter())
                .any(|c| c.eq_ignore_ascii_case(name))
        };
        let mut n = 1;
        while taken(&format!("_id_{}", n)) {
            n += 1;
        }
        stored.push(format!("_id_{}", n));
    }
    stored
}

fn create_table_sql(table: &str, columns: &[String]) -> String {
    let mut defs = vec!["_id integer not null primary key".to_string()];
    defs.extend(
        stored_columns(columns)
            .iter()
            .map(|c| format!("{} text", quote_ident(c))),
    );
    format!("create table {} ({})", quote_ident(table), defs.join(", "))
}

fn insert_sql(table: &str, columns: &[String], id: usize, record: &Record) -> String {
    let mut values = vec![id.to_string()];
    values.extend(
        columns
            .iter()
            .map(|c| quote_literal(record.get(c).unwrap_or(&Value::Null))),
    );
    format!("insert into {} values ({})", quote_ident(table), values.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("t00", &["first name".to_string(), "id".to_string()]);
        assert_eq!(
            sql,
            "create table \"t00\" (_id integer not null primary key, \"first name\" text, \"id\" text)"
        );
    }

    #[test]
    fn test_key_column_clash_is_renamed() {
        let sql = create_table_sql("t", &["_id".to_string(), "name".to_string()]);
        assert_eq!(
            sql,
            "create table \"t\" (_id integer not null primary key, \"_id_1\" text, \"name\" text)"
        );

        let columns = vec!["_ID".to_string(), "_id_1".to_string()];
        assert_eq!(stored_columns(&columns), vec!["_id_2", "_id_1"]);
    }

    #[test]
    fn test_insert_sql_escapes() {
        let record: Record = [("a", Value::from("it's")), ("b", Value::Int(3))].into_iter().collect();
        let columns = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(
            insert_sql("t", &columns, 1, &record),
            "insert into \"t\" values (1, 'it''s', '3', NULL)"
        );
    }

    #[tokio::test]
    async fn test_use_unknown_still_switches() {
        let shared = Arc::new(SharedState::new(BTreeMap::new(), None));
        let mut session = Session::new(shared, "", DisplayMode::Default);

        let result = session.use_database("ghost");
        assert!(matches!(result, Err(CoreError::UnknownDatabase(_))));
        assert_eq!(session.current(), "ghost");

        let err = session.execute("select 1").await.unwrap_err();
        assert!(matches!(err, CoreError::UnknownDatabase(name) if name == "ghost"));
    }
}
