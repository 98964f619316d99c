//! Integration tests for script execution, variables and joins.
//!
//! Every test runs against in-memory SQLite databases, so no external
//! service is needed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use stax_core::backend::BoxFuture;
use stax_core::normalize::RowSet;
use stax_core::{
    Backend, BackendError, BackendResult, CoreError, DatabaseSpec, DisplayMode, Driver, Record,
    Session, SharedState, Value,
};

/// Builds shared state with the given in-memory SQLite databases connected.
async fn connected(names: &[&str]) -> Arc<SharedState> {
    let databases: BTreeMap<String, DatabaseSpec> = names
        .iter()
        .map(|n| (n.to_string(), DatabaseSpec::new("sqlite", ":memory:")))
        .collect();
    let shared = Arc::new(SharedState::new(databases, None));
    for (name, result) in shared.connect_all().await {
        assert!(result.is_ok(), "{} failed to connect: {:?}", name, result);
    }
    shared
}

fn record(pairs: &[(&str, Value)]) -> Record {
    pairs.iter().cloned().collect()
}

#[tokio::test]
async fn test_one_table_per_statement() {
    let shared = connected(&["local"]).await;
    let result = shared
        .executor()
        .execute("local", "select 1; select 2 as two -- trailing comment\n; ")
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0], vec![record(&[("1", Value::Int(1))])]);
    assert_eq!(result[1], vec![record(&[("two", Value::Int(2))])]);
}

#[tokio::test]
async fn test_failing_statement_is_isolated() {
    let shared = connected(&["local"]).await;
    let outcome = shared
        .executor()
        .execute_detailed("local", "select 1; select * from missing_table; select 3")
        .await
        .unwrap();

    assert_eq!(outcome.statement_count(), 3);
    assert_eq!(outcome.tables.len(), 2);
    assert_eq!(outcome.tables[0], vec![record(&[("1", Value::Int(1))])]);
    assert_eq!(outcome.tables[1], vec![record(&[("3", Value::Int(3))])]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);
    assert!(outcome.failures[0].statement.contains("missing_table"));
}

#[tokio::test]
async fn test_mutations_yield_empty_tables() {
    let shared = connected(&["local"]).await;
    let result = shared
        .executor()
        .execute(
            "local",
            "create table t (id integer, name text);\n\
             insert into t values (1, 'a;b');\n\
             select name from t",
        )
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    assert!(result[0].is_empty());
    assert!(result[1].is_empty());
    assert_eq!(result[2], vec![record(&[("name", Value::from("a;b"))])]);
}

#[tokio::test]
async fn test_unknown_database() {
    let shared = connected(&["local"]).await;
    let err = shared.executor().execute("nope", "select 1").await.unwrap_err();
    assert!(matches!(err, CoreError::UnknownDatabase(name) if name == "nope"));
}

#[tokio::test]
async fn test_unusable_database() {
    let mut databases = BTreeMap::new();
    databases.insert("broken".to_string(), DatabaseSpec::new("oracle", "x"));
    let shared = Arc::new(SharedState::new(databases, None));

    let results = shared.connect_all().await;
    assert!(results[0].1.is_err());

    let err = shared.executor().execute("broken", "select 1").await.unwrap_err();
    assert!(matches!(err, CoreError::Unusable { .. }));
}

#[tokio::test]
async fn test_set_get_variable() {
    let shared = connected(&["local"]).await;
    let session = Session::new(shared, "local", DisplayMode::Default);

    session.set_variable("t", "select 1").await.unwrap();
    assert_eq!(
        session.get_variable("t"),
        vec![vec![record(&[("1", Value::Int(1))])]]
    );

    assert!(session.unset_variable("t"));
    assert!(session.get_variable("t").is_empty());
}

#[tokio::test]
async fn test_variables_shared_between_sessions() {
    let shared = connected(&["local"]).await;
    let first = Session::new(Arc::clone(&shared), "local", DisplayMode::Default);
    let second = Session::new(shared, "local", DisplayMode::Json);

    first.set_variable("t", "select 'x' as v").await.unwrap();
    assert_eq!(
        second.get_variable("t"),
        vec![vec![record(&[("v", Value::from("x"))])]]
    );
}

#[tokio::test]
async fn test_join_across_databases() {
    let shared = connected(&["users", "orders"]).await;
    let mut session = Session::new(shared, "users", DisplayMode::Default);

    session
        .set_variable("u", "select 'ALICE' as name, 1 as uid union all select 'bob', 2")
        .await
        .unwrap();
    session.use_database("orders").unwrap();
    session
        .set_variable("o", "select ' alice ' as name, 'book' as item")
        .await
        .unwrap();

    let joined = session.join_variables("u", "o", &["name".to_string()]);
    assert_eq!(
        joined,
        vec![record(&[
            ("item", Value::from("book")),
            ("name", Value::from(" alice ")),
            ("uid", Value::Int(1)),
        ])]
    );
}

#[tokio::test]
async fn test_join_unbound_is_empty() {
    let shared = connected(&["local"]).await;
    let session = Session::new(shared, "local", DisplayMode::Default);
    assert!(session.join_variables("a", "b", &["k".to_string()]).is_empty());
}

#[tokio::test]
async fn test_render_in_session_mode() {
    let shared = connected(&["local"]).await;
    let mut session = Session::new(shared, "local", DisplayMode::Default);

    let outcome = session.execute("select 1").await.unwrap();
    assert_eq!(session.render(&outcome.tables), "1: 1\n\n(1 row returned)\n");

    session.set_mode(DisplayMode::Csv);
    assert_eq!(session.render(&outcome.tables), "1\n1\n");
}

#[tokio::test]
async fn test_materialize_into_main() {
    let shared = connected(&["main", "source"]).await;
    let session = Session::new(Arc::clone(&shared), "source", DisplayMode::Default);

    let created = session
        .materialize("tmp", "select 1 as a, 'x' as b; select 2 as c")
        .await
        .unwrap();
    assert_eq!(created, vec!["tmp00", "tmp01"]);

    let rows = shared
        .executor()
        .execute("main", "select _id, a, b from tmp00")
        .await
        .unwrap();
    assert_eq!(
        rows[0],
        vec![record(&[
            ("_id", Value::Int(1)),
            ("a", Value::from("1")),
            ("b", Value::from("x")),
        ])]
    );
}

#[tokio::test]
async fn test_materialize_keeps_result_id_column() {
    let shared = connected(&["main"]).await;
    let session = Session::new(Arc::clone(&shared), "main", DisplayMode::Default);

    session
        .materialize("t", "select 7 as _id, 'x' as name")
        .await
        .unwrap();
    let created = session.materialize("again", "select * from t00").await.unwrap();
    assert_eq!(created, vec!["again00"]);

    let rows = shared
        .executor()
        .execute("main", "select * from again00")
        .await
        .unwrap();
    assert_eq!(
        rows[0],
        vec![record(&[
            ("_id", Value::Int(1)),
            ("_id_1", Value::from("7")),
            ("_id_2", Value::from("1")),
            ("name", Value::from("x")),
        ])]
    );
}

#[tokio::test]
async fn test_materialize_requires_main() {
    let shared = connected(&["source"]).await;
    let session = Session::new(shared, "source", DisplayMode::Default);
    let err = session.materialize("tmp", "select 1").await.unwrap_err();
    assert!(matches!(err, CoreError::UnknownDatabase(name) if name == "main"));
}

/// Backend whose queries never finish in time.
struct StalledBackend;

impl Backend for StalledBackend {
    fn driver(&self) -> Driver {
        Driver::Sqlite
    }

    fn query<'a>(&'a self, _sql: &'a str) -> BoxFuture<'a, BackendResult<RowSet>> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(RowSet::empty())
        })
    }

    fn ping(&self) -> BoxFuture<'_, BackendResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[tokio::test]
async fn test_statement_timeout() {
    let shared = SharedState::new(BTreeMap::new(), Some(Duration::from_millis(20)));
    shared.registry().put("slow", Arc::new(StalledBackend));

    let outcome = shared
        .executor()
        .execute_detailed("slow", "select 1; select 2")
        .await
        .unwrap();
    assert!(outcome.tables.is_empty());
    assert_eq!(outcome.failures.len(), 2);
    assert!(matches!(outcome.failures[0].error, BackendError::Timeout(_)));
}

#[tokio::test]
async fn test_alias_main() {
    let shared = connected(&["local"]).await;
    shared.registry().alias("main", "local").unwrap();

    let session = Session::new(Arc::clone(&shared), "local", DisplayMode::Default);
    session.execute("create table t (x integer)").await.unwrap();

    let rows = shared.executor().execute("main", "select count(*) as n from t").await.unwrap();
    assert_eq!(rows[0], vec![record(&[("n", Value::Int(0))])]);
}

#[tokio::test]
async fn test_run_file_as_one_script() {
    let shared = connected(&["local"]).await;
    let session = Session::new(shared, "local", DisplayMode::Default);

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("script.sql");
    std::fs::write(
        &path,
        "-- setup\ncreate table t (n integer);\ninsert into t values (1);\ninsert into t values (2);\nselect sum(n) as total from t;\n",
    )
    .unwrap();

    let outcome = session.run_file(&path).await.unwrap();
    assert_eq!(outcome.tables.len(), 4);
    assert_eq!(outcome.tables[3], vec![record(&[("total", Value::Int(3))])]);

    let err = session.run_file(dir.path().join("missing.sql")).await.unwrap_err();
    assert!(matches!(err, CoreError::Io(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_share_handle() {
    let shared = connected(&["local"]).await;
    let template = Session::new(Arc::clone(&shared), "local", DisplayMode::Default);

    let mut handles = Vec::new();
    for i in 0..8i64 {
        let session = template.clone();
        handles.push(tokio::spawn(async move {
            let script = format!(
                "create table t{i} (n integer);\n\
                 insert into t{i} values ({i});\n\
                 select n, 'task{i}' as label from t{i}"
            );
            let outcome = session.execute(&script).await.unwrap();
            assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
            assert_eq!(
                outcome.tables[2],
                vec![record(&[
                    ("label", Value::from(format!("task{i}").as_str())),
                    ("n", Value::Int(i)),
                ])]
            );

            for _ in 0..10 {
                session
                    .set_variable(&format!("v{i}"), &format!("select {i} as v"))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for i in 0..8i64 {
        assert!(shared.variables().contains(&format!("v{i}")));
        assert_eq!(
            template.get_variable(&format!("v{i}")),
            vec![vec![record(&[("v", Value::Int(i))])]]
        );
    }
}
