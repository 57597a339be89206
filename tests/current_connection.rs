//! Statement routing through the manager's current connection

mod common;

use std::time::Duration;

use db_txnmgr::{Executor, ManagerConfig, Transaction, TxnError, TxnManager, Value};

use crate::common::{init_tracing, MockDatabase, SLOW_STATEMENT};

#[tokio::test]
async fn test_statements_follow_the_active_transaction() {
    init_tracing();
    let (db, journal) = MockDatabase::new();
    let mgr = TxnManager::new(db);

    mgr.current().execute("INSERT 1", &[]).await.unwrap();

    let mut outer = mgr.begin().await.unwrap();
    outer.current().execute("INSERT 2", &[]).await.unwrap();
    let inner = mgr.begin().await.unwrap();
    inner.current().execute("INSERT 3", &[]).await.unwrap();
    outer.commit().await.unwrap();

    mgr.current().execute("INSERT 4", &[]).await.unwrap();

    assert_eq!(
        journal.events(),
        vec![
            "db: INSERT 1",
            "begin",
            "tx: INSERT 2",
            "tx: INSERT 3",
            "commit",
            "db: INSERT 4",
        ]
    );
}

#[tokio::test]
async fn test_query_passes_arguments_through() {
    let (db, _journal) = MockDatabase::new();
    let mgr = TxnManager::new(db);
    let _outer = mgr.begin().await.unwrap();

    let row = mgr
        .current()
        .query_row("SELECT $1, $2", &[Value::from(7), Value::from("seven")])
        .await
        .unwrap()
        .expect("mock always returns a row");

    assert_eq!(row.get_by_name("arg0"), Some(&Value::Int(7)));
    assert_eq!(row.get_by_name("arg1").and_then(Value::as_str), Some("seven"));

    let rows = mgr.current().query("SELECT 1", &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_view_taken_inside_transaction_expires_with_it() {
    let (db, journal) = MockDatabase::new();
    let mgr = TxnManager::new(db);

    let mut outer = mgr.begin().await.unwrap();
    let view = mgr.current();
    assert!(view.is_transaction());
    outer.rollback().await.unwrap();

    let err = view.execute("INSERT late", &[]).await.unwrap_err();
    assert!(matches!(err, TxnError::AlreadyEnded));
    assert!(!journal.events().iter().any(|e| e.contains("late")));
}

#[tokio::test(start_paused = true)]
async fn test_statement_timeout_from_config() {
    let (db, _journal) = MockDatabase::new();
    let config = ManagerConfig::new().statement_timeout(Duration::from_millis(100));
    let mgr = TxnManager::with_config(db, config);

    let err = mgr.current().execute(SLOW_STATEMENT, &[]).await.unwrap_err();
    assert!(matches!(err, TxnError::Timeout(d) if d == Duration::from_millis(100)));

    mgr.current().execute("SELECT 1", &[]).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_explicit_deadline_variants() {
    let (db, _journal) = MockDatabase::new();
    let mgr = TxnManager::new(db);
    let _outer = mgr.begin().await.unwrap();
    let current = mgr.current();

    let err = current
        .query_timeout(Duration::from_secs(1), SLOW_STATEMENT, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, TxnError::Timeout(_)));

    let row = current
        .query_row_timeout(Duration::from_secs(60), SLOW_STATEMENT, &[])
        .await
        .unwrap();
    assert!(row.is_some());

    let done = current
        .execute_timeout(Duration::from_secs(1), "UPDATE t SET x = 1", &[])
        .await
        .unwrap();
    assert_eq!(done.rows_affected, 1);
}
