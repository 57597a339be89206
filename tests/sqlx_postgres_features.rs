//! Integration tests for the SQLx PostgreSQL adapter
//!
//! These run against the server named by `DATABASE_URL` and are skipped when
//! it is not set.

mod common;

#[cfg(feature = "sqlx-postgres")]
mod sqlx_postgres_tests {
    use db_txnmgr::{database_url, Executor, SqlxPostgres, Transaction, TxnManager, Value};

    use crate::common::init_tracing;

    async fn manager() -> Option<TxnManager<SqlxPostgres>> {
        init_tracing();
        let url = match database_url() {
            Ok(url) => url,
            Err(e) => {
                tracing::info!("Skipping PostgreSQL test: {}", e);
                return None;
            }
        };
        let db = SqlxPostgres::connect(&url).await.unwrap();
        Some(TxnManager::new(db))
    }

    #[tokio::test]
    async fn test_temp_table_lives_only_inside_transaction() {
        let Some(mgr) = manager().await else {
            return;
        };

        let mut outer = mgr.begin().await.unwrap();
        mgr.current()
            .execute(
                "CREATE TEMP TABLE txnmgr_scratch (id INT4, label TEXT) ON COMMIT DROP",
                &[],
            )
            .await
            .unwrap();

        let mut inner = mgr.begin().await.unwrap();
        mgr.current()
            .execute(
                "INSERT INTO txnmgr_scratch (id, label) VALUES ($1, $2)",
                &[Value::from(1), Value::from("one")],
            )
            .await
            .unwrap();
        inner.commit().await.unwrap();
        inner.end().await.unwrap();

        let row = mgr
            .current()
            .query_row("SELECT id, label FROM txnmgr_scratch", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.get(0), Some(&Value::Int(1)));
        assert_eq!(row.get_by_name("label").and_then(Value::as_str), Some("one"));

        outer.commit().await.unwrap();
        assert!(!mgr.current().is_transaction());
    }

    #[tokio::test]
    async fn test_internal_char_type_decodes_as_integer() {
        let Some(mgr) = manager().await else {
            return;
        };

        let row = mgr
            .current()
            .query_row("SELECT 'a'::\"char\" AS c, 'b'::CHAR(1) AS padded", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.get_by_name("c"), Some(&Value::Int(97)));
        assert_eq!(row.get_by_name("padded").and_then(Value::as_str), Some("b"));
    }
}
