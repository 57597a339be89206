use std::str::FromStr;

use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteQueryResult, SqliteRow},
    Column, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef,
};

use super::unsupported_column;
use crate::value::{QueryResult, Row, Value};

sqlx_adapter! {
    /// A SQLite database reached through a sqlx pool
    database = SqlxSqlite,
    /// A SQLite transaction started from [`SqlxSqlite`]
    transaction = SqlxSqliteTx,
    driver = Sqlite,
    pool = SqlitePool,
}

impl SqlxSqlite {
    /// Open a pool on the given SQLite URL, creating the file if missing
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        tracing::debug!(url, "Connected SQLite pool");
        Ok(Self::from_pool(pool))
    }

    /// Open a private in-memory database
    ///
    /// The pool keeps exactly one connection alive for its whole life; every
    /// new connection to `sqlite::memory:` would see its own empty database.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self::from_pool(pool))
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            Value::Bytes(v) => query.bind(v.as_slice()),
        };
    }
    query
}

fn query_result(done: &SqliteQueryResult) -> QueryResult {
    QueryResult {
        rows_affected: done.rows_affected(),
        last_insert_id: Some(done.last_insert_rowid()),
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for column in row.columns() {
        columns.push(column.name().to_string());
        values.push(decode_column(row, column.ordinal())?);
    }
    Ok(Row::new(columns, values))
}

// SQLite is dynamically typed; dispatch on the storage class of the value
// rather than the declared column type.
fn decode_column(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "INTEGER" => Value::Int(row.try_get(index)?),
        "REAL" => Value::Float(row.try_get(index)?),
        "TEXT" => Value::Text(row.try_get(index)?),
        "BLOB" => Value::Bytes(row.try_get(index)?),
        other => return Err(unsupported_column(index, other)),
    };
    Ok(value)
}
