use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgQueryResult, PgRow},
    query::Query,
    Column, PgPool, Postgres, Row as _, TypeInfo, ValueRef,
};

use super::unsupported_column;
use crate::value::{QueryResult, Row, Value};

sqlx_adapter! {
    /// A PostgreSQL database reached through a sqlx pool
    database = SqlxPostgres,
    /// A PostgreSQL transaction started from [`SqlxPostgres`]
    transaction = SqlxPostgresTx,
    driver = Postgres,
    pool = PgPool,
}

impl SqlxPostgres {
    /// Connect a new pool to the given database URL
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::from_str(url)?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        tracing::debug!("Connected PostgreSQL pool");
        Ok(Self::from_pool(pool))
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
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

fn query_result(done: &PgQueryResult) -> QueryResult {
    QueryResult {
        rows_affected: done.rows_affected(),
        last_insert_id: None,
    }
}

fn decode_row(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for column in row.columns() {
        columns.push(column.name().to_string());
        values.push(decode_column(row, column.ordinal(), column.type_info().name())?);
    }
    Ok(Row::new(columns, values))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    // The single-byte internal `"char"` type, not `CHAR(n)`
    Char,
    Float4,
    Float8,
    Text,
    Bytes,
}

fn column_kind(type_name: &str) -> Option<ColumnKind> {
    let kind = match type_name {
        "BOOL" => ColumnKind::Bool,
        "INT2" => ColumnKind::Int2,
        "INT4" => ColumnKind::Int4,
        "INT8" => ColumnKind::Int8,
        "\"CHAR\"" => ColumnKind::Char,
        "FLOAT4" => ColumnKind::Float4,
        "FLOAT8" => ColumnKind::Float8,
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => ColumnKind::Text,
        "BYTEA" => ColumnKind::Bytes,
        _ => return None,
    };
    Some(kind)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }
    let Some(kind) = column_kind(type_name) else {
        return Err(unsupported_column(index, type_name));
    };
    let value = match kind {
        ColumnKind::Bool => Value::Bool(row.try_get(index)?),
        ColumnKind::Int2 => Value::Int(row.try_get::<i16, _>(index)?.into()),
        ColumnKind::Int4 => Value::Int(row.try_get::<i32, _>(index)?.into()),
        ColumnKind::Int8 => Value::Int(row.try_get(index)?),
        ColumnKind::Char => Value::Int(row.try_get::<i8, _>(index)?.into()),
        ColumnKind::Float4 => Value::Float(row.try_get::<f32, _>(index)?.into()),
        ColumnKind::Float8 => Value::Float(row.try_get(index)?),
        ColumnKind::Text => Value::Text(row.try_get(index)?),
        ColumnKind::Bytes => Value::Bytes(row.try_get(index)?),
    };
    Ok(value)
}
