//! sqlx adapters for the connection capability traits.
//!
//! Each adapter wraps a sqlx pool as a [`Database`](crate::backend::Database)
//! and a `sqlx::Transaction` as its [`PhysicalTransaction`](crate::backend::PhysicalTransaction).

/// Generates the pool and transaction adapters for one sqlx database.
///
/// The calling module provides `bind_values`, `decode_row` and
/// `query_result` for its database.
macro_rules! sqlx_adapter {
    (
        $(#[$db_meta:meta])*
        database = $name:ident,
        $(#[$tx_meta:meta])*
        transaction = $tx_name:ident,
        driver = $driver:ty,
        pool = $pool:ty $(,)?
    ) => {
        $(#[$db_meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pool: $pool,
        }

        impl $name {
            /// Wrap an existing pool
            pub fn from_pool(pool: $pool) -> Self {
                Self { pool }
            }

            /// Get a reference to the underlying sqlx pool
            pub fn sqlx_pool(&self) -> &$pool {
                &self.pool
            }
        }

        #[::async_trait::async_trait]
        impl $crate::backend::Executor for $name {
            type Error = ::sqlx::Error;

            async fn execute(
                &self,
                statement: &str,
                args: &[$crate::value::Value],
            ) -> ::std::result::Result<$crate::value::QueryResult, ::sqlx::Error> {
                let done = bind_values(::sqlx::query(statement), args)
                    .execute(&self.pool)
                    .await?;
                Ok(query_result(&done))
            }

            async fn query(
                &self,
                statement: &str,
                args: &[$crate::value::Value],
            ) -> ::std::result::Result<Vec<$crate::value::Row>, ::sqlx::Error> {
                let rows = bind_values(::sqlx::query(statement), args)
                    .fetch_all(&self.pool)
                    .await?;
                rows.iter().map(decode_row).collect()
            }

            async fn query_row(
                &self,
                statement: &str,
                args: &[$crate::value::Value],
            ) -> ::std::result::Result<Option<$crate::value::Row>, ::sqlx::Error> {
                let row = bind_values(::sqlx::query(statement), args)
                    .fetch_optional(&self.pool)
                    .await?;
                row.as_ref().map(decode_row).transpose()
            }
        }

        #[::async_trait::async_trait]
        impl $crate::backend::Database for $name {
            type Tx = $tx_name;

            async fn begin(&self) -> ::std::result::Result<$tx_name, ::sqlx::Error> {
                let tx = self.pool.begin().await?;
                Ok($tx_name {
                    inner: ::tokio::sync::Mutex::new(Some(tx)),
                })
            }
        }

        $(#[$tx_meta])*
        pub struct $tx_name {
            inner: ::tokio::sync::Mutex<Option<::sqlx::Transaction<'static, $driver>>>,
        }

        impl ::std::fmt::Debug for $tx_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($tx_name)).finish_non_exhaustive()
            }
        }

        #[::async_trait::async_trait]
        impl $crate::backend::Executor for $tx_name {
            type Error = ::sqlx::Error;

            async fn execute(
                &self,
                statement: &str,
                args: &[$crate::value::Value],
            ) -> ::std::result::Result<$crate::value::QueryResult, ::sqlx::Error> {
                let mut guard = self.inner.lock().await;
                let tx = guard.as_mut().ok_or_else($crate::backends::sqlx::finished)?;
                let done = bind_values(::sqlx::query(statement), args)
                    .execute(&mut **tx)
                    .await?;
                Ok(query_result(&done))
            }

            async fn query(
                &self,
                statement: &str,
                args: &[$crate::value::Value],
            ) -> ::std::result::Result<Vec<$crate::value::Row>, ::sqlx::Error> {
                let mut guard = self.inner.lock().await;
                let tx = guard.as_mut().ok_or_else($crate::backends::sqlx::finished)?;
                let rows = bind_values(::sqlx::query(statement), args)
                    .fetch_all(&mut **tx)
                    .await?;
                rows.iter().map(decode_row).collect()
            }

            async fn query_row(
                &self,
                statement: &str,
                args: &[$crate::value::Value],
            ) -> ::std::result::Result<Option<$crate::value::Row>, ::sqlx::Error> {
                let mut guard = self.inner.lock().await;
                let tx = guard.as_mut().ok_or_else($crate::backends::sqlx::finished)?;
                let row = bind_values(::sqlx::query(statement), args)
                    .fetch_optional(&mut **tx)
                    .await?;
                row.as_ref().map(decode_row).transpose()
            }
        }

        #[::async_trait::async_trait]
        impl $crate::backend::PhysicalTransaction for $tx_name {
            async fn commit(&self) -> ::std::result::Result<(), ::sqlx::Error> {
                let tx = self
                    .inner
                    .lock()
                    .await
                    .take()
                    .ok_or_else($crate::backends::sqlx::finished)?;
                tx.commit().await
            }

            async fn rollback(&self) -> ::std::result::Result<(), ::sqlx::Error> {
                let tx = self
                    .inner
                    .lock()
                    .await
                    .take()
                    .ok_or_else($crate::backends::sqlx::finished)?;
                tx.rollback().await
            }
        }
    };
}

/// Error returned when a transaction is used after commit or rollback
pub(crate) fn finished() -> sqlx::Error {
    sqlx::Error::Protocol("transaction already finished".to_string())
}

/// Error returned for a column no [`Value`](crate::value::Value) variant can hold
pub(crate) fn unsupported_column(index: usize, type_name: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: format!("unsupported column type {}", type_name).into(),
    }
}

#[cfg(feature = "sqlx-postgres")]
mod sqlx_postgres;
#[cfg(feature = "sqlx-postgres")]
pub use sqlx_postgres::*;

#[cfg(feature = "sqlx-sqlite")]
mod sqlx_sqlite;
#[cfg(feature = "sqlx-sqlite")]
pub use sqlx_sqlite::*;
