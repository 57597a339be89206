#[cfg(feature = "sqlx-backend")]
pub mod sqlx;

#[cfg(feature = "sqlx-postgres")]
pub use self::sqlx::{SqlxPostgres, SqlxPostgresTx};
#[cfg(feature = "sqlx-sqlite")]
pub use self::sqlx::{SqlxSqlite, SqlxSqliteTx};
