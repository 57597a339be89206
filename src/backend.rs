use async_trait::async_trait;
use std::result::Result;

use crate::value::{QueryResult, Row, Value};

/// A trait for anything statements can be run against
///
/// Implemented by the base database handle, by its physical transactions and
/// by [`Current`](crate::current::Current), so callers can run statements
/// without knowing whether a transaction is open.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The error type reported by the driver
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute a statement that does not return rows
    async fn execute(&self, statement: &str, args: &[Value]) -> Result<QueryResult, Self::Error>;

    /// Execute a statement and collect every returned row
    async fn query(&self, statement: &str, args: &[Value]) -> Result<Vec<Row>, Self::Error>;

    /// Execute a statement and return at most one row
    async fn query_row(&self, statement: &str, args: &[Value])
        -> Result<Option<Row>, Self::Error>;
}

/// A trait for database handles that can start a physical transaction
#[async_trait]
pub trait Database: Executor {
    /// The physical transaction type this database hands out
    type Tx: PhysicalTransaction<Error = Self::Error> + 'static;

    /// Begin a new physical transaction
    async fn begin(&self) -> Result<Self::Tx, Self::Error>;
}

/// A trait for the single physical transaction obtained from a [`Database`]
///
/// Both methods take `&self`: the transaction is shared between the manager
/// and the [`Current`](crate::current::Current) views handed to callers.
/// Implementations must reject any call made after a terminal one.
#[async_trait]
pub trait PhysicalTransaction: Executor {
    /// Commit the transaction
    async fn commit(&self) -> Result<(), Self::Error>;

    /// Rollback the transaction
    async fn rollback(&self) -> Result<(), Self::Error>;
}
