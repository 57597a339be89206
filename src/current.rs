use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    backend::{Database, Executor},
    error::{Result, TxnError},
    value::{QueryResult, Row, Value},
};

enum Target<D: Database> {
    Database(Arc<D>),
    Transaction(Weak<D::Tx>),
}

/// Executor over whatever was active when it was obtained from
/// [`TxnManager::current`](crate::manager::TxnManager::current)
///
/// A view taken inside a transaction does not keep the transaction alive:
/// once the transaction is committed or rolled back, statements run through
/// it fail with [`TxnError::AlreadyEnded`].
pub struct Current<D: Database> {
    target: Target<D>,
    timeout: Option<Duration>,
}

impl<D: Database> Clone for Current<D> {
    fn clone(&self) -> Self {
        let target = match &self.target {
            Target::Database(db) => Target::Database(db.clone()),
            Target::Transaction(tx) => Target::Transaction(tx.clone()),
        };
        Self {
            target,
            timeout: self.timeout,
        }
    }
}

impl<D: Database> Current<D> {
    pub(crate) fn database(db: Arc<D>, timeout: Option<Duration>) -> Self {
        Self {
            target: Target::Database(db),
            timeout,
        }
    }

    pub(crate) fn transaction(tx: Weak<D::Tx>, timeout: Option<Duration>) -> Self {
        Self {
            target: Target::Transaction(tx),
            timeout,
        }
    }

    /// Whether this view runs statements inside a physical transaction
    pub fn is_transaction(&self) -> bool {
        matches!(self.target, Target::Transaction(_))
    }

    /// Execute a statement, failing with [`TxnError::Timeout`] after `timeout`
    pub async fn execute_timeout(
        &self,
        timeout: Duration,
        statement: &str,
        args: &[Value],
    ) -> Result<QueryResult, D::Error> {
        match &self.target {
            Target::Database(db) => deadline(Some(timeout), db.execute(statement, args)).await,
            Target::Transaction(tx) => {
                let tx = upgrade::<_, D::Error>(tx)?;
                deadline(Some(timeout), tx.execute(statement, args)).await
            }
        }
    }

    /// Query rows, failing with [`TxnError::Timeout`] after `timeout`
    pub async fn query_timeout(
        &self,
        timeout: Duration,
        statement: &str,
        args: &[Value],
    ) -> Result<Vec<Row>, D::Error> {
        match &self.target {
            Target::Database(db) => deadline(Some(timeout), db.query(statement, args)).await,
            Target::Transaction(tx) => {
                let tx = upgrade::<_, D::Error>(tx)?;
                deadline(Some(timeout), tx.query(statement, args)).await
            }
        }
    }

    /// Query a single row, failing with [`TxnError::Timeout`] after `timeout`
    pub async fn query_row_timeout(
        &self,
        timeout: Duration,
        statement: &str,
        args: &[Value],
    ) -> Result<Option<Row>, D::Error> {
        match &self.target {
            Target::Database(db) => deadline(Some(timeout), db.query_row(statement, args)).await,
            Target::Transaction(tx) => {
                let tx = upgrade::<_, D::Error>(tx)?;
                deadline(Some(timeout), tx.query_row(statement, args)).await
            }
        }
    }
}

fn upgrade<T, E>(tx: &Weak<T>) -> Result<Arc<T>, E>
where
    E: std::error::Error + 'static,
{
    tx.upgrade().ok_or(TxnError::AlreadyEnded)
}

async fn deadline<T, E, F>(timeout: Option<Duration>, fut: F) -> Result<T, E>
where
    E: std::error::Error + 'static,
    F: Future<Output = std::result::Result<T, E>>,
{
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(TxnError::Timeout(limit)),
        },
        None => fut.await,
    };
    outcome.map_err(TxnError::Statement)
}

#[async_trait]
impl<D: Database + 'static> Executor for Current<D> {
    type Error = TxnError<D::Error>;

    async fn execute(&self, statement: &str, args: &[Value]) -> Result<QueryResult, D::Error> {
        match &self.target {
            Target::Database(db) => deadline(self.timeout, db.execute(statement, args)).await,
            Target::Transaction(tx) => {
                let tx = upgrade::<_, D::Error>(tx)?;
                deadline(self.timeout, tx.execute(statement, args)).await
            }
        }
    }

    async fn query(&self, statement: &str, args: &[Value]) -> Result<Vec<Row>, D::Error> {
        match &self.target {
            Target::Database(db) => deadline(self.timeout, db.query(statement, args)).await,
            Target::Transaction(tx) => {
                let tx = upgrade::<_, D::Error>(tx)?;
                deadline(self.timeout, tx.query(statement, args)).await
            }
        }
    }

    async fn query_row(&self, statement: &str, args: &[Value]) -> Result<Option<Row>, D::Error> {
        match &self.target {
            Target::Database(db) => deadline(self.timeout, db.query_row(statement, args)).await,
            Target::Transaction(tx) => {
                let tx = upgrade::<_, D::Error>(tx)?;
                deadline(self.timeout, tx.query_row(statement, args)).await
            }
        }
    }
}
