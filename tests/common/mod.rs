//! Common utilities for tests: a recording in-memory database

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use db_txnmgr::{Database, Executor, PhysicalTransaction, QueryResult, Row, Value};
use parking_lot::Mutex;

/// Statement that makes the mock sleep before answering
#[allow(dead_code)]
pub const SLOW_STATEMENT: &str = "SELECT pg_sleep(10)";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("mock driver error: {0}")]
pub struct MockError(pub &'static str);

/// Shared record of everything the database was asked to do
#[derive(Debug, Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
    pub fail_begin: AtomicBool,
    pub fail_commit: AtomicBool,
    pub fail_rollback: AtomicBool,
}

#[allow(dead_code)]
impl Journal {
    fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    pub fn fail_next_begin(&self) {
        self.fail_begin.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_rollback(&self) {
        self.fail_rollback.store(true, Ordering::SeqCst);
    }
}

pub struct MockDatabase {
    pub journal: Arc<Journal>,
}

#[allow(dead_code)]
impl MockDatabase {
    pub fn new() -> (Self, Arc<Journal>) {
        let journal = Arc::new(Journal::default());
        (
            Self {
                journal: journal.clone(),
            },
            journal,
        )
    }
}

pub struct MockTx {
    journal: Arc<Journal>,
    ended: AtomicBool,
}

async fn run(journal: &Journal, target: &str, statement: &str) {
    if statement == SLOW_STATEMENT {
        tokio::time::sleep(Duration::from_secs(10)).await;
    }
    journal.record(format!("{}: {}", target, statement));
}

fn echo_row(statement: &str, args: &[Value]) -> Row {
    let mut columns = vec!["statement".to_string()];
    let mut values = vec![Value::from(statement)];
    for (i, arg) in args.iter().enumerate() {
        columns.push(format!("arg{}", i));
        values.push(arg.clone());
    }
    Row::new(columns, values)
}

#[async_trait]
impl Executor for MockDatabase {
    type Error = MockError;

    async fn execute(&self, statement: &str, _args: &[Value]) -> Result<QueryResult, MockError> {
        run(&self.journal, "db", statement).await;
        Ok(QueryResult::default())
    }

    async fn query(&self, statement: &str, args: &[Value]) -> Result<Vec<Row>, MockError> {
        run(&self.journal, "db", statement).await;
        Ok(vec![echo_row(statement, args)])
    }

    async fn query_row(&self, statement: &str, args: &[Value]) -> Result<Option<Row>, MockError> {
        run(&self.journal, "db", statement).await;
        Ok(Some(echo_row(statement, args)))
    }
}

#[async_trait]
impl Database for MockDatabase {
    type Tx = MockTx;

    async fn begin(&self) -> Result<MockTx, MockError> {
        if self.journal.fail_begin.swap(false, Ordering::SeqCst) {
            return Err(MockError("connection refused"));
        }
        self.journal.record("begin");
        Ok(MockTx {
            journal: self.journal.clone(),
            ended: AtomicBool::new(false),
        })
    }
}

impl MockTx {
    fn check_open(&self) -> Result<(), MockError> {
        if self.ended.load(Ordering::SeqCst) {
            return Err(MockError("transaction already finished"));
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for MockTx {
    type Error = MockError;

    async fn execute(&self, statement: &str, _args: &[Value]) -> Result<QueryResult, MockError> {
        self.check_open()?;
        run(&self.journal, "tx", statement).await;
        Ok(QueryResult {
            rows_affected: 1,
            last_insert_id: None,
        })
    }

    async fn query(&self, statement: &str, args: &[Value]) -> Result<Vec<Row>, MockError> {
        self.check_open()?;
        run(&self.journal, "tx", statement).await;
        Ok(vec![echo_row(statement, args)])
    }

    async fn query_row(&self, statement: &str, args: &[Value]) -> Result<Option<Row>, MockError> {
        self.check_open()?;
        run(&self.journal, "tx", statement).await;
        Ok(Some(echo_row(statement, args)))
    }
}

#[async_trait]
impl PhysicalTransaction for MockTx {
    async fn commit(&self) -> Result<(), MockError> {
        if self.ended.swap(true, Ordering::SeqCst) {
            return Err(MockError("transaction already finished"));
        }
        self.journal.record("commit");
        if self.journal.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(MockError("commit failed"));
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), MockError> {
        if self.ended.swap(true, Ordering::SeqCst) {
            return Err(MockError("transaction already finished"));
        }
        self.journal.record("rollback");
        if self.journal.fail_rollback.swap(false, Ordering::SeqCst) {
            return Err(MockError("rollback failed"));
        }
        Ok(())
    }
}

// Stands in for a driver's rollback-on-drop.
impl Drop for MockTx {
    fn drop(&mut self) {
        if !self.ended.load(Ordering::SeqCst) {
            self.journal.record("dropped");
        }
    }
}

/// Initialize tracing for tests if it hasn't been already
#[allow(dead_code)]
pub fn init_tracing() {
    db_txnmgr::init_tracing();
}
