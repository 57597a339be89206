pub use crate::backend::*;
pub use crate::config::ManagerConfig;
pub use crate::current::Current;
pub use crate::error::{TxnError, Result};
pub use crate::handle::{HandleKind, NestedTx, RootTx, Transaction, TxHandle};
pub use crate::manager::TxnManager;
pub use crate::value::{QueryResult, Row, Value};

#[cfg(feature = "sqlx-postgres")]
pub use crate::backends::SqlxPostgres;
#[cfg(feature = "sqlx-sqlite")]
pub use crate::backends::SqlxSqlite;
