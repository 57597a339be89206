//! Nested transaction coordination over a single physical database
//! transaction.
//!
//! [`TxnManager::begin`] may be called at any nesting depth. The first call
//! starts a real transaction; later calls join it. Only the outermost handle
//! commits, any handle's rollback aborts everything, and end-hooks registered
//! along the way run once the physical commit has succeeded.
//!
//! ```rust,ignore
//! let mgr = TxnManager::new(SqlxPostgres::connect(&database_url()?).await?);
//!
//! let mut outer = mgr.begin().await?;
//! {
//!     let mut inner = mgr.begin().await?;
//!     mgr.current().execute("INSERT INTO users (name) VALUES ($1)", &["ann".into()]).await?;
//!     inner.add_end_hook(|| println!("user saved"));
//!     inner.commit().await?;
//!     inner.end().await?;
//! }
//! outer.commit().await?;
//! ```

pub mod backend;
pub mod backends;
pub mod config;
pub mod current;
pub mod error;
pub mod handle;
pub mod hooks;
pub mod manager;
pub mod tracing;
pub mod util;
pub mod value;

pub mod prelude;

pub use backend::{Database, Executor, PhysicalTransaction};
#[cfg(feature = "sqlx-postgres")]
pub use backends::SqlxPostgres;
#[cfg(feature = "sqlx-sqlite")]
pub use backends::SqlxSqlite;
pub use config::{database_url, ManagerConfig};
pub use current::Current;
pub use error::{ConfigError, Result, TxnError};
pub use handle::{HandleKind, NestedTx, RootTx, Transaction, TxHandle};
pub use hooks::EndHook;
pub use manager::TxnManager;
pub use self::tracing::init_tracing;
pub use value::{QueryResult, Row, Value};
