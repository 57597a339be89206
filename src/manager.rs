//! The transaction manager: one physical transaction shared by a tree of
//! lexically nested handles.
//!
//! A manager moves through `NoTransaction -> Active -> Finished`. The first
//! [`TxnManager::begin`] starts a physical transaction and hands out the
//! outermost handle; every further `begin` while it is active hands out a
//! nested handle over the same transaction. Only the outermost handle can
//! commit, but any handle can roll the whole tree back.
//!
//! A manager is meant to be driven by one call stack at a time. It does not
//! serialize concurrent `begin`/`commit`/`rollback` calls; callers sharing one
//! manager across tasks must synchronize externally, or use one manager per
//! unit of work.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    backend::{Database, PhysicalTransaction},
    config::ManagerConfig,
    current::Current,
    error::{Result, TxnError},
    handle::{NestedTx, RootTx, Transaction, TxHandle},
    hooks::{EndHook, EndHooks},
    util::new_cycle_id,
};

struct State<T> {
    /// The active physical transaction, absent when none is open
    tx: Option<Arc<T>>,
    /// Set once a terminal commit or rollback has started
    finished: bool,
    hooks: EndHooks,
    /// Bumped by every physical begin; handles remember the value they saw
    generation: u64,
    cycle_id: Option<String>,
}

/// The pieces of state handed over to a terminal operation
struct Detached<T> {
    tx: Arc<T>,
    hooks: EndHooks,
    cycle_id: String,
}

struct Inner<D: Database> {
    db: Arc<D>,
    config: ManagerConfig,
    state: Mutex<State<D::Tx>>,
}

/// Coordinates nested transaction scopes over a single physical transaction
///
/// Cloning a manager is cheap; clones share the same state.
pub struct TxnManager<D: Database> {
    inner: Arc<Inner<D>>,
}

impl<D: Database> Clone for TxnManager<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Database> std::fmt::Debug for TxnManager<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TxnManager")
            .field("active", &state.tx.is_some())
            .field("finished", &state.finished)
            .field("hooks", &state.hooks.len())
            .field("generation", &state.generation)
            .finish()
    }
}

impl<D: Database> TxnManager<D> {
    /// Whether a handle created in `generation` can no longer act
    pub(crate) fn is_done(&self, generation: u64) -> bool {
        let state = self.inner.state.lock();
        state.finished || state.generation != generation || state.tx.is_none()
    }

    /// Mark the manager finished and move the physical transaction and hooks
    /// out of it. Returns `None` when the handle's transaction already ended.
    fn detach(&self, generation: u64) -> Option<Detached<D::Tx>> {
        let mut state = self.inner.state.lock();
        if state.finished || state.generation != generation {
            return None;
        }
        let tx = state.tx.take()?;
        state.finished = true;
        Some(Detached {
            tx,
            hooks: state.hooks.take(),
            cycle_id: state.cycle_id.take().unwrap_or_default(),
        })
    }

    /// Give up on the transaction of a handle dropped without being ended
    ///
    /// Detaches the physical transaction like a rollback would, but cannot
    /// await; the driver rolls the transaction back when it is dropped.
    pub(crate) fn abandon(&self, generation: u64) {
        if let Some(Detached {
            tx,
            hooks,
            cycle_id,
        }) = self.detach(generation)
        {
            warn!(
                cycle = %cycle_id,
                dropped_hooks = hooks.len(),
                "Transaction handle dropped without commit or rollback, abandoning transaction"
            );
            drop(hooks);
            drop(tx);
        }
    }
}

impl<D: Database + 'static> TxnManager<D> {
    /// Create a manager over the given database with the default configuration
    pub fn new(db: D) -> Self {
        Self::with_config(db, ManagerConfig::default())
    }

    /// Create a manager over the given database
    pub fn with_config(db: D, config: ManagerConfig) -> Self {
        Self::from_shared(Arc::new(db), config)
    }

    /// Create a manager over a database handle shared with other code
    pub fn from_shared(db: Arc<D>, config: ManagerConfig) -> Self {
        let hooks = EndHooks::with_capacity(config.hook_capacity);
        Self {
            inner: Arc::new(Inner {
                db,
                config,
                state: Mutex::new(State {
                    tx: None,
                    finished: false,
                    hooks,
                    generation: 0,
                    cycle_id: None,
                }),
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// The base database handle, bypassing any active transaction
    pub fn database(&self) -> &Arc<D> {
        &self.inner.db
    }

    /// Whether a physical transaction is currently open
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().tx.is_some()
    }

    /// Whether the last physical transaction has been committed or rolled back
    pub fn is_finished(&self) -> bool {
        self.inner.state.lock().finished
    }

    /// Begin a transaction scope
    ///
    /// Starts a physical transaction and returns the outermost handle when
    /// none is open. Otherwise returns a nested handle over the open one,
    /// without touching the database.
    pub async fn begin(&self) -> Result<TxHandle<D>, D::Error> {
        {
            let state = self.inner.state.lock();
            if state.tx.is_some() {
                debug!(
                    cycle = state.cycle_id.as_deref().unwrap_or_default(),
                    "Joining active transaction as nested scope"
                );
                return Ok(TxHandle::Nested(NestedTx::new(
                    self.clone(),
                    state.generation,
                )));
            }
        }

        let tx = self.inner.db.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to begin transaction");
            TxnError::Begin(e)
        })?;

        let mut state = self.inner.state.lock();
        let cycle_id = new_cycle_id();
        debug!(cycle = %cycle_id, "Began physical transaction");
        state.generation += 1;
        state.tx = Some(Arc::new(tx));
        state.finished = false;
        state.cycle_id = Some(cycle_id);
        Ok(TxHandle::Root(RootTx::new(self.clone(), state.generation)))
    }

    /// An executor over whatever is currently active: the open physical
    /// transaction, or the base database when there is none
    pub fn current(&self) -> Current<D> {
        let timeout = self.inner.config.statement_timeout;
        let state = self.inner.state.lock();
        match &state.tx {
            Some(tx) => Current::transaction(Arc::downgrade(tx), timeout),
            None => Current::database(self.inner.db.clone(), timeout),
        }
    }

    /// Register a callback to run after the next successful physical commit
    ///
    /// Hooks run in registration order and are discarded without running if
    /// the transaction rolls back.
    pub fn add_end_hook<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push_hook(Box::new(hook));
    }

    fn push_hook(&self, hook: EndHook) {
        let mut state = self.inner.state.lock();
        state.hooks.push(hook);
        debug!(hooks = state.hooks.len(), "Registered end hook");
    }

    /// Run `f` inside a transaction scope
    ///
    /// The scope is committed when `f` returns `Ok` and ended (rolled back
    /// unless already committed) when it returns `Err`. Calls nested inside
    /// `f` join the same physical transaction.
    pub async fn in_transaction<F, Fut, T, Err>(&self, f: F) -> std::result::Result<T, Err>
    where
        F: FnOnce(TxnManager<D>) -> Fut,
        Fut: Future<Output = std::result::Result<T, Err>>,
        Err: From<TxnError<D::Error>>,
    {
        let mut tx = self.begin().await?;
        match f(self.clone()).await {
            Ok(value) => {
                tx.commit().await?;
                tx.end().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(end_err) = tx.end().await {
                    warn!(error = %end_err, "Failed to end transaction after error");
                }
                Err(err)
            }
        }
    }

    /// Commit the physical transaction, then run the end hooks
    pub(crate) async fn commit(&self, generation: u64) -> Result<(), D::Error> {
        let Some(Detached {
            tx,
            hooks,
            cycle_id,
        }) = self.detach(generation)
        else {
            return Err(TxnError::AlreadyEnded);
        };

        if let Err(e) = tx.commit().await {
            warn!(cycle = %cycle_id, error = %e, dropped_hooks = hooks.len(), "Commit failed");
            return Err(TxnError::Commit(e));
        }

        debug!(cycle = %cycle_id, hooks = hooks.len(), "Committed physical transaction");
        hooks.run();
        Ok(())
    }

    /// Roll back the physical transaction, discarding the end hooks.
    /// A handle whose transaction already ended gets a no-op.
    pub(crate) async fn rollback(&self, generation: u64) -> Result<(), D::Error> {
        let Some(Detached {
            tx,
            hooks,
            cycle_id,
        }) = self.detach(generation)
        else {
            return Ok(());
        };
        drop(hooks);

        tx.rollback().await.map_err(|e| {
            warn!(cycle = %cycle_id, error = %e, "Rollback failed");
            TxnError::Rollback(e)
        })?;

        debug!(cycle = %cycle_id, "Rolled back physical transaction");
        Ok(())
    }
}
