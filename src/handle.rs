//! Transaction handles returned by [`TxnManager::begin`].
//!
//! The outermost handle owns the decision to commit; nested handles only
//! record that their scope wants to commit. Any handle can roll back, and a
//! rollback always aborts the whole physical transaction since there is no
//! partial rollback.

use async_trait::async_trait;
use tracing::debug;

use crate::{
    backend::Database,
    current::Current,
    error::{Result, TxnError},
    manager::TxnManager,
};

/// Which position a handle holds in its transaction tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Outermost,
    Nested,
}

/// A logical transaction scope
///
/// A handle is disposed exactly once through [`commit`](Transaction::commit),
/// [`rollback`](Transaction::rollback) or [`end`](Transaction::end). Calls made
/// after the tree's physical transaction ended are no-ops, except `commit`,
/// which reports [`TxnError::AlreadyEnded`].
#[async_trait]
pub trait Transaction: Send {
    /// The error type of the underlying database
    type Error: std::error::Error + Send + Sync + 'static;

    /// Commit this scope
    async fn commit(&mut self) -> Result<(), Self::Error>;

    /// Roll back the entire physical transaction
    async fn rollback(&mut self) -> Result<(), Self::Error>;

    /// Close this scope: roll back unless a commit was requested
    async fn end(&mut self) -> Result<(), Self::Error>;

    fn kind(&self) -> HandleKind;

    /// Whether the physical transaction behind this handle has ended
    fn is_done(&self) -> bool;
}

/// The handle created by the first `begin` of a transaction tree
pub struct RootTx<D: Database> {
    mgr: TxnManager<D>,
    generation: u64,
}

impl<D: Database + 'static> RootTx<D> {
    pub(crate) fn new(mgr: TxnManager<D>, generation: u64) -> Self {
        Self { mgr, generation }
    }
}

#[async_trait]
impl<D: Database + 'static> Transaction for RootTx<D> {
    type Error = D::Error;

    async fn commit(&mut self) -> Result<(), D::Error> {
        if self.is_done() {
            return Err(TxnError::AlreadyEnded);
        }
        self.mgr.commit(self.generation).await
    }

    async fn rollback(&mut self) -> Result<(), D::Error> {
        if self.is_done() {
            return Ok(());
        }
        self.mgr.rollback(self.generation).await
    }

    /// The outermost scope never commits on `end`; it only aborts a
    /// transaction nobody committed.
    async fn end(&mut self) -> Result<(), D::Error> {
        if self.is_done() {
            return Ok(());
        }
        debug!("Outermost scope ended without commit, rolling back");
        self.mgr.rollback(self.generation).await
    }

    fn kind(&self) -> HandleKind {
        HandleKind::Outermost
    }

    fn is_done(&self) -> bool {
        self.mgr.is_done(self.generation)
    }
}

impl<D: Database> Drop for RootTx<D> {
    fn drop(&mut self) {
        if !self.mgr.is_done(self.generation) {
            self.mgr.abandon(self.generation);
        }
    }
}

/// A handle created by `begin` while a physical transaction was already open
pub struct NestedTx<D: Database> {
    mgr: TxnManager<D>,
    generation: u64,
    commit_requested: bool,
}

impl<D: Database + 'static> NestedTx<D> {
    pub(crate) fn new(mgr: TxnManager<D>, generation: u64) -> Self {
        Self {
            mgr,
            generation,
            commit_requested: false,
        }
    }

    /// Whether `commit` was called on this scope
    pub fn commit_requested(&self) -> bool {
        self.commit_requested
    }
}

#[async_trait]
impl<D: Database + 'static> Transaction for NestedTx<D> {
    type Error = D::Error;

    /// Records the intent to commit; the physical commit stays with the
    /// outermost handle.
    async fn commit(&mut self) -> Result<(), D::Error> {
        if self.is_done() {
            return Err(TxnError::AlreadyEnded);
        }
        self.commit_requested = true;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), D::Error> {
        if self.is_done() {
            return Ok(());
        }
        debug!("Nested scope rolled back, aborting the whole transaction");
        self.mgr.rollback(self.generation).await
    }

    async fn end(&mut self) -> Result<(), D::Error> {
        if self.commit_requested {
            return Ok(());
        }
        self.rollback().await
    }

    fn kind(&self) -> HandleKind {
        HandleKind::Nested
    }

    fn is_done(&self) -> bool {
        self.mgr.is_done(self.generation)
    }
}

/// A transaction handle of either kind, as returned by [`TxnManager::begin`]
pub enum TxHandle<D: Database> {
    Root(RootTx<D>),
    Nested(NestedTx<D>),
}

impl<D: Database + 'static> TxHandle<D> {
    pub fn is_outermost(&self) -> bool {
        matches!(self, TxHandle::Root(_))
    }

    fn manager(&self) -> &TxnManager<D> {
        match self {
            TxHandle::Root(tx) => &tx.mgr,
            TxHandle::Nested(tx) => &tx.mgr,
        }
    }

    /// An executor over the transaction this handle belongs to
    pub fn current(&self) -> Current<D> {
        self.manager().current()
    }

    /// Register a callback to run after the physical transaction commits
    pub fn add_end_hook<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.manager().add_end_hook(hook);
    }
}

#[async_trait]
impl<D: Database + 'static> Transaction for TxHandle<D> {
    type Error = D::Error;

    async fn commit(&mut self) -> Result<(), D::Error> {
        match self {
            TxHandle::Root(tx) => tx.commit().await,
            TxHandle::Nested(tx) => tx.commit().await,
        }
    }

    async fn rollback(&mut self) -> Result<(), D::Error> {
        match self {
            TxHandle::Root(tx) => tx.rollback().await,
            TxHandle::Nested(tx) => tx.rollback().await,
        }
    }

    async fn end(&mut self) -> Result<(), D::Error> {
        match self {
            TxHandle::Root(tx) => tx.end().await,
            TxHandle::Nested(tx) => tx.end().await,
        }
    }

    fn kind(&self) -> HandleKind {
        match self {
            TxHandle::Root(tx) => tx.kind(),
            TxHandle::Nested(tx) => tx.kind(),
        }
    }

    fn is_done(&self) -> bool {
        match self {
            TxHandle::Root(tx) => tx.is_done(),
            TxHandle::Nested(tx) => tx.is_done(),
        }
    }
}

impl<D: Database> std::fmt::Debug for TxHandle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxHandle::Root(tx) => f
                .debug_struct("RootTx")
                .field("generation", &tx.generation)
                .finish(),
            TxHandle::Nested(tx) => f
                .debug_struct("NestedTx")
                .field("generation", &tx.generation)
                .field("commit_requested", &tx.commit_requested)
                .finish(),
        }
    }
}
