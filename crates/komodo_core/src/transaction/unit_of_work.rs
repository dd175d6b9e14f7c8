//! Unit-of-work state machine and transaction-scoped views.

use crate::callback::UnitOfWorkListener;
use crate::error::{KError, KResult};
use crate::repository::RepositoryInner;
use komodo_store::{ChangeOp, ChangeSet, NodePath, NodeRecord, NodeTree};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Created; mutations may be staged. Commit has not begun.
    NotStarted,
    /// Commit is in progress.
    Running,
    /// Commit succeeded. Mutations are visible to new transactions.
    Committed,
    /// All staged mutations were discarded.
    RolledBack,
    /// Commit failed; the cause is retained on the transaction.
    Error,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Running => "RUNNING",
            Self::Committed => "COMMITTED",
            Self::RolledBack => "ROLLED_BACK",
            Self::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

pub(crate) struct TxState {
    pub(crate) state: State,
    pub(crate) changes: ChangeSet,
    pub(crate) error: Option<KError>,
}

/// A named, user-attributed transaction against the repository.
///
/// Created through [`crate::Repository::create_transaction`]. All
/// staging operations require the `NotStarted` state; `commit` and
/// `rollback` finish the transaction. The rollback-only flag is fixed
/// at creation: committing such a transaction discards its mutations.
pub struct UnitOfWork {
    repo: Arc<RepositoryInner>,
    id: u64,
    name: String,
    user: String,
    rollback_only: bool,
    listener: Option<Arc<dyn UnitOfWorkListener>>,
    tx: Mutex<TxState>,
}

impl UnitOfWork {
    pub(crate) fn new(
        repo: Arc<RepositoryInner>,
        id: u64,
        user: impl Into<String>,
        name: impl Into<String>,
        rollback_only: bool,
        listener: Option<Arc<dyn UnitOfWorkListener>>,
    ) -> Self {
        Self {
            repo,
            id,
            name: name.into(),
            user: user.into(),
            rollback_only,
            listener,
            tx: Mutex::new(TxState {
                state: State::NotStarted,
                changes: ChangeSet::new(),
                error: None,
            }),
        }
    }

    /// Returns the transaction id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the transaction name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the originating user.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user
    }

    /// Returns true if commit will discard instead of persist.
    #[must_use]
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.tx.lock().state
    }

    /// Returns true if a listener was attached at creation.
    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.listener.is_some()
    }

    /// Returns the attached listener, if any.
    #[must_use]
    pub fn callback(&self) -> Option<Arc<dyn UnitOfWorkListener>> {
        self.listener.clone()
    }

    /// Returns the commit error, if the transaction ended in `Error`.
    #[must_use]
    pub fn error(&self) -> Option<KError> {
        self.tx.lock().error.clone()
    }

    /// Commits the transaction.
    ///
    /// Atomically applies all staged mutations and, on success,
    /// dispatches sequencing; the attached listener fires only after
    /// every sequencing job spawned by this commit resolves. Commit
    /// itself does not block on sequencing.
    ///
    /// # Errors
    ///
    /// Returns `KError::InvalidState` if the transaction already
    /// finished, or the application failure (also latched on the
    /// transaction and reported to the listener).
    pub fn commit(&self) -> KResult<()> {
        self.repo.clone().commit_unit(self)
    }

    /// Discards all staged mutations.
    ///
    /// Synchronous: by the time this returns the pending change-set
    /// is gone and no sequencing was or will be triggered.
    ///
    /// # Errors
    ///
    /// Returns `KError::InvalidState` if the transaction already
    /// finished.
    pub fn rollback(&self) -> KResult<()> {
        self.repo.clone().rollback_unit(self)
    }

    /// Fails unless the transaction can still stage operations.
    pub(crate) fn require_not_started(&self, operation: &str) -> KResult<()> {
        let tx = self.tx.lock();
        if tx.state == State::NotStarted {
            Ok(())
        } else {
            Err(KError::invalid_state(operation, tx.state))
        }
    }

    /// Stages operations under the NotStarted guard.
    pub(crate) fn stage(
        &self,
        operation: &str,
        f: impl FnOnce(&mut ChangeSet),
    ) -> KResult<()> {
        let mut tx = self.tx.lock();
        if tx.state != State::NotStarted {
            return Err(KError::invalid_state(operation, tx.state));
        }
        f(&mut tx.changes);
        Ok(())
    }

    /// Runs a read against the transaction's pending change-set.
    pub(crate) fn with_changes<R>(&self, f: impl FnOnce(&ChangeSet) -> R) -> R {
        f(&self.tx.lock().changes)
    }

    /// Locks the transaction state for the commit pipeline.
    pub(crate) fn lock_state(&self) -> parking_lot::MutexGuard<'_, TxState> {
        self.tx.lock()
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("rollback_only", &self.rollback_only)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Resolves a record in the transaction's view: the committed tree
/// overlaid with the transaction's own staged operations, in order.
pub(crate) fn view_get(
    tree: &NodeTree,
    changes: &ChangeSet,
    path: &NodePath,
) -> Option<NodeRecord> {
    let mut record = tree.get(path);
    for op in changes.ops() {
        match op {
            ChangeOp::AddNode {
                path: p,
                primary_type,
            } if p == path => {
                record = Some(NodeRecord::new(primary_type.clone()));
            }
            ChangeOp::RemoveNode { path: p } if path.starts_with(p) => {
                record = None;
            }
            ChangeOp::SetProperty {
                path: p,
                name,
                value,
            } if p == path => {
                if let Some(r) = record.as_mut() {
                    match value {
                        Some(v) => {
                            r.properties.insert(name.clone(), v.clone());
                        }
                        None => {
                            r.properties.remove(name);
                        }
                    }
                }
            }
            ChangeOp::AddMixin { path: p, mixin } if p == path => {
                if let Some(r) = record.as_mut() {
                    if !r.mixins.iter().any(|m| m == mixin) {
                        r.mixins.push(mixin.clone());
                    }
                }
            }
            _ => {}
        }
    }
    record
}

/// True if `path` resolves in the transaction's view.
pub(crate) fn view_exists(tree: &NodeTree, changes: &ChangeSet, path: &NodePath) -> bool {
    view_get(tree, changes, path).is_some()
}

/// Child paths of `path` in the transaction's view, or `None` if the
/// node itself does not resolve.
pub(crate) fn view_children(
    tree: &NodeTree,
    changes: &ChangeSet,
    path: &NodePath,
) -> Option<Vec<NodePath>> {
    let mut names: Option<Vec<String>> = tree.get(path).map(|r| r.children);
    for op in changes.ops() {
        match op {
            ChangeOp::AddNode { path: p, .. } => {
                if p == path {
                    names = Some(Vec::new());
                } else if p.parent().as_ref() == Some(path) {
                    if let (Some(ns), Some(name)) = (names.as_mut(), p.name()) {
                        ns.push(name.to_string());
                    }
                }
            }
            ChangeOp::RemoveNode { path: p } => {
                if path.starts_with(p) {
                    names = None;
                } else if p.parent().as_ref() == Some(path) {
                    if let (Some(ns), Some(name)) = (names.as_mut(), p.name()) {
                        ns.retain(|c| c != name);
                    }
                }
            }
            _ => {}
        }
    }
    names.map(|ns| {
        ns.iter()
            .filter_map(|name| path.join(name).ok())
            .collect()
    })
}
