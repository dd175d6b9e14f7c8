//! Repository handle and commit pipeline.

use crate::callback::UnitOfWorkListener;
use crate::config::RepositoryConfig;
use crate::error::{KError, KResult};
use crate::lexicon;
use crate::object::KomodoObject;
use crate::sequencing::{self, Sequencer};
use crate::transaction::{view_exists, view_get, State, UnitOfWork};
use crate::workspace;
use komodo_store::{NodePath, NodeTree};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reachability state of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryState {
    /// Started and accepting transactions.
    Reachable,
    /// Shut down; every operation fails.
    NotReachable,
}

/// Identity of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id {
    workspace_name: String,
    user: String,
}

impl Id {
    /// Returns the workspace name.
    #[must_use]
    pub fn workspace_name(&self) -> &str {
        &self.workspace_name
    }

    /// Returns the repository's system user.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }
}

pub(crate) struct RepositoryInner {
    id: Id,
    state: RwLock<RepositoryState>,
    pub(crate) tree: Arc<NodeTree>,
    sequencers: RwLock<Vec<Arc<dyn Sequencer>>>,
    next_txid: AtomicU64,
}

/// Handle to one repository.
///
/// Explicitly constructed with [`Repository::start`] and torn down
/// with [`Repository::shutdown`]; consumers receive the handle, there
/// is no process-wide instance. Cloning is cheap and shares the
/// underlying store.
#[derive(Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
}

impl Repository {
    /// Starts a repository; the handle is `Reachable` on return.
    ///
    /// # Errors
    ///
    /// Currently infallible for the in-memory store; the `Result`
    /// shape is part of the lifecycle contract.
    pub fn start(config: RepositoryConfig) -> KResult<Self> {
        let id = Id {
            workspace_name: config.workspace_name.clone(),
            user: config.system_user.clone(),
        };
        info!(workspace = %id.workspace_name, "starting repository");
        let tree = Arc::new(NodeTree::new(config.root_type.clone()));
        Ok(Self {
            inner: Arc::new(RepositoryInner {
                id,
                state: RwLock::new(RepositoryState::Reachable),
                tree,
                sequencers: RwLock::new(Vec::new()),
                next_txid: AtomicU64::new(1),
            }),
        })
    }

    /// Shuts the repository down. Subsequent operations fail with
    /// `KError::RepositoryNotReachable`. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.write();
        if *state == RepositoryState::Reachable {
            info!(workspace = %self.inner.id.workspace_name, "shutting down repository");
            *state = RepositoryState::NotReachable;
        }
    }

    /// Returns true while the repository is reachable.
    #[must_use]
    pub fn ping(&self) -> bool {
        *self.inner.state.read() == RepositoryState::Reachable
    }

    /// Returns the current reachability state.
    #[must_use]
    pub fn state(&self) -> RepositoryState {
        *self.inner.state.read()
    }

    /// Returns the repository identity.
    #[must_use]
    pub fn id(&self) -> &Id {
        &self.inner.id
    }

    /// Registers a sequencer; it observes every later commit.
    pub fn register_sequencer(&self, sequencer: Arc<dyn Sequencer>) {
        self.inner.sequencers.write().push(sequencer);
    }

    /// Creates a unit of work for `user`.
    ///
    /// The rollback-only flag is fixed for the transaction's life;
    /// the optional listener is notified of the outcome once
    /// sequencing resolves.
    ///
    /// # Errors
    ///
    /// Returns `KError::RepositoryNotReachable` after shutdown.
    pub fn create_transaction(
        &self,
        user: &str,
        name: &str,
        rollback_only: bool,
        callback: Option<Arc<dyn UnitOfWorkListener>>,
    ) -> KResult<UnitOfWork> {
        self.inner.ensure_reachable()?;
        let id = self.inner.next_txid.fetch_add(1, Ordering::SeqCst);
        debug!(id, user, name, rollback_only, "creating transaction");
        Ok(UnitOfWork::new(
            Arc::clone(&self.inner),
            id,
            user,
            name,
            rollback_only,
            callback,
        ))
    }

    /// Adds a node under `parent`.
    ///
    /// A `None` parent targets the caller's workspace home, which is
    /// created on first access. An explicit parent must already exist
    /// in the transaction's view; `add` never creates intermediate
    /// nodes. A `None` primary type defaults to `nt:unstructured`.
    ///
    /// # Errors
    ///
    /// `KError::NotFound` when the parent does not resolve;
    /// `KError::InvalidState` when the transaction has finished.
    pub fn add(
        &self,
        transaction: &UnitOfWork,
        parent: Option<&str>,
        name: &str,
        primary_type: Option<&str>,
    ) -> KResult<KomodoObject> {
        self.inner.ensure_reachable()?;
        transaction.require_not_started("add")?;

        let parent_path = match parent {
            None => workspace::ensure_home(&self.inner.tree, transaction.user_name())?,
            Some(raw) => self.inner.resolve_workspace_path(transaction, raw)?,
        };
        let exists = transaction
            .with_changes(|changes| view_exists(&self.inner.tree, changes, &parent_path));
        if !exists {
            return Err(KError::not_found(parent_path.as_str()));
        }

        let path = parent_path.join(name)?;
        let primary_type = primary_type.unwrap_or(lexicon::nt::UNSTRUCTURED).to_string();
        let staged_type = primary_type.clone();
        transaction.stage("add", move |changes| {
            changes.add_node(path.clone(), staged_type);
        })?;

        Ok(KomodoObject::new(
            Arc::clone(&self.inner),
            parent_path.join(name)?,
            primary_type,
        ))
    }

    /// Removes a batch of workspace items, all-or-nothing.
    ///
    /// Every path is resolved and checked against the transaction's
    /// view before anything is staged: if any path is absent, no path
    /// in the batch is removed.
    ///
    /// # Errors
    ///
    /// `KError::NotFound` naming the first absent path.
    pub fn remove(&self, transaction: &UnitOfWork, paths: &[&str]) -> KResult<()> {
        self.inner.ensure_reachable()?;
        transaction.require_not_started("remove")?;

        let mut resolved = Vec::with_capacity(paths.len());
        for raw in paths {
            resolved.push(self.inner.resolve_workspace_path(transaction, raw)?);
        }
        let missing = transaction.with_changes(|changes| {
            resolved
                .iter()
                .find(|path| !view_exists(&self.inner.tree, changes, path))
                .cloned()
        });
        if let Some(path) = missing {
            return Err(KError::not_found(path.as_str()));
        }

        // An earlier removal in the batch already covers its whole
        // subtree; staging a covered path again would fail at apply.
        let mut to_stage: Vec<NodePath> = Vec::with_capacity(resolved.len());
        for path in resolved {
            if to_stage.iter().any(|staged| path.starts_with(staged)) {
                continue;
            }
            to_stage.push(path);
        }

        transaction.stage("remove", move |changes| {
            for path in to_stage {
                changes.remove_node(path);
            }
        })
    }

    /// Resolves a workspace item.
    ///
    /// A `None` path resolves the caller's own home node, creating it
    /// (and the chain above it) on first access. Relative paths
    /// resolve under the caller's home. Returns `Ok(None)` when the
    /// item does not exist - an expected outcome, not an error.
    ///
    /// # Errors
    ///
    /// `KError::InvalidState` when the transaction has finished.
    pub fn get_from_workspace(
        &self,
        transaction: &UnitOfWork,
        path: Option<&str>,
    ) -> KResult<Option<KomodoObject>> {
        self.inner.ensure_reachable()?;
        transaction.require_not_started("get_from_workspace")?;

        let target = match path {
            None => workspace::ensure_home(&self.inner.tree, transaction.user_name())?,
            Some(raw) => {
                let resolved = self.inner.resolve_workspace_path(transaction, raw)?;
                // Direct access to the workspace chain creates it
                // lazily, the same as home access does.
                if resolved == workspace::home_path(transaction.user_name())? {
                    workspace::ensure_home(&self.inner.tree, transaction.user_name())?;
                } else if resolved == workspace::workspace_root_path()?
                    || resolved == workspace::komodo_root_path()?
                {
                    workspace::ensure_workspace(&self.inner.tree)?;
                }
                resolved
            }
        };

        let record = transaction
            .with_changes(|changes| view_get(&self.inner.tree, changes, &target));
        Ok(record.map(|r| KomodoObject::new(Arc::clone(&self.inner), target, r.primary_type)))
    }

    /// Returns the shared workspace root, creating it on first
    /// access.
    ///
    /// # Errors
    ///
    /// `KError::RepositoryNotReachable` after shutdown,
    /// `KError::InvalidState` for a finished transaction.
    pub fn komodo_workspace(&self, transaction: &UnitOfWork) -> KResult<KomodoObject> {
        self.inner.ensure_reachable()?;
        transaction.require_not_started("komodo_workspace")?;
        let path = workspace::ensure_workspace(&self.inner.tree)?;
        Ok(KomodoObject::new(
            Arc::clone(&self.inner),
            path,
            lexicon::komodo::WORKSPACE_TYPE.to_string(),
        ))
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RepositoryInner {
    pub(crate) fn ensure_reachable(&self) -> KResult<()> {
        if *self.state.read() == RepositoryState::Reachable {
            Ok(())
        } else {
            Err(KError::RepositoryNotReachable)
        }
    }

    /// Resolves a caller-supplied path: absolute paths stand as-is,
    /// anything else resolves beneath the caller's home.
    fn resolve_workspace_path(&self, transaction: &UnitOfWork, raw: &str) -> KResult<NodePath> {
        if raw.starts_with('/') {
            return Ok(NodePath::parse(raw)?);
        }
        let mut path = workspace::home_path(transaction.user_name())?;
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            path = path.join(segment)?;
        }
        Ok(path)
    }

    /// Commit pipeline: state transition, atomic application,
    /// sequencing dispatch.
    pub(crate) fn commit_unit(self: Arc<Self>, transaction: &UnitOfWork) -> KResult<()> {
        self.ensure_reachable()?;
        let listener = transaction.callback();

        let changes = {
            let mut tx = transaction.lock_state();
            if tx.state != State::NotStarted {
                return Err(KError::invalid_state("commit", tx.state));
            }
            tx.state = State::Running;
            std::mem::take(&mut tx.changes)
        };

        if transaction.is_rollback_only() {
            debug!(
                tx = transaction.name(),
                ops = changes.len(),
                "rollback-only transaction: discarding on commit"
            );
            transaction.lock_state().state = State::RolledBack;
            if let Some(listener) = listener {
                listener.respond();
            }
            return Ok(());
        }

        match self.tree.apply(&changes) {
            Ok(applied) => {
                transaction.lock_state().state = State::Committed;
                debug!(
                    tx = transaction.name(),
                    user = transaction.user_name(),
                    ops = changes.len(),
                    "transaction committed"
                );
                let sequencers = self.sequencers.read().clone();
                sequencing::dispatch(Arc::clone(&self.tree), sequencers, &applied, listener);
                Ok(())
            }
            Err(store_error) => {
                let error = KError::from(store_error);
                {
                    let mut tx = transaction.lock_state();
                    tx.state = State::Error;
                    tx.error = Some(error.clone());
                }
                warn!(tx = transaction.name(), %error, "commit failed");
                if let Some(listener) = listener {
                    listener.error_occurred(&error);
                }
                Err(error)
            }
        }
    }

    /// Rollback: synchronous discard before any sequencing can
    /// trigger.
    pub(crate) fn rollback_unit(self: Arc<Self>, transaction: &UnitOfWork) -> KResult<()> {
        let listener = transaction.callback();
        {
            let mut tx = transaction.lock_state();
            if tx.state != State::NotStarted {
                return Err(KError::invalid_state("rollback", tx.state));
            }
            tx.changes.clear();
            tx.state = State::RolledBack;
        }
        debug!(tx = transaction.name(), "transaction rolled back");
        if let Some(listener) = listener {
            listener.respond();
        }
        Ok(())
    }
}
