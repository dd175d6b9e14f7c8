//! Asynchronous content derivation.
//!
//! Sequencing derives structured content from newly committed
//! artifacts (for example, parsing a deployed VDB's raw content into
//! typed metadata nodes). Sequencers run out-of-band on background
//! threads after a commit; the committing transaction is not
//! considered complete by its listener until every job spawned by
//! that specific commit has resolved.

mod coordinator;

pub(crate) use coordinator::dispatch;

use crate::error::KResult;
use komodo_store::{ChangeSet, NodeChange, NodePath, NodeRecord, NodeTree};
use std::sync::Arc;

/// Read access handed to an executing sequencer job.
///
/// Jobs read the committed tree (their triggering commit is already
/// visible) and return a change-set of derived content. Derived
/// change-sets apply without another sequencing pass, so sequencers
/// cannot trigger themselves.
pub struct SequencerContext {
    tree: Arc<NodeTree>,
}

impl SequencerContext {
    pub(crate) fn new(tree: Arc<NodeTree>) -> Self {
        Self { tree }
    }

    /// Returns the committed record at `path`, if present.
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<NodeRecord> {
        self.tree.get(path)
    }

    /// Returns the committed child paths of `path`.
    ///
    /// # Errors
    ///
    /// Returns a store not-found error if `path` does not resolve.
    pub fn children(&self, path: &NodePath) -> KResult<Vec<NodePath>> {
        Ok(self.tree.children(path)?)
    }
}

/// A registered content deriver.
///
/// The coordinator offers every committed change to every registered
/// sequencer; each `monitored` match dispatches one background job.
pub trait Sequencer: Send + Sync {
    /// Stable name, used in logs and failure reports.
    fn name(&self) -> &str;

    /// Returns true if this sequencer wants to run for the change.
    fn monitored(&self, change: &NodeChange) -> bool;

    /// Derives content for a monitored change.
    ///
    /// # Errors
    ///
    /// A failure here is reported through the transaction listener's
    /// error channel; it never affects the committed transaction.
    fn execute(&self, ctx: &SequencerContext, change: &NodeChange) -> KResult<ChangeSet>;
}
