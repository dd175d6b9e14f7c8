//! The shared committed tree.

use crate::change::{AppliedChange, ChangeKind, ChangeOp, ChangeSet, NodeChange};
use crate::error::{StoreError, StoreResult};
use crate::node::NodeRecord;
use crate::path::NodePath;
use parking_lot::RwLock;
use std::collections::HashMap;

/// The committed node tree.
///
/// A single shared mutable structure guarded by one `RwLock`.
/// Readers take snapshots of individual records; writers serialize
/// through `apply` and `ensure_path`. The lock is the tree's only
/// concurrency primitive and callers never see it.
pub struct NodeTree {
    state: RwLock<TreeState>,
}

struct TreeState {
    nodes: HashMap<NodePath, NodeRecord>,
}

impl NodeTree {
    /// Creates a tree containing only a root node of the given type.
    #[must_use]
    pub fn new(root_type: impl Into<String>) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(NodePath::root(), NodeRecord::new(root_type));
        Self {
            state: RwLock::new(TreeState { nodes }),
        }
    }

    /// Returns a snapshot of the record at `path`, if present.
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<NodeRecord> {
        self.state.read().nodes.get(path).cloned()
    }

    /// Returns true if a node exists at `path`.
    #[must_use]
    pub fn exists(&self, path: &NodePath) -> bool {
        self.state.read().nodes.contains_key(path)
    }

    /// Returns the child paths of `path`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `path` does not resolve.
    pub fn children(&self, path: &NodePath) -> StoreResult<Vec<NodePath>> {
        let state = self.state.read();
        let record = state
            .nodes
            .get(path)
            .ok_or_else(|| StoreError::not_found(path.as_str()))?;
        record
            .children
            .iter()
            .map(|name| path.join(name))
            .collect()
    }

    /// Returns the number of nodes, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// Applies a change-set atomically.
    ///
    /// The whole change-set is validated against a working copy of
    /// the tree; if any operation fails, nothing is applied and the
    /// error is returned. On success the committed effects are
    /// returned for the caller's sequencing layer.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure: `NotFound` for a missing
    /// parent or target, `AlreadyExists` for a sibling-name
    /// collision, `RootImmutable` for operations targeting `/`.
    pub fn apply(&self, change_set: &ChangeSet) -> StoreResult<AppliedChange> {
        let mut state = self.state.write();

        // Work on a copy so a mid-list failure leaves the committed
        // tree untouched.
        let mut working = state.nodes.clone();
        let mut applied = AppliedChange::default();

        for op in change_set.ops() {
            Self::apply_op(&mut working, op, &mut applied)?;
        }

        state.nodes = working;
        Ok(applied)
    }

    fn apply_op(
        nodes: &mut HashMap<NodePath, NodeRecord>,
        op: &ChangeOp,
        applied: &mut AppliedChange,
    ) -> StoreResult<()> {
        match op {
            ChangeOp::AddNode { path, primary_type } => {
                if path.is_root() {
                    return Err(StoreError::RootImmutable);
                }
                let parent_path = path.parent().ok_or(StoreError::RootImmutable)?;
                let name = path
                    .name()
                    .ok_or(StoreError::RootImmutable)?
                    .to_string();
                let parent = nodes
                    .get_mut(&parent_path)
                    .ok_or_else(|| StoreError::not_found(parent_path.as_str()))?;
                if parent.children.iter().any(|c| *c == name) {
                    return Err(StoreError::already_exists(path.as_str()));
                }
                parent.children.push(name);
                nodes.insert(path.clone(), NodeRecord::new(primary_type.clone()));
                applied.changes.push(NodeChange {
                    path: path.clone(),
                    primary_type: primary_type.clone(),
                    kind: ChangeKind::NodeAdded,
                });
            }
            ChangeOp::RemoveNode { path } => {
                if path.is_root() {
                    return Err(StoreError::RootImmutable);
                }
                let record = nodes
                    .get(path)
                    .ok_or_else(|| StoreError::not_found(path.as_str()))?
                    .clone();
                nodes.retain(|p, _| !p.starts_with(path));
                if let Some(parent_path) = path.parent() {
                    if let Some(parent) = nodes.get_mut(&parent_path) {
                        let name = path.name().unwrap_or_default();
                        parent.children.retain(|c| c != name);
                    }
                }
                applied.changes.push(NodeChange {
                    path: path.clone(),
                    primary_type: record.primary_type,
                    kind: ChangeKind::NodeRemoved,
                });
            }
            ChangeOp::SetProperty { path, name, value } => {
                let record = nodes
                    .get_mut(path)
                    .ok_or_else(|| StoreError::not_found(path.as_str()))?;
                match value {
                    Some(v) => {
                        record.properties.insert(name.clone(), v.clone());
                    }
                    None => {
                        record.properties.remove(name);
                    }
                }
                applied.changes.push(NodeChange {
                    path: path.clone(),
                    primary_type: record.primary_type.clone(),
                    kind: ChangeKind::PropertyChanged { name: name.clone() },
                });
            }
            ChangeOp::AddMixin { path, mixin } => {
                let record = nodes
                    .get_mut(path)
                    .ok_or_else(|| StoreError::not_found(path.as_str()))?;
                if !record.mixins.iter().any(|m| m == mixin) {
                    record.mixins.push(mixin.clone());
                    applied.changes.push(NodeChange {
                        path: path.clone(),
                        primary_type: record.primary_type.clone(),
                        kind: ChangeKind::MixinAdded {
                            mixin: mixin.clone(),
                        },
                    });
                }
            }
        }
        Ok(())
    }

    /// Creates the node at `path` if absent (create-if-absent).
    ///
    /// Idempotent and atomic under the tree's write lock: concurrent
    /// callers for the same path observe exactly one creation.
    /// Returns true if this call created the node. The parent must
    /// already exist; `ensure_path` never creates intermediates
    /// implicitly.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the parent path does not
    /// resolve.
    pub fn ensure_path(&self, path: &NodePath, primary_type: &str) -> StoreResult<bool> {
        let mut state = self.state.write();
        if state.nodes.contains_key(path) {
            return Ok(false);
        }
        let parent_path = path.parent().ok_or(StoreError::RootImmutable)?;
        let name = path
            .name()
            .ok_or(StoreError::RootImmutable)?
            .to_string();
        let parent = state
            .nodes
            .get_mut(&parent_path)
            .ok_or_else(|| StoreError::not_found(parent_path.as_str()))?;
        parent.children.push(name);
        state
            .nodes
            .insert(path.clone(), NodeRecord::new(primary_type));
        Ok(true)
    }
}

impl std::fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTree")
            .field("node_count", &self.node_count())
            .finish_non_exhaustive()
    }
}
