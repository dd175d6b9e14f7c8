//! Staged change-sets and applied-change descriptions.

use crate::path::NodePath;
use crate::value::PropertyValue;

/// One staged operation against the tree.
///
/// Tree operations are order-sensitive (a property can be set on a
/// node added earlier in the same change-set), so a change-set is an
/// ordered op list rather than a keyed map.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOp {
    /// Add a node under an existing parent. Never creates
    /// intermediate nodes.
    AddNode {
        /// Absolute path of the new node.
        path: NodePath,
        /// Primary type name.
        primary_type: String,
    },
    /// Remove a node and its whole subtree.
    RemoveNode {
        /// Absolute path of the node to remove.
        path: NodePath,
    },
    /// Set a property, or remove it when `value` is `None`.
    SetProperty {
        /// Absolute path of the owning node.
        path: NodePath,
        /// Property name.
        name: String,
        /// New value, or `None` to remove.
        value: Option<PropertyValue>,
    },
    /// Add a mixin type to a node.
    AddMixin {
        /// Absolute path of the owning node.
        path: NodePath,
        /// Mixin type name.
        mixin: String,
    },
}

impl ChangeOp {
    /// The path the operation targets.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        match self {
            Self::AddNode { path, .. }
            | Self::RemoveNode { path }
            | Self::SetProperty { path, .. }
            | Self::AddMixin { path, .. } => path,
        }
    }
}

/// An ordered list of staged operations, applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    ops: Vec<ChangeOp>,
}

impl ChangeSet {
    /// Creates an empty change-set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an add-node operation.
    pub fn add_node(&mut self, path: NodePath, primary_type: impl Into<String>) {
        self.ops.push(ChangeOp::AddNode {
            path,
            primary_type: primary_type.into(),
        });
    }

    /// Stages a remove-node operation.
    pub fn remove_node(&mut self, path: NodePath) {
        self.ops.push(ChangeOp::RemoveNode { path });
    }

    /// Stages a set-property operation (`None` removes).
    pub fn set_property(
        &mut self,
        path: NodePath,
        name: impl Into<String>,
        value: Option<PropertyValue>,
    ) {
        self.ops.push(ChangeOp::SetProperty {
            path,
            name: name.into(),
            value,
        });
    }

    /// Stages an add-mixin operation.
    pub fn add_mixin(&mut self, path: NodePath, mixin: impl Into<String>) {
        self.ops.push(ChangeOp::AddMixin {
            path,
            mixin: mixin.into(),
        });
    }

    /// Returns the staged operations in order.
    #[must_use]
    pub fn ops(&self) -> &[ChangeOp] {
        &self.ops
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the number of staged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Drops all staged operations.
    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

/// The kind of effect a committed operation had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// A node was added.
    NodeAdded,
    /// A node (and its subtree) was removed.
    NodeRemoved,
    /// A property was set or removed.
    PropertyChanged {
        /// The property name.
        name: String,
    },
    /// A mixin was added.
    MixinAdded {
        /// The mixin type name.
        mixin: String,
    },
}

/// One committed effect, as observed by the sequencing layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeChange {
    /// The affected path.
    pub path: NodePath,
    /// Primary type of the affected node. For removals, the type the
    /// node had before removal.
    pub primary_type: String,
    /// What happened.
    pub kind: ChangeKind,
}

/// The committed effects of one change-set application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedChange {
    /// Effects in application order.
    pub changes: Vec<NodeChange>,
}

impl AppliedChange {
    /// Returns true if the application had no effect.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_keep_order() {
        let mut cs = ChangeSet::new();
        let a = NodePath::parse("/a").unwrap();
        cs.add_node(a.clone(), "nt:unstructured");
        cs.set_property(a.clone(), "p", Some(PropertyValue::from("v")));
        cs.remove_node(a);

        assert_eq!(cs.len(), 3);
        assert!(matches!(cs.ops()[0], ChangeOp::AddNode { .. }));
        assert!(matches!(cs.ops()[1], ChangeOp::SetProperty { .. }));
        assert!(matches!(cs.ops()[2], ChangeOp::RemoveNode { .. }));
    }

    #[test]
    fn clear_empties() {
        let mut cs = ChangeSet::new();
        cs.add_node(NodePath::parse("/a").unwrap(), "t");
        assert!(!cs.is_empty());
        cs.clear();
        assert!(cs.is_empty());
    }
}
