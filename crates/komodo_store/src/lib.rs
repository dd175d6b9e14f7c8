//! # Komodo Store
//!
//! Hierarchical node store for the Komodo repository.
//!
//! This crate is the lowest layer of the repository: a shared tree of
//! typed nodes addressed by absolute path. It knows nothing about
//! transactions, sequencing, or workspaces - those live in
//! `komodo_core`. What it does guarantee:
//!
//! - Paths resolve uniquely; sibling names are unique
//! - Change-sets apply all-or-nothing under the tree's write lock
//! - `ensure_path` is an idempotent create-if-absent primitive
//!
//! The tree's own locking is the serialization point for concurrent
//! writers; callers treat it as opaque.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod error;
mod node;
mod path;
mod tree;
mod value;

pub use change::{AppliedChange, ChangeKind, ChangeOp, ChangeSet, NodeChange};
pub use error::{StoreError, StoreResult};
pub use node::{NodeId, NodeRecord};
pub use path::NodePath;
pub use tree::NodeTree;
pub use value::PropertyValue;
