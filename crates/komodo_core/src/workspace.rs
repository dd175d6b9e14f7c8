//! Workspace path resolution.
//!
//! Layout: the repository root node `/tko:komodo` carries the shared
//! workspace `/tko:komodo/tko:workspace`, under which each user owns
//! a home node `/tko:komodo/tko:workspace/{user}`. Homes (and the
//! chain above them) are created lazily on first access through the
//! store's create-if-absent primitive, so concurrent first access by
//! two transactions for one user yields exactly one home node.

use crate::error::KResult;
use crate::lexicon;
use crate::transaction::UnitOfWork;
use komodo_store::{NodePath, NodeTree, StoreResult};

/// Path of the repository root node (`/tko:komodo`).
pub(crate) fn komodo_root_path() -> StoreResult<NodePath> {
    NodePath::root().join(lexicon::komodo::NODE_TYPE)
}

/// Path of the shared workspace node.
pub(crate) fn workspace_root_path() -> StoreResult<NodePath> {
    komodo_root_path()?.join(lexicon::komodo::WORKSPACE)
}

/// Path of a user's home node.
pub(crate) fn home_path(user: &str) -> StoreResult<NodePath> {
    workspace_root_path()?.join(user)
}

/// Derives the caller's workspace home path from the transaction's
/// originating user.
pub fn komodo_workspace_path(transaction: &UnitOfWork) -> KResult<NodePath> {
    Ok(home_path(transaction.user_name())?)
}

/// Creates the root and workspace nodes if absent.
pub(crate) fn ensure_workspace(tree: &NodeTree) -> StoreResult<NodePath> {
    let root = komodo_root_path()?;
    tree.ensure_path(&root, lexicon::komodo::NODE_TYPE)?;
    let workspace = workspace_root_path()?;
    tree.ensure_path(&workspace, lexicon::komodo::WORKSPACE_TYPE)?;
    Ok(workspace)
}

/// Creates the user's home node (and the chain above it) if absent.
pub(crate) fn ensure_home(tree: &NodeTree, user: &str) -> StoreResult<NodePath> {
    ensure_workspace(tree)?;
    let home = home_path(user)?;
    tree.ensure_path(&home, lexicon::komodo::HOME)?;
    Ok(home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn home_path_is_per_user() {
        let path = home_path("elvis").unwrap();
        assert_eq!(path.as_str(), "/tko:komodo/tko:workspace/elvis");
    }

    #[test]
    fn ensure_home_creates_chain() {
        let tree = NodeTree::new(lexicon::mode::ROOT);
        let home = ensure_home(&tree, "user").unwrap();

        assert!(tree.exists(&komodo_root_path().unwrap()));
        assert!(tree.exists(&workspace_root_path().unwrap()));
        let record = tree.get(&home).unwrap();
        assert_eq!(record.primary_type, lexicon::komodo::HOME);
    }

    #[test]
    fn ensure_home_is_idempotent() {
        let tree = NodeTree::new(lexicon::mode::ROOT);
        let first = ensure_home(&tree, "user").unwrap();
        let id = tree.get(&first).unwrap().id;

        let second = ensure_home(&tree, "user").unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.get(&second).unwrap().id, id);
    }

    #[test]
    fn concurrent_first_access_creates_one_home() {
        let tree = Arc::new(NodeTree::new(lexicon::mode::ROOT));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let tree = Arc::clone(&tree);
            handles.push(thread::spawn(move || {
                ensure_home(&tree, "newUser").unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let children = tree.children(&workspace_root_path().unwrap()).unwrap();
        assert_eq!(children, vec![home_path("newUser").unwrap()]);
    }
}
