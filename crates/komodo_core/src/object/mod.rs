//! Repository objects.
//!
//! A `KomodoObject` is a reference into the tree - absolute path plus
//! a type id - never a copy of node state. All reads and staged
//! mutations go through a transaction and see that transaction's
//! view of the tree.

mod typed;

pub use typed::{TypedView, Vdb};

use crate::error::{KError, KResult};
use crate::lexicon;
use crate::repository::RepositoryInner;
use crate::transaction::{view_children, view_get, UnitOfWork};
use komodo_store::{NodePath, NodeRecord, PropertyValue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A reference to one node in the repository.
#[derive(Clone)]
pub struct KomodoObject {
    repo: Arc<RepositoryInner>,
    path: NodePath,
    type_id: String,
}

impl KomodoObject {
    pub(crate) fn new(repo: Arc<RepositoryInner>, path: NodePath, type_id: String) -> Self {
        Self {
            repo,
            path,
            type_id,
        }
    }

    /// Returns the node name (final path segment).
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name().unwrap_or_default()
    }

    /// Returns the absolute path.
    #[must_use]
    pub fn absolute_path(&self) -> &str {
        self.path.as_str()
    }

    /// Returns the path as a value.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Returns the type id the object was created with.
    #[must_use]
    pub fn type_identifier(&self) -> &str {
        &self.type_id
    }

    fn record(&self, transaction: &UnitOfWork) -> KResult<NodeRecord> {
        transaction.require_not_started("read")?;
        transaction
            .with_changes(|changes| view_get(&self.repo.tree, changes, &self.path))
            .ok_or_else(|| KError::not_found(self.path.as_str()))
    }

    /// Returns the primary type name.
    pub fn primary_type(&self, transaction: &UnitOfWork) -> KResult<String> {
        Ok(self.record(transaction)?.primary_type)
    }

    /// Returns the mixin type names.
    pub fn mixins(&self, transaction: &UnitOfWork) -> KResult<Vec<String>> {
        Ok(self.record(transaction)?.mixins)
    }

    /// Returns true if the node carries `type_name` as primary type
    /// or mixin.
    pub fn has_descriptor(&self, transaction: &UnitOfWork, type_name: &str) -> KResult<bool> {
        Ok(self.record(transaction)?.has_type(type_name))
    }

    /// Returns the parent object, or `None` at the top of the
    /// visible tree (the store root is not exposed).
    pub fn parent(&self, transaction: &UnitOfWork) -> KResult<Option<KomodoObject>> {
        transaction.require_not_started("parent")?;
        let Some(parent_path) = self.path.parent() else {
            return Ok(None);
        };
        if parent_path.is_root() {
            return Ok(None);
        }
        let record = transaction
            .with_changes(|changes| view_get(&self.repo.tree, changes, &parent_path))
            .ok_or_else(|| KError::not_found(parent_path.as_str()))?;
        Ok(Some(KomodoObject::new(
            Arc::clone(&self.repo),
            parent_path,
            record.primary_type,
        )))
    }

    /// Returns true if a child with `name` exists.
    pub fn has_child(&self, transaction: &UnitOfWork, name: &str) -> KResult<bool> {
        Ok(self.get_child(transaction, name)?.is_some())
    }

    /// Returns the child with `name`, if present.
    pub fn get_child(
        &self,
        transaction: &UnitOfWork,
        name: &str,
    ) -> KResult<Option<KomodoObject>> {
        transaction.require_not_started("get_child")?;
        let child_path = self.path.join(name)?;
        let record = transaction
            .with_changes(|changes| view_get(&self.repo.tree, changes, &child_path));
        Ok(record.map(|r| KomodoObject::new(Arc::clone(&self.repo), child_path, r.primary_type)))
    }

    /// Returns all children in order.
    pub fn children(&self, transaction: &UnitOfWork) -> KResult<Vec<KomodoObject>> {
        transaction.require_not_started("children")?;
        let paths = transaction
            .with_changes(|changes| view_children(&self.repo.tree, changes, &self.path))
            .ok_or_else(|| KError::not_found(self.path.as_str()))?;
        let mut children = Vec::with_capacity(paths.len());
        for path in paths {
            let record = transaction
                .with_changes(|changes| view_get(&self.repo.tree, changes, &path))
                .ok_or_else(|| KError::not_found(path.as_str()))?;
            children.push(KomodoObject::new(
                Arc::clone(&self.repo),
                path,
                record.primary_type,
            ));
        }
        Ok(children)
    }

    /// Stages a child node under this object.
    ///
    /// # Errors
    ///
    /// `KError::NotFound` if this object does not resolve in the
    /// transaction's view; `KError::InvalidState` if the transaction
    /// has finished.
    pub fn add_child(
        &self,
        transaction: &UnitOfWork,
        name: &str,
        primary_type: Option<&str>,
    ) -> KResult<KomodoObject> {
        self.record(transaction)?;
        let path = self.path.join(name)?;
        let primary_type = primary_type.unwrap_or(lexicon::nt::UNSTRUCTURED).to_string();
        let staged = (path.clone(), primary_type.clone());
        transaction.stage("add_child", move |changes| {
            changes.add_node(staged.0, staged.1);
        })?;
        Ok(KomodoObject::new(Arc::clone(&self.repo), path, primary_type))
    }

    /// Stages removal of the child with `name` (and its subtree).
    pub fn remove_child(&self, transaction: &UnitOfWork, name: &str) -> KResult<()> {
        let child_path = self.path.join(name)?;
        let exists = transaction
            .with_changes(|changes| view_get(&self.repo.tree, changes, &child_path).is_some());
        if !exists {
            return Err(KError::not_found(child_path.as_str()));
        }
        transaction.stage("remove_child", move |changes| {
            changes.remove_node(child_path);
        })
    }

    /// Returns a property value.
    pub fn get_property(
        &self,
        transaction: &UnitOfWork,
        name: &str,
    ) -> KResult<Option<PropertyValue>> {
        Ok(self.record(transaction)?.property(name).cloned())
    }

    /// Stages a property write; `None` removes the property.
    pub fn set_property(
        &self,
        transaction: &UnitOfWork,
        name: &str,
        value: Option<PropertyValue>,
    ) -> KResult<()> {
        self.record(transaction)?;
        let path = self.path.clone();
        let name = name.to_string();
        transaction.stage("set_property", move |changes| {
            changes.set_property(path, name, value);
        })
    }

    /// Returns the property names present on the node.
    pub fn property_names(&self, transaction: &UnitOfWork) -> KResult<Vec<String>> {
        Ok(self
            .record(transaction)?
            .properties
            .keys()
            .cloned()
            .collect())
    }

    /// Stages a mixin addition.
    pub fn add_mixin(&self, transaction: &UnitOfWork, mixin: &str) -> KResult<()> {
        self.record(transaction)?;
        let path = self.path.clone();
        let mixin = mixin.to_string();
        transaction.stage("add_mixin", move |changes| {
            changes.add_mixin(path, mixin);
        })
    }

    /// Resolves this object into a typed view, validating the
    /// required type descriptor.
    ///
    /// # Errors
    ///
    /// `KError::TypeMismatch` when the node does not carry the
    /// view's type.
    pub fn resolve<T: TypedView>(&self, transaction: &UnitOfWork) -> KResult<T> {
        let record = self.record(transaction)?;
        if !record.has_type(T::NODE_TYPE) {
            return Err(KError::TypeMismatch {
                path: self.path.as_str().to_string(),
                expected: T::NODE_TYPE.to_string(),
                actual: record.primary_type,
            });
        }
        Ok(T::from_object(self.clone()))
    }

    /// Serializes this node's subtree for collaborators.
    ///
    /// Reads occur within the transaction's snapshot; the transaction
    /// must still be in the `NotStarted` state.
    pub fn export(&self, transaction: &UnitOfWork) -> KResult<Vec<u8>> {
        transaction.require_not_started("export")?;
        let node = self.export_node(transaction, &self.path)?;
        serde_json::to_vec_pretty(&node).map_err(|e| KError::Export {
            message: e.to_string(),
        })
    }

    fn export_node(&self, transaction: &UnitOfWork, path: &NodePath) -> KResult<ExportNode> {
        let record = transaction
            .with_changes(|changes| view_get(&self.repo.tree, changes, path))
            .ok_or_else(|| KError::not_found(path.as_str()))?;
        let child_paths = transaction
            .with_changes(|changes| view_children(&self.repo.tree, changes, path))
            .unwrap_or_default();
        let mut children = Vec::with_capacity(child_paths.len());
        for child in child_paths {
            children.push(self.export_node(transaction, &child)?);
        }
        Ok(ExportNode {
            name: path.name().unwrap_or_default().to_string(),
            primary_type: record.primary_type,
            mixins: record.mixins,
            properties: record.properties,
            children,
        })
    }
}

impl fmt::Debug for KomodoObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KomodoObject")
            .field("path", &self.path)
            .field("type_id", &self.type_id)
            .finish()
    }
}

#[derive(Serialize)]
struct ExportNode {
    name: String,
    #[serde(rename = "primaryType")]
    primary_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mixins: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, PropertyValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<ExportNode>,
}
