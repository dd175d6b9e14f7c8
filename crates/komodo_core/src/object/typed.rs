//! Typed views over generic objects.
//!
//! A typed view is a thin wrapper validated against a required type
//! descriptor; it holds only the underlying object reference, never
//! duplicated state. Resolution happens through
//! [`KomodoObject::resolve`].

use crate::error::KResult;
use crate::lexicon;
use crate::object::KomodoObject;
use crate::transaction::UnitOfWork;
use komodo_store::PropertyValue;

/// A view over objects of one node type.
pub trait TypedView: Sized {
    /// The type descriptor an object must carry to resolve into this
    /// view (primary type or mixin).
    const NODE_TYPE: &'static str;

    /// Wraps an already-validated object.
    fn from_object(object: KomodoObject) -> Self;

    /// Returns the underlying object.
    fn object(&self) -> &KomodoObject;
}

/// A virtual database node.
#[derive(Debug, Clone)]
pub struct Vdb {
    object: KomodoObject,
}

impl TypedView for Vdb {
    const NODE_TYPE: &'static str = lexicon::vdb::VIRTUAL_DATABASE;

    fn from_object(object: KomodoObject) -> Self {
        Self { object }
    }

    fn object(&self) -> &KomodoObject {
        &self.object
    }
}

impl Vdb {
    /// Returns the VDB name (the node name).
    #[must_use]
    pub fn vdb_name(&self) -> &str {
        self.object.name()
    }

    /// Returns the description property.
    pub fn description(&self, transaction: &UnitOfWork) -> KResult<Option<String>> {
        Ok(self
            .object
            .get_property(transaction, lexicon::vdb::DESCRIPTION)?
            .and_then(|v| v.as_str().map(ToString::to_string)))
    }

    /// Stages a description write.
    pub fn set_description(&self, transaction: &UnitOfWork, description: &str) -> KResult<()> {
        self.object.set_property(
            transaction,
            lexicon::vdb::DESCRIPTION,
            Some(PropertyValue::from(description)),
        )
    }

    /// Returns the version property.
    pub fn version(&self, transaction: &UnitOfWork) -> KResult<Option<i64>> {
        Ok(self
            .object
            .get_property(transaction, lexicon::vdb::VERSION)?
            .and_then(|v| v.as_long()))
    }

    /// Stages a version write.
    pub fn set_version(&self, transaction: &UnitOfWork, version: i64) -> KResult<()> {
        self.object.set_property(
            transaction,
            lexicon::vdb::VERSION,
            Some(PropertyValue::from(version)),
        )
    }

    /// Returns the original deployment file name.
    pub fn original_file(&self, transaction: &UnitOfWork) -> KResult<Option<String>> {
        Ok(self
            .object
            .get_property(transaction, lexicon::vdb::ORIGINAL_FILE)?
            .and_then(|v| v.as_str().map(ToString::to_string)))
    }
}
