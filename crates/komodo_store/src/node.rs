//! Node identity and record.

use crate::value::PropertyValue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node.
///
/// Assigned when the node is created and stable for the node's life;
/// paths can change meaning across remove/re-add, ids cannot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Creates a new random node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The stored state of one node.
///
/// Children are kept as an ordered name list; the tree owns the
/// name-to-record mapping. Sibling names are unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    /// Stable node identity.
    pub id: NodeId,
    /// Primary type name (opaque lexicon constant).
    pub primary_type: String,
    /// Mixin type names, in the order added.
    pub mixins: Vec<String>,
    /// Property name to value.
    pub properties: BTreeMap<String, PropertyValue>,
    /// Child names, in insertion order.
    pub children: Vec<String>,
}

impl NodeRecord {
    /// Creates an empty record of the given primary type.
    #[must_use]
    pub fn new(primary_type: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            primary_type: primary_type.into(),
            mixins: Vec::new(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Returns true if the record carries the type as primary or mixin.
    #[must_use]
    pub fn has_type(&self, type_name: &str) -> bool {
        self.primary_type == type_name || self.mixins.iter().any(|m| m == type_name)
    }

    /// Returns a property value by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        assert_ne!(NodeId::new(), NodeId::new());
    }

    #[test]
    fn has_type_checks_primary_and_mixins() {
        let mut record = NodeRecord::new("nt:unstructured");
        record.mixins.push("mix:referenceable".to_string());

        assert!(record.has_type("nt:unstructured"));
        assert!(record.has_type("mix:referenceable"));
        assert!(!record.has_type("vdb:virtualDatabase"));
    }

    #[test]
    fn property_lookup() {
        let mut record = NodeRecord::new("nt:unstructured");
        record
            .properties
            .insert("k".to_string(), PropertyValue::from("v"));
        assert_eq!(record.property("k").and_then(|v| v.as_str()), Some("v"));
        assert!(record.property("missing").is_none());
    }
}
