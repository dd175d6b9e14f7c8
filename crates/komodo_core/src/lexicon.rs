//! Node schema vocabulary.
//!
//! Type and property names come from external lexicons; the core
//! treats them as opaque constants and never interprets their
//! semantics beyond existence checks.

/// Komodo namespace (`tko:`) names.
pub mod komodo {
    /// Primary type and path segment of the repository root node.
    pub const NODE_TYPE: &str = "tko:komodo";
    /// Name of the shared workspace child under the root.
    pub const WORKSPACE: &str = "tko:workspace";
    /// Primary type of the shared workspace node.
    pub const WORKSPACE_TYPE: &str = "tko:workspaces";
    /// Primary type of a per-user home node.
    pub const HOME: &str = "tko:home";
}

/// Generic node type (`nt:`) names.
pub mod nt {
    /// Default primary type for untyped objects.
    pub const UNSTRUCTURED: &str = "nt:unstructured";
}

/// Store-internal (`mode:`) names.
pub mod mode {
    /// Primary type of the store root node.
    pub const ROOT: &str = "mode:root";
}

/// Virtual database (`vdb:`) names.
pub mod vdb {
    /// Primary type of a virtual database node.
    pub const VIRTUAL_DATABASE: &str = "vdb:virtualDatabase";
    /// Description property.
    pub const DESCRIPTION: &str = "vdb:description";
    /// Version property.
    pub const VERSION: &str = "vdb:version";
    /// Original deployment file name property.
    pub const ORIGINAL_FILE: &str = "vdb:originalFile";
    /// Raw deployed content property; the sequencing trigger.
    pub const CONTENT: &str = "vdb:content";
}
