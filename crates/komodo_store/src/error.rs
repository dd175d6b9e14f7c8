//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the node store.
///
/// Not-found and already-exists are expected, frequently-tested
/// outcomes and get their own variants rather than being folded into
/// a generic failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No node exists at the requested path.
    #[error("node not found: {path}")]
    NotFound {
        /// The path that did not resolve.
        path: String,
    },

    /// A sibling with the requested name already exists.
    #[error("node already exists: {path}")]
    AlreadyExists {
        /// The colliding path.
        path: String,
    },

    /// A path string could not be parsed.
    #[error("invalid path: {message}")]
    InvalidPath {
        /// Description of the problem.
        message: String,
    },

    /// The root node cannot be added, removed, or re-typed.
    #[error("operation not permitted on the root node")]
    RootImmutable,
}

impl StoreError {
    /// Creates a not-found error for a path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an already-exists error for a path.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Creates an invalid-path error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath {
            message: message.into(),
        }
    }
}
