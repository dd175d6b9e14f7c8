//! Error types for the repository core.
//!
//! `KError` is the single flat propagation channel out of the core;
//! store errors, validation failures, and sequencing failures are all
//! wrapped into it at the boundary. Expected outcomes (not-found,
//! state preconditions) get their own variants so callers can branch
//! on them instead of parsing messages.

use komodo_store::StoreError;
use thiserror::Error;

/// Result type for repository core operations.
pub type KResult<T> = Result<T, KError>;

/// Errors that can occur in repository core operations.
#[derive(Debug, Error, Clone)]
pub enum KError {
    /// Node store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No object exists at the requested path.
    #[error("object not found: {path}")]
    NotFound {
        /// The path that did not resolve.
        path: String,
    },

    /// The repository is not in the `Reachable` state.
    #[error("repository is not reachable")]
    RepositoryNotReachable,

    /// An operation ran against a transaction in the wrong state.
    /// Always a programming error, never retried.
    #[error("transaction state violation in {operation}: transaction is {actual}")]
    InvalidState {
        /// The operation that was attempted.
        operation: String,
        /// The transaction state it found.
        actual: String,
    },

    /// An object could not be resolved to the requested typed view.
    #[error("type mismatch at {path}: expected {expected}, found {actual}")]
    TypeMismatch {
        /// Path of the object.
        path: String,
        /// The required type descriptor.
        expected: String,
        /// The primary type actually present.
        actual: String,
    },

    /// A sequencing job failed. Reported through the listener's
    /// error channel; never fatal to an already-committed transaction.
    #[error("sequencer {sequencer} failed: {message}")]
    Sequencing {
        /// Name of the failing sequencer.
        sequencer: String,
        /// Description of the failure.
        message: String,
    },

    /// Subtree export failed.
    #[error("export failed: {message}")]
    Export {
        /// Description of the failure.
        message: String,
    },
}

impl KError {
    /// Creates a not-found error for a path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a state-precondition error.
    pub fn invalid_state(operation: impl Into<String>, actual: impl ToString) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            actual: actual.to_string(),
        }
    }

    /// Creates a sequencing failure.
    pub fn sequencing(sequencer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sequencing {
            sequencer: sequencer.into(),
            message: message.into(),
        }
    }

    /// True for either flavor of not-found (core or store level).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Store(StoreError::NotFound { .. })
        )
    }
}
