//! # Komodo Core
//!
//! Transactional repository core for Komodo data-virtualization
//! models.
//!
//! This crate provides:
//! - A [`Repository`] handle with an explicit start/shutdown lifecycle
//! - [`UnitOfWork`] transactions with atomic commit and rollback
//! - A sequencing coordinator that derives content asynchronously
//!   after commit and gates listener notification on job completion
//! - Workspace resolution with lazily created per-user homes
//! - [`KomodoObject`] references with typed-view resolution and
//!   subtree export
//!
//! The hierarchical store itself lives in `komodo_store`; this crate
//! treats its locking as opaque.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod callback;
mod config;
mod error;
pub mod lexicon;
mod object;
mod repository;
pub mod sequencing;
mod transaction;
mod workspace;

pub use callback::{SynchronousCallback, UnitOfWorkListener};
pub use config::RepositoryConfig;
pub use error::{KError, KResult};
pub use object::{KomodoObject, TypedView, Vdb};
pub use repository::{Id, Repository, RepositoryState};
pub use sequencing::{Sequencer, SequencerContext};
pub use transaction::{State, UnitOfWork};
pub use workspace::komodo_workspace_path;

// Store types that appear in this crate's public API.
pub use komodo_store::{ChangeKind, ChangeSet, NodeChange, NodePath, PropertyValue};
