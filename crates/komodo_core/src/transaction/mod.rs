//! Units of work.
//!
//! A unit of work is this system's transaction abstraction: a named,
//! user-attributed set of staged mutations that either commits
//! atomically into the shared tree or is discarded. Mutation is only
//! legal before commit begins; a finished transaction rejects every
//! further operation.

mod unit_of_work;

pub use unit_of_work::{State, UnitOfWork};

pub(crate) use unit_of_work::{view_children, view_exists, view_get};
