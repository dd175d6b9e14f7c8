//! Transaction outcome notification.
//!
//! A transaction's listener is notified exactly once: `respond` on
//! success (after all sequencing spawned by the commit has resolved)
//! or `error_occurred` on failure. `SynchronousCallback` bridges that
//! push notification to a blocking `await_completion` for callers
//! that need to observe full completion; `commit()` itself never
//! blocks on sequencing.

use crate::error::KError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Observer for one transaction's outcome.
pub trait UnitOfWorkListener: Send + Sync {
    /// Called once when the transaction (including any sequencing it
    /// triggered) has completed successfully.
    fn respond(&self);

    /// Called once when the transaction or one of its sequencing
    /// jobs failed.
    fn error_occurred(&self, error: &KError);
}

struct Latch {
    completed: bool,
    error: Option<KError>,
}

/// A listener that latches the outcome and supports blocking waits.
///
/// Optionally wraps a delegate listener: the latch observes
/// sequencing completion and forwards the outcome, so the delegate
/// composes with sequencing without being aware of it.
pub struct SynchronousCallback {
    latch: Mutex<Latch>,
    cvar: Condvar,
    delegate: Option<Arc<dyn UnitOfWorkListener>>,
}

impl SynchronousCallback {
    /// Creates a callback with no delegate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            latch: Mutex::new(Latch {
                completed: false,
                error: None,
            }),
            cvar: Condvar::new(),
            delegate: None,
        }
    }

    /// Creates a callback that forwards the outcome to `delegate`.
    #[must_use]
    pub fn with_delegate(delegate: Arc<dyn UnitOfWorkListener>) -> Self {
        Self {
            delegate: Some(delegate),
            ..Self::new()
        }
    }

    /// Blocks until the outcome arrives or `timeout` elapses.
    ///
    /// Returns true if the outcome arrived within the bound. There is
    /// no coordinator-side timeout; callers own the bound and should
    /// be generous.
    pub fn await_completion(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut latch = self.latch.lock();
        while !latch.completed {
            if self.cvar.wait_until(&mut latch, deadline).timed_out() {
                return latch.completed;
            }
        }
        true
    }

    /// Returns true once an error outcome has been latched.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.latch.lock().error.is_some()
    }

    /// Returns the latched error, if any.
    #[must_use]
    pub fn error(&self) -> Option<KError> {
        self.latch.lock().error.clone()
    }

    /// Returns true once either outcome has been latched.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.latch.lock().completed
    }

    /// Latches the outcome; returns false if already latched.
    fn complete(&self, error: Option<KError>) -> bool {
        let mut latch = self.latch.lock();
        if latch.completed {
            return false;
        }
        latch.completed = true;
        latch.error = error;
        self.cvar.notify_all();
        true
    }
}

impl Default for SynchronousCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitOfWorkListener for SynchronousCallback {
    fn respond(&self) {
        if self.complete(None) {
            if let Some(delegate) = &self.delegate {
                delegate.respond();
            }
        }
    }

    fn error_occurred(&self, error: &KError) {
        if self.complete(Some(error.clone())) {
            if let Some(delegate) = &self.delegate {
                delegate.error_occurred(error);
            }
        }
    }
}
