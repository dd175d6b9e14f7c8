//! Commit-scoped job dispatch and completion tracking.

use crate::callback::UnitOfWorkListener;
use crate::error::KError;
use crate::sequencing::{Sequencer, SequencerContext};
use komodo_store::{AppliedChange, NodeChange, NodeTree};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Tracks the outstanding jobs of one commit and fires the listener
/// exactly once, after the last job finishes.
struct JobTracker {
    state: Mutex<TrackerState>,
    listener: Option<Arc<dyn UnitOfWorkListener>>,
}

struct TrackerState {
    remaining: usize,
    first_error: Option<KError>,
}

impl JobTracker {
    fn new(jobs: usize, listener: Option<Arc<dyn UnitOfWorkListener>>) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                remaining: jobs,
                first_error: None,
            }),
            listener,
        }
    }

    fn job_finished(&self, sequencer: &str, result: Result<(), KError>) {
        let outcome = {
            let mut state = self.state.lock();
            if let Err(error) = result {
                warn!(sequencer, %error, "sequencing job failed");
                if state.first_error.is_none() {
                    state.first_error = Some(error);
                }
            }
            state.remaining -= 1;
            if state.remaining == 0 {
                Some(state.first_error.take())
            } else {
                None
            }
        };

        // Notify outside the lock; the listener may block.
        if let Some(first_error) = outcome {
            self.notify(first_error);
        }
    }

    fn notify(&self, error: Option<KError>) {
        if let Some(listener) = &self.listener {
            match error {
                Some(e) => listener.error_occurred(&e),
                None => listener.respond(),
            }
        }
    }
}

/// Dispatches the sequencing work for one commit.
///
/// Matches the applied changes against the registered sequencers and
/// spawns one background job per match. With zero matches the
/// listener fires immediately from this (the commit) path; otherwise
/// it fires from whichever thread finishes the last job. Job failures
/// are reported, never fatal: the commit stays committed.
pub(crate) fn dispatch(
    tree: Arc<NodeTree>,
    sequencers: Vec<Arc<dyn Sequencer>>,
    applied: &AppliedChange,
    listener: Option<Arc<dyn UnitOfWorkListener>>,
) {
    let mut jobs: Vec<(Arc<dyn Sequencer>, NodeChange)> = Vec::new();
    for change in &applied.changes {
        for sequencer in &sequencers {
            if sequencer.monitored(change) {
                jobs.push((Arc::clone(sequencer), change.clone()));
            }
        }
    }

    if jobs.is_empty() {
        debug!("no sequencable content in commit; completing immediately");
        if let Some(listener) = listener {
            listener.respond();
        }
        return;
    }

    debug!(jobs = jobs.len(), "dispatching sequencing jobs");
    let tracker = Arc::new(JobTracker::new(jobs.len(), listener));

    for (sequencer, change) in jobs {
        let job_tracker = Arc::clone(&tracker);
        let tree = Arc::clone(&tree);
        let thread_name = format!("sequencer-{}", sequencer.name());
        let spawned = thread::Builder::new().name(thread_name).spawn(move || {
            let ctx = SequencerContext::new(Arc::clone(&tree));
            let result = sequencer
                .execute(&ctx, &change)
                .and_then(|derived| {
                    if derived.is_empty() {
                        Ok(())
                    } else {
                        // Derived content applies without another
                        // sequencing pass.
                        tree.apply(&derived).map(|_| ()).map_err(KError::from)
                    }
                });
            debug!(
                sequencer = sequencer.name(),
                path = %change.path,
                ok = result.is_ok(),
                "sequencing job finished"
            );
            job_tracker.job_finished(sequencer.name(), result);
        });

        if let Err(error) = spawned {
            tracker.job_finished(
                "spawn",
                Err(KError::sequencing("spawn", error.to_string())),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KResult;
    use komodo_store::{ChangeKind, ChangeSet, NodePath};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Recorder {
        responded: AtomicUsize,
        errored: AtomicUsize,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                responded: AtomicUsize::new(0),
                errored: AtomicUsize::new(0),
            })
        }
    }

    impl UnitOfWorkListener for Recorder {
        fn respond(&self) {
            self.responded.fetch_add(1, Ordering::SeqCst);
        }

        fn error_occurred(&self, _error: &KError) {
            self.errored.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NullSequencer {
        monitored: bool,
        fail: bool,
    }

    impl Sequencer for NullSequencer {
        fn name(&self) -> &str {
            "null"
        }

        fn monitored(&self, _change: &NodeChange) -> bool {
            self.monitored
        }

        fn execute(&self, _ctx: &SequencerContext, change: &NodeChange) -> KResult<ChangeSet> {
            if self.fail {
                return Err(KError::sequencing("null", "boom"));
            }
            let mut derived = ChangeSet::new();
            derived.add_node(
                change.path.join("derived").map_err(KError::from)?,
                "nt:unstructured",
            );
            Ok(derived)
        }
    }

    fn applied_for(path: &str) -> AppliedChange {
        AppliedChange {
            changes: vec![NodeChange {
                path: NodePath::parse(path).unwrap(),
                primary_type: "nt:unstructured".to_string(),
                kind: ChangeKind::NodeAdded,
            }],
        }
    }

    fn tree_with(path: &str) -> Arc<NodeTree> {
        let tree = NodeTree::new("mode:root");
        let mut cs = ChangeSet::new();
        cs.add_node(NodePath::parse(path).unwrap(), "nt:unstructured");
        tree.apply(&cs).unwrap();
        Arc::new(tree)
    }

    fn settle(recorder: &Recorder) {
        // Jobs run on background threads; poll until the listener fires.
        for _ in 0..500 {
            if recorder.responded.load(Ordering::SeqCst) + recorder.errored.load(Ordering::SeqCst)
                > 0
            {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn zero_jobs_fire_immediately() {
        let recorder = Recorder::new();
        dispatch(
            tree_with("/a"),
            vec![Arc::new(NullSequencer {
                monitored: false,
                fail: false,
            })],
            &applied_for("/a"),
            Some(recorder.clone()),
        );

        // No background work: the listener has already fired.
        assert_eq!(recorder.responded.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.errored.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn job_applies_derived_content_then_responds() {
        let tree = tree_with("/a");
        let recorder = Recorder::new();
        dispatch(
            Arc::clone(&tree),
            vec![Arc::new(NullSequencer {
                monitored: true,
                fail: false,
            })],
            &applied_for("/a"),
            Some(recorder.clone()),
        );

        settle(&recorder);
        assert_eq!(recorder.responded.load(Ordering::SeqCst), 1);
        assert!(tree.exists(&NodePath::parse("/a/derived").unwrap()));
    }

    #[test]
    fn failed_job_reports_error_channel() {
        let recorder = Recorder::new();
        dispatch(
            tree_with("/a"),
            vec![Arc::new(NullSequencer {
                monitored: true,
                fail: true,
            })],
            &applied_for("/a"),
            Some(recorder.clone()),
        );

        settle(&recorder);
        assert_eq!(recorder.errored.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.responded.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_fires_once_for_multiple_jobs() {
        let tree = NodeTree::new("mode:root");
        let mut cs = ChangeSet::new();
        cs.add_node(NodePath::parse("/a").unwrap(), "t");
        cs.add_node(NodePath::parse("/b").unwrap(), "t");
        tree.apply(&cs).unwrap();

        let applied = AppliedChange {
            changes: ["/a", "/b"]
                .iter()
                .map(|p| NodeChange {
                    path: NodePath::parse(p).unwrap(),
                    primary_type: "t".to_string(),
                    kind: ChangeKind::NodeAdded,
                })
                .collect(),
        };

        let recorder = Recorder::new();
        dispatch(
            Arc::new(tree),
            vec![Arc::new(NullSequencer {
                monitored: true,
                fail: false,
            })],
            &applied,
            Some(recorder.clone()),
        );

        settle(&recorder);
        // Give a straggler job time to (incorrectly) double-fire.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(recorder.responded.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.errored.load(Ordering::SeqCst), 0);
    }
}
