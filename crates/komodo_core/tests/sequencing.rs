//! End-to-end sequencing tests: commit, background derivation,
//! listener gating.

use komodo_core::{
    ChangeKind, ChangeSet, KError, KResult, NodeChange, PropertyValue, Repository,
    RepositoryConfig, Sequencer, SequencerContext, State, SynchronousCallback,
    UnitOfWorkListener,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TEST_USER: &str = "user";
const TIME_TO_WAIT: Duration = Duration::from_secs(30);

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn repo() -> Repository {
    init_tracing();
    Repository::start(RepositoryConfig::default()).unwrap()
}

/// Derives a `tables` child for every committed VDB node.
struct VdbSequencer {
    fail: bool,
}

impl Sequencer for VdbSequencer {
    fn name(&self) -> &str {
        "vdb"
    }

    fn monitored(&self, change: &NodeChange) -> bool {
        matches!(change.kind, ChangeKind::NodeAdded)
            && change.primary_type == "vdb:virtualDatabase"
    }

    fn execute(&self, ctx: &SequencerContext, change: &NodeChange) -> KResult<ChangeSet> {
        if self.fail {
            return Err(KError::sequencing("vdb", "unparseable content"));
        }
        // The triggering commit is already visible to the job.
        assert!(ctx.get(&change.path).is_some());
        let mut derived = ChangeSet::new();
        derived.add_node(change.path.join("tables").map_err(KError::from)?, "vdb:tables");
        Ok(derived)
    }
}

struct CountingListener {
    responded: AtomicUsize,
    errored: AtomicUsize,
}

impl CountingListener {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            responded: AtomicUsize::new(0),
            errored: AtomicUsize::new(0),
        })
    }
}

impl UnitOfWorkListener for CountingListener {
    fn respond(&self) {
        self.responded.fetch_add(1, Ordering::SeqCst);
    }

    fn error_occurred(&self, _error: &KError) {
        self.errored.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn commit_without_sequencable_content_fires_promptly() {
    let repo = repo();
    repo.register_sequencer(Arc::new(VdbSequencer { fail: false }));

    let callback = Arc::new(SynchronousCallback::new());
    let tx = repo
        .create_transaction(TEST_USER, "plain", false, Some(callback.clone()))
        .unwrap();
    repo.add(&tx, None, "plainNode", None).unwrap();
    tx.commit().unwrap();

    // Nothing monitored, so no background jobs were spawned: the
    // listener fired from the commit path itself.
    assert!(callback.await_completion(Duration::from_secs(2)));
    assert!(!callback.has_error());
}

#[test]
fn sequencing_gates_listener_until_derivation_lands() {
    let repo = repo();
    repo.register_sequencer(Arc::new(VdbSequencer { fail: false }));

    let callback = Arc::new(SynchronousCallback::new());
    let tx = repo
        .create_transaction(TEST_USER, "deploy", false, Some(callback.clone()))
        .unwrap();
    let vdb = repo
        .add(&tx, None, "myVdb", Some("vdb:virtualDatabase"))
        .unwrap();
    vdb.set_property(&tx, "vdb:description", Some(PropertyValue::from("a vdb")))
        .unwrap();
    tx.commit().unwrap();

    assert!(callback.await_completion(TIME_TO_WAIT));
    assert!(!callback.has_error());

    // Derived content is committed by the time the listener fires.
    let check = repo
        .create_transaction(TEST_USER, "check", false, None)
        .unwrap();
    let vdb = repo.get_from_workspace(&check, Some("myVdb")).unwrap().unwrap();
    let tables = vdb.get_child(&check, "tables").unwrap().unwrap();
    assert_eq!(tables.primary_type(&check).unwrap(), "vdb:tables");
}

#[test]
fn listener_fires_once_for_multiple_jobs_in_one_commit() {
    let repo = repo();
    repo.register_sequencer(Arc::new(VdbSequencer { fail: false }));

    let delegate = CountingListener::new();
    let callback = Arc::new(SynchronousCallback::with_delegate(delegate.clone()));
    let tx = repo
        .create_transaction(TEST_USER, "deploy-two", false, Some(callback.clone()))
        .unwrap();
    repo.add(&tx, None, "vdbA", Some("vdb:virtualDatabase")).unwrap();
    repo.add(&tx, None, "vdbB", Some("vdb:virtualDatabase")).unwrap();
    tx.commit().unwrap();

    assert!(callback.await_completion(TIME_TO_WAIT));
    // Give a straggler job time to (incorrectly) double-fire.
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(delegate.responded.load(Ordering::SeqCst), 1);
    assert_eq!(delegate.errored.load(Ordering::SeqCst), 0);

    let check = repo
        .create_transaction(TEST_USER, "check", false, None)
        .unwrap();
    for name in ["vdbA", "vdbB"] {
        let vdb = repo.get_from_workspace(&check, Some(name)).unwrap().unwrap();
        assert!(vdb.has_child(&check, "tables").unwrap());
    }
}

#[test]
fn sequencer_failure_reports_error_without_uncommitting() {
    let repo = repo();
    repo.register_sequencer(Arc::new(VdbSequencer { fail: true }));

    let callback = Arc::new(SynchronousCallback::new());
    let tx = repo
        .create_transaction(TEST_USER, "deploy-bad", false, Some(callback.clone()))
        .unwrap();
    repo.add(&tx, None, "badVdb", Some("vdb:virtualDatabase")).unwrap();
    tx.commit().unwrap();

    assert!(callback.await_completion(TIME_TO_WAIT));
    assert!(callback.has_error());
    assert!(matches!(callback.error(), Some(KError::Sequencing { .. })));

    // The failure is reported, never fatal: the transaction stays
    // committed and the node is present.
    assert_eq!(tx.state(), State::Committed);
    let check = repo
        .create_transaction(TEST_USER, "check", false, None)
        .unwrap();
    assert!(repo.get_from_workspace(&check, Some("badVdb")).unwrap().is_some());
}

#[test]
fn rollback_only_commit_never_dispatches_sequencing() {
    let repo = repo();
    repo.register_sequencer(Arc::new(VdbSequencer { fail: false }));

    let callback = Arc::new(SynchronousCallback::new());
    let tx = repo
        .create_transaction(TEST_USER, "discarded", true, Some(callback.clone()))
        .unwrap();
    repo.add(&tx, None, "phantomVdb", Some("vdb:virtualDatabase")).unwrap();
    tx.commit().unwrap();

    assert!(callback.await_completion(Duration::from_secs(2)));
    assert!(!callback.has_error());
    assert_eq!(tx.state(), State::RolledBack);

    let check = repo
        .create_transaction(TEST_USER, "check", false, None)
        .unwrap();
    assert!(repo
        .get_from_workspace(&check, Some("phantomVdb"))
        .unwrap()
        .is_none());
}
