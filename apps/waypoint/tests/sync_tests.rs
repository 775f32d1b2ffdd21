//! # Cache Synchronizer Tests
//!
//! Drives `CacheSynchronizer` against an in-process store and a temporary
//! redb mirror.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use waypoint::{AuthoritativeStore, CacheSynchronizer, SyncOutcome};
use waypoint_core::sample::gateway_dataset;
use waypoint_core::{Dataset, Graph, Node, NodeType, RedbMirror, VersionToken, WizardError};

// =============================================================================
// FAKE STORE
// =============================================================================

struct Published {
    version: VersionToken,
    dataset: Dataset,
    reachable: bool,
}

#[derive(Clone)]
struct FakeStore {
    state: Arc<Mutex<Published>>,
    dataset_fetches: Arc<AtomicUsize>,
}

impl FakeStore {
    fn new(version: &str, dataset: Dataset) -> Self {
        Self {
            state: Arc::new(Mutex::new(Published {
                version: VersionToken::new(version),
                dataset,
                reachable: true,
            })),
            dataset_fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn publish(&self, version: &str, dataset: Dataset) {
        let mut state = self.state.lock().expect("lock");
        state.version = VersionToken::new(version);
        state.dataset = dataset;
    }

    fn set_reachable(&self, reachable: bool) {
        self.state.lock().expect("lock").reachable = reachable;
    }

    fn fetches(&self) -> usize {
        self.dataset_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthoritativeStore for FakeStore {
    async fn fetch_version(&self) -> Result<VersionToken, WizardError> {
        let state = self.state.lock().expect("lock");
        if !state.reachable {
            return Err(WizardError::StoreUnavailable("fake store offline".into()));
        }
        Ok(state.version.clone())
    }

    async fn fetch_dataset(&self) -> Result<Dataset, WizardError> {
        self.dataset_fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().expect("lock");
        if !state.reachable {
            return Err(WizardError::StoreUnavailable("fake store offline".into()));
        }
        Ok(state.dataset.clone())
    }

    fn location(&self) -> String {
        "fake://store".to_string()
    }
}

fn mirror(dir: &tempfile::TempDir) -> RedbMirror {
    RedbMirror::open(dir.path().join("mirror.redb")).expect("open mirror")
}

fn two_roots() -> Dataset {
    let mut dataset = gateway_dataset();
    dataset
        .nodes
        .push(Node::new("second-root", "Another start?", NodeType::Root));
    dataset
}

// =============================================================================
// TESTS
// =============================================================================

#[tokio::test]
async fn first_sync_fills_empty_mirror() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FakeStore::new("v1", gateway_dataset());
    let sync = CacheSynchronizer::new(store.clone(), mirror(&dir));

    let outcome = sync.sync().await.expect("sync");
    assert_eq!(
        outcome,
        SyncOutcome::Reloaded {
            previous: None,
            version: VersionToken::new("v1"),
            nodes: gateway_dataset().nodes.len(),
        }
    );
    assert_eq!(
        sync.local_version().await.expect("version"),
        Some(VersionToken::new("v1"))
    );
}

#[tokio::test]
async fn matching_version_skips_dataset_fetch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FakeStore::new("v1", gateway_dataset());
    let sync = CacheSynchronizer::new(store.clone(), mirror(&dir));

    sync.sync().await.expect("first");
    let outcome = sync.sync().await.expect("second");
    assert_eq!(
        outcome,
        SyncOutcome::UpToDate {
            version: VersionToken::new("v1")
        }
    );
    assert_eq!(store.fetches(), 1);
}

#[tokio::test]
async fn new_version_replaces_mirror() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FakeStore::new("v1", gateway_dataset());
    let sync = CacheSynchronizer::new(store.clone(), mirror(&dir));
    sync.sync().await.expect("first");

    let mut updated = gateway_dataset();
    updated.rules.clear();
    store.publish("v2", updated.clone());

    let outcome = sync.sync().await.expect("second");
    assert!(matches!(
        outcome,
        SyncOutcome::Reloaded { previous: Some(ref p), .. } if p.as_str() == "v1"
    ));

    let handle = sync.mirror();
    let mirror = handle.lock().await;
    let expected = Graph::try_from(updated).expect("valid").to_dataset();
    assert_eq!(mirror.snapshot().expect("snapshot").to_dataset(), expected);
}

#[tokio::test]
async fn invalid_dataset_keeps_last_good_mirror() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FakeStore::new("v1", gateway_dataset());
    let sync = CacheSynchronizer::new(store.clone(), mirror(&dir));
    sync.sync().await.expect("first");

    store.publish("v2", two_roots());
    let result = sync.sync().await;
    assert!(matches!(result, Err(WizardError::GraphIntegrity(_))));

    assert_eq!(
        sync.local_version().await.expect("version"),
        Some(VersionToken::new("v1"))
    );
    let handle = sync.mirror();
    let mirror = handle.lock().await;
    assert_eq!(
        mirror.snapshot().expect("snapshot").to_dataset(),
        Graph::try_from(gateway_dataset()).expect("valid").to_dataset()
    );
}

#[tokio::test]
async fn unreachable_store_leaves_mirror_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FakeStore::new("v1", gateway_dataset());
    let sync = CacheSynchronizer::new(store.clone(), mirror(&dir));
    sync.sync().await.expect("first");

    store.set_reachable(false);
    assert!(matches!(
        sync.force_reload().await,
        Err(WizardError::StoreUnavailable(_))
    ));
    assert_eq!(
        sync.local_version().await.expect("version"),
        Some(VersionToken::new("v1"))
    );
}

#[tokio::test]
async fn hollow_mirror_with_matching_version_is_repaired() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut hollow = mirror(&dir);
    let root_only = Graph::from_dataset(Dataset {
        nodes: vec![Node::new("root", "Start?", NodeType::Root)],
        ..Dataset::default()
    })
    .expect("valid");
    hollow
        .replace_all(&root_only, &VersionToken::new("v1"), None)
        .expect("seed");
    assert!(!hollow.has_root_options().expect("check"));

    let store = FakeStore::new("v1", gateway_dataset());
    let sync = CacheSynchronizer::new(store, hollow);
    let outcome = sync.sync().await.expect("sync");
    assert_eq!(
        outcome,
        SyncOutcome::Repaired {
            version: VersionToken::new("v1"),
            nodes: gateway_dataset().nodes.len(),
        }
    );
    assert!(sync.mirror().lock().await.has_root_options().expect("check"));
}

#[tokio::test]
async fn force_reload_ignores_matching_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FakeStore::new("v1", gateway_dataset());
    let sync = CacheSynchronizer::new(store.clone(), mirror(&dir));
    sync.sync().await.expect("first");

    let outcome = sync.force_reload().await.expect("force");
    assert!(matches!(outcome, SyncOutcome::Reloaded { .. }));
    assert_eq!(store.fetches(), 2);
}

#[tokio::test]
async fn clear_all_forgets_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FakeStore::new("v1", gateway_dataset());
    let sync = CacheSynchronizer::new(store, mirror(&dir));
    sync.sync().await.expect("first");

    sync.clear_all().await.expect("clear");
    assert_eq!(sync.local_version().await.expect("version"), None);
    assert!(!sync.mirror().lock().await.has_root_options().expect("check"));
}

#[tokio::test]
async fn concurrent_syncs_reload_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FakeStore::new("v1", gateway_dataset());
    let first = CacheSynchronizer::new(store.clone(), mirror(&dir));
    let second = CacheSynchronizer::with_shared(store.clone(), first.mirror());

    let (a, b) = tokio::join!(first.sync(), second.sync());
    let outcomes = [a.expect("first"), b.expect("second")];

    let reloads = outcomes
        .iter()
        .filter(|o| matches!(o, SyncOutcome::Reloaded { .. }))
        .count();
    assert_eq!(reloads, 1);
    assert_eq!(store.fetches(), 1);
}
