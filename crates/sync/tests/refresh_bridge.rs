//! Two stores over one backend, kept in sync through the local bus.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use masterplan_core::services::{ClassificationStore, EventPublisher, NoOpEventPublisher};
use masterplan_core::test_utils::{InMemoryBackend, sample_fixture};
use masterplan_core::tree;
use masterplan_sync::{LocalBus, RefreshBridge};
use tokio::sync::watch;
use tokio::time::timeout;

async fn loaded_store(
    backend: &Arc<InMemoryBackend>,
    publisher: Arc<dyn EventPublisher>,
    project_id: Option<i64>,
) -> Arc<ClassificationStore> {
    let store = Arc::new(ClassificationStore::new(backend.clone(), publisher));
    store.select_project(project_id).await;
    store.load().await.unwrap();
    store
}

async fn next_change(rx: &mut watch::Receiver<u64>) {
    timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("store was not refreshed")
        .unwrap();
}

#[tokio::test]
async fn test_second_view_sees_delete() {
    let backend = Arc::new(InMemoryBackend::with_fixture(&sample_fixture()));
    let bus = LocalBus::new(16);

    let editor = loaded_store(&backend, Arc::new(bus.clone()), Some(42)).await;
    let viewer = loaded_store(&backend, Arc::new(NoOpEventPublisher), Some(42)).await;
    let _bridge = RefreshBridge::new(viewer.clone()).start(bus.subscribe());
    let mut changes = viewer.subscribe_changes();

    editor.delete(15).await.unwrap();
    next_change(&mut changes).await;

    let tree = viewer.tree().await;
    assert!(tree::find_node_by_id(&tree, 15).is_none());
    assert!(tree::find_node_by_id(&tree, 7).unwrap().is_leaf());
}

#[tokio::test]
async fn test_bridge_skips_other_projects() {
    let backend = Arc::new(InMemoryBackend::with_fixture(&sample_fixture()));
    let bus = LocalBus::new(16);
    let viewer = loaded_store(&backend, Arc::new(NoOpEventPublisher), Some(42)).await;
    let _bridge = RefreshBridge::new(viewer.clone()).start(bus.subscribe());
    let mut changes = viewer.subscribe_changes();
    let before = backend.tree_requests();

    // Events are handled in order, so once the second one has refreshed the
    // store the first one has already been skipped.
    bus.publish_classification_updated(Some(99)).await.unwrap();
    bus.publish_classification_updated(None).await.unwrap();
    next_change(&mut changes).await;

    assert_eq!(backend.tree_requests(), before + 1);
}

#[tokio::test]
async fn test_bridge_stops_when_bus_dropped() {
    let backend = Arc::new(InMemoryBackend::with_fixture(&sample_fixture()));
    let viewer = loaded_store(&backend, Arc::new(NoOpEventPublisher), Some(42)).await;

    let bus = LocalBus::new(4);
    let handle = RefreshBridge::new(viewer).start(bus.subscribe());
    drop(bus);

    timeout(Duration::from_secs(2), handle)
        .await
        .expect("bridge did not stop")
        .unwrap();
}
