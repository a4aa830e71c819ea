//! Redis transport round trip. Needs a running Redis:
//!
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 cargo test -p masterplan-sync -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use masterplan_core::services::EventPublisher;
use masterplan_sync::{PubSubEvent, RedisPubSub};
use tokio::time::{sleep, timeout};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_event_crosses_processes() {
    let channel = "classification-updates-test";
    let publisher = RedisPubSub::new(&redis_url(), channel, 16).await.unwrap();
    let listener = RedisPubSub::new(&redis_url(), channel, 16).await.unwrap();
    listener.start().await.unwrap();
    let mut rx = listener.subscribe_local();
    sleep(Duration::from_millis(100)).await;

    publisher.publish_classification_updated(Some(42)).await.unwrap();

    let event = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, PubSubEvent::ClassificationUpdated { project_id: Some(42) });

    listener.shutdown().await.unwrap();
    publisher.shutdown().await.unwrap();
}
