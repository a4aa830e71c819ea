//! In-process event bus for views sharing one runtime.

use async_trait::async_trait;
use masterplan_common::AppResult;
use masterplan_core::services::EventPublisher;
use tokio::sync::broadcast;
use tracing::debug;

use crate::event::PubSubEvent;

/// Broadcast bus delivering events to every live subscriber in the process.
#[derive(Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<PubSubEvent>,
}

impl LocalBus {
    /// Create a bus that buffers up to `capacity` events per slow subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver `event` to current subscribers. Nobody listening is not an error.
    pub fn publish(&self, event: PubSubEvent) {
        match self.tx.send(event) {
            Ok(receivers) => debug!(receivers, "Published local event"),
            Err(_) => debug!("No local subscribers for event"),
        }
    }

    /// Get a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PubSubEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventPublisher for LocalBus {
    async fn publish_classification_updated(&self, project_id: Option<i64>) -> AppResult<()> {
        self.publish(PubSubEvent::ClassificationUpdated { project_id });
        Ok(())
    }
}
