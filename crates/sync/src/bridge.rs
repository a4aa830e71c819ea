//! Bridge from change notifications to store refreshes.

use std::sync::Arc;

use masterplan_core::services::ClassificationStore;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::event::PubSubEvent;

/// Refreshes a store whenever another view announces a relevant change.
pub struct RefreshBridge {
    store: Arc<ClassificationStore>,
}

impl RefreshBridge {
    /// Create a new bridge.
    #[must_use]
    pub const fn new(store: Arc<ClassificationStore>) -> Self {
        Self { store }
    }

    /// Start the bridge, consuming events from `rx` until the channel closes.
    pub fn start(self, mut rx: broadcast::Receiver<PubSubEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.handle(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Refresh bridge lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Refresh bridge channel closed");
                        break;
                    }
                }
            }
        })
    }

    async fn handle(&self, event: &PubSubEvent) {
        let project_id = event.project_id();
        if !self.store.should_refresh(project_id).await {
            debug!(?project_id, "Ignoring update for another project");
            return;
        }
        if let Err(e) = self.store.refresh().await {
            warn!(?project_id, error = %e, "Refresh after remote update failed");
        }
    }
}
