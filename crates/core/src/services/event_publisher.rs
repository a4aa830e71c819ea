//! Event publisher service.
//!
//! Provides an abstraction for announcing that a project's classification tree
//! changed. The transports are provided by the sync crate (in-process bus or
//! Redis Pub/Sub).

use async_trait::async_trait;
use masterplan_common::AppResult;
use std::sync::Arc;

/// Trait for publishing tree-changed notifications.
///
/// This allows the store to notify other views without depending on the
/// transport. Delivery is fire-and-forget and at most once.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Announce that the classification tree of `project_id` changed.
    ///
    /// `None` tells every listener to refresh regardless of project.
    async fn publish_classification_updated(&self, project_id: Option<i64>) -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for single-view use or testing.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_classification_updated(&self, _project_id: Option<i64>) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `EventPublisher` trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;
