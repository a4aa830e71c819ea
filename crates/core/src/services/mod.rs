//! Services of the classification client.

#![allow(missing_docs)]

pub mod backend;
pub mod classification;
pub mod event_publisher;
pub mod task;

pub use backend::{BackendService, ClassificationBackend};
pub use classification::{ClassificationStore, NewClassification};
pub use event_publisher::{EventPublisher, EventPublisherService, NoOpEventPublisher};
pub use task::TaskDraft;
