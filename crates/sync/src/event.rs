//! Change-notification events and channel names.

use serde::{Deserialize, Serialize};

pub use masterplan_common::channels;

/// Pub/Sub event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PubSubEvent {
    /// A project's classification tree changed.
    ClassificationUpdated {
        /// `None` means every view should refresh.
        #[serde(rename = "projectId", default)]
        project_id: Option<i64>,
    },
}

impl PubSubEvent {
    /// The project the event concerns.
    #[must_use]
    pub const fn project_id(&self) -> Option<i64> {
        match self {
            Self::ClassificationUpdated { project_id } => *project_id,
        }
    }
}
