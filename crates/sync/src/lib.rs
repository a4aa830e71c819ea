//! Cross-view synchronization of classification trees.
//!
//! A view that changes a tree publishes `classification-updated`; every other
//! view refetches when the event concerns the project it displays.

pub mod bridge;
pub mod event;
pub mod local;
pub mod pubsub;

pub use bridge::RefreshBridge;
pub use event::{PubSubEvent, channels};
pub use local::LocalBus;
pub use pubsub::RedisPubSub;
