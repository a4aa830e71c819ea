//! Redis Pub/Sub for cross-process change notification.
//!
//! Lets several client processes watching the same backend refresh each
//! other's trees. Delivery is best effort: nothing is persisted or replayed.

#![allow(missing_docs)]

use async_trait::async_trait;
use fred::clients::{Client, SubscriberClient};
use fred::error::Error as RedisError;
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use masterplan_common::{AppError, AppResult, SyncConfig};
use masterplan_core::services::EventPublisher;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::event::PubSubEvent;

fn pubsub_error(err: RedisError) -> AppError {
    AppError::PubSub(err.to_string())
}

/// Redis Pub/Sub manager for classification events.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    channel: String,
    /// Local broadcast channel for events received from Redis.
    local_tx: broadcast::Sender<PubSubEvent>,
}

impl RedisPubSub {
    /// Connect using the `[sync]` configuration section.
    pub async fn connect(config: &SyncConfig) -> AppResult<Self> {
        let redis_url = config
            .redis_url
            .as_deref()
            .ok_or_else(|| AppError::Config("sync.redis_url is not set".to_string()))?;
        Self::new(redis_url, &config.channel, config.buffer).await
    }

    /// Create a new Redis Pub/Sub manager on `channel`.
    pub async fn new(redis_url: &str, channel: &str, buffer: usize) -> AppResult<Self> {
        let config = RedisConfig::from_url(redis_url).map_err(pubsub_error)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await.map_err(pubsub_error)?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await.map_err(pubsub_error)?;

        let (local_tx, _) = broadcast::channel(buffer.max(1));

        info!(channel, "Redis Pub/Sub initialized");

        Ok(Self {
            publisher,
            subscriber,
            channel: channel.to_string(),
            local_tx,
        })
    }

    /// Subscribe to the channel and start forwarding messages locally.
    pub async fn start(&self) -> AppResult<()> {
        self.subscriber
            .subscribe(self.channel.as_str())
            .await
            .map_err(pubsub_error)?;

        info!(channel = %self.channel, "Subscribed to Redis Pub/Sub channel");

        let local_tx = self.local_tx.clone();
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                let Some(payload) = message.value.as_string() else {
                    continue;
                };
                match serde_json::from_str::<PubSubEvent>(&payload) {
                    Ok(event) => {
                        debug!(?event, "Received Pub/Sub event");
                        if local_tx.send(event).is_err() {
                            debug!("No local subscribers for Pub/Sub event");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Ignoring unrecognized Pub/Sub message");
                    }
                }
            }
            info!("Pub/Sub message stream ended");
        });

        Ok(())
    }

    /// Publish an event to the channel.
    pub async fn publish(&self, event: &PubSubEvent) -> AppResult<()> {
        let payload = serde_json::to_string(event)?;
        let _: () = self
            .publisher
            .publish(self.channel.as_str(), payload)
            .await
            .map_err(pubsub_error)?;
        debug!(channel = %self.channel, ?event, "Published Pub/Sub event");
        Ok(())
    }

    /// Get a receiver for events received from Redis.
    #[must_use]
    pub fn subscribe_local(&self) -> broadcast::Receiver<PubSubEvent> {
        self.local_tx.subscribe()
    }

    /// The Redis channel in use.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> AppResult<()> {
        self.subscriber.quit().await.map_err(pubsub_error)?;
        self.publisher.quit().await.map_err(pubsub_error)?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for RedisPubSub {
    async fn publish_classification_updated(&self, project_id: Option<i64>) -> AppResult<()> {
        self.publish(&PubSubEvent::ClassificationUpdated { project_id })
            .await
    }
}
