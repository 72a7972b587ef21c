//! Core traits for the bus.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use songsnap_common::PushEnvelope;

/// Publishes raw payload bytes to a topic. Returns the transport's message id.
///
/// Implemented by PubsubPublisher (production), LocalBus (single process)
/// and MemoryPublisher (tests). Also implemented for `Arc<P>` so a publisher
/// can be shared with assertions.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<String>;
}

/// Delivers one envelope received on `topic` to the stage subscribed to it.
///
/// An `Err` is surfaced to the delivering transport (HTTP status for push
/// subscriptions, a failed count for LocalBus).
#[async_trait]
pub trait Router: Send + Sync {
    async fn route(&self, topic: &str, envelope: &PushEnvelope) -> Result<()>;
}

/// Serialize `payload` as JSON and publish it.
pub async fn publish_json<T: Serialize + Sync>(
    publisher: &dyn Publisher,
    topic: &str,
    payload: &T,
) -> Result<String> {
    let data = serde_json::to_vec(payload)?;
    publisher.publish(topic, data).await
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<String> {
        (**self).publish(topic, data).await
    }
}

#[async_trait]
impl<R: Router + ?Sized> Router for Arc<R> {
    async fn route(&self, topic: &str, envelope: &PushEnvelope) -> Result<()> {
        (**self).route(topic, envelope).await
    }
}
