//! In-process bus: publish enqueues, drain delivers.

use std::collections::VecDeque;

use anyhow::Result;
use async_trait::async_trait;
use songsnap_common::PushEnvelope;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::traits::{Publisher, Router};

struct Delivery {
    topic: String,
    envelope: PushEnvelope,
}

/// Counts from one `drain` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Single-process bus.
///
/// Payloads are wrapped in the same base64 envelope a push subscription
/// delivers, so routers see one delivery shape regardless of transport.
/// Failed deliveries are logged and dropped; there is no redelivery.
pub struct LocalBus {
    queue: Mutex<VecDeque<Delivery>>,
    published: Notify,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBus {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            published: Notify::new(),
        }
    }

    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Deliver queued messages until the queue is empty, including anything
    /// published by the router while draining.
    pub async fn drain<R: Router + ?Sized>(&self, router: &R) -> DrainReport {
        let mut report = DrainReport::default();

        loop {
            let next = self.queue.lock().await.pop_front();
            let Some(delivery) = next else {
                break;
            };

            let message_id = delivery.envelope.message.message_id.as_str();
            match router.route(&delivery.topic, &delivery.envelope).await {
                Ok(()) => {
                    debug!(topic = %delivery.topic, message_id, "Delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(topic = %delivery.topic, message_id, error = %e, "Delivery failed");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Drain forever, waking whenever something is published.
    pub async fn run<R: Router + ?Sized>(&self, router: &R) {
        loop {
            let report = self.drain(router).await;
            if report.delivered + report.failed > 0 {
                debug!(delivered = report.delivered, failed = report.failed, "Bus settled");
            }
            self.published.notified().await;
        }
    }
}

#[async_trait]
impl Publisher for LocalBus {
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<String> {
        let message_id = Uuid::new_v4().to_string();
        let envelope = PushEnvelope::wrap(&data, message_id.clone(), format!("local/{topic}"));

        self.queue.lock().await.push_back(Delivery {
            topic: topic.to_string(),
            envelope,
        });
        self.published.notify_one();

        Ok(message_id)
    }
}
