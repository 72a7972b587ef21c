//! MemoryPublisher (tests — no transport required)

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::traits::Publisher;

#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub message_id: String,
    pub topic: String,
    pub data: Vec<u8>,
}

/// Records every publish with an incrementing message id. Thread-safe.
pub struct MemoryPublisher {
    next_id: AtomicU64,
    fail: AtomicBool,
    messages: Mutex<Vec<PublishedMessage>>,
}

impl Default for MemoryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            fail: AtomicBool::new(false),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Make every subsequent publish fail.
    pub fn fail_publishes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Read all published messages (for test assertions).
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Raw payloads published to `topic`, in publish order.
    pub fn data_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic == topic)
            .map(|m| m.data.clone())
            .collect()
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("publish to {topic} rejected");
        }
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.messages.lock().unwrap().push(PublishedMessage {
            message_id: message_id.clone(),
            topic: topic.to_string(),
            data,
        });
        Ok(message_id)
    }
}
