//! Push-delivery envelope: `{"message": {"data": "<base64>", ...}, "subscription": "..."}`.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SongSnapError;
use crate::messages::{decode_payload, Payload};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub data: Option<String>,
    #[serde(default)]
    pub message_id: String,
    pub publish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl PushEnvelope {
    /// Wrap raw payload bytes the way the bus delivers them.
    pub fn wrap(data: &[u8], message_id: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            message: PushMessage {
                data: Some(STANDARD.encode(data)),
                message_id: message_id.into(),
                publish_time: Some(Utc::now()),
                attributes: HashMap::new(),
            },
            subscription: subscription.into(),
        }
    }

    /// Base64-decode the message body.
    pub fn decode_data(&self) -> Result<Vec<u8>, SongSnapError> {
        let data = self
            .message
            .data
            .as_deref()
            .ok_or_else(|| SongSnapError::Envelope("message has no data".to_string()))?;

        STANDARD
            .decode(data.trim())
            .map_err(|e| SongSnapError::Envelope(format!("invalid base64 data: {e}")))
    }

    /// Decode the body and validate it as payload `P`.
    pub fn decode_payload<P: Payload>(&self) -> Result<P, SongSnapError> {
        decode_payload(&self.decode_data()?)
    }
}
