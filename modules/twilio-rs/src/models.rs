use serde::{Deserialize, Serialize};

/// Message resource returned by `POST /Messages.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub sid: String,
    pub status: String,
    pub to: String,
    pub from: Option<String>,
    pub body: Option<String>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}

/// Error body Twilio returns alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioErrorBody {
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
    pub more_info: Option<String>,
}
