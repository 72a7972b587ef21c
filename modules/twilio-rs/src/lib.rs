use std::collections::HashMap;

pub mod models;
use reqwest::{header, Client};
use thiserror::Error;

use crate::models::{MessageResponse, TwilioErrorBody};

const API_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Error)]
pub enum TwilioError {
    #[error("Invalid recipient {0}: expected E.164 phone (+1234567890)")]
    InvalidRecipient(String),

    #[error("Twilio error (status {status}, code {code:?}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TwilioError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return TwilioError::Parse(err.to_string());
        }
        TwilioError::Network(err.to_string())
    }
}

/// Check if a string is a valid phone number (E.164 format)
pub fn is_phone_number(identifier: &str) -> bool {
    identifier.starts_with('+')
        && identifier.len() >= 10
        && identifier[1..].chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number messages are sent from.
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    base_url: String,
    client: Client,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self::with_base_url(options, API_BASE_URL)
    }

    pub fn with_base_url(options: TwilioOptions, base_url: impl Into<String>) -> Self {
        Self {
            options,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Send an SMS from the configured number.
    pub async fn send_message(&self, body: &str, to: &str) -> Result<MessageResponse, TwilioError> {
        self.send_message_from(body, to, &self.options.from_number)
            .await
    }

    /// Send an SMS with an explicit sender.
    pub async fn send_message_from(
        &self,
        body: &str,
        to: &str,
        from: &str,
    ) -> Result<MessageResponse, TwilioError> {
        if !is_phone_number(to) {
            return Err(TwilioError::InvalidRecipient(to.to_string()));
        }

        let url = messages_url(&self.base_url, &self.options.account_sid);

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let form_body = message_form(body, to, from);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .headers(headers)
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %error_body, "Twilio returned non-success");

            let parsed = serde_json::from_str::<TwilioErrorBody>(&error_body).ok();
            return Err(TwilioError::Api {
                status: status.as_u16(),
                code: parsed.as_ref().and_then(|e| e.code),
                message: parsed.map(|e| e.message).unwrap_or(error_body),
            });
        }

        let message = response.json::<MessageResponse>().await?;
        tracing::info!(sid = %message.sid, status = %message.status, "SMS queued");
        Ok(message)
    }
}

fn messages_url(base_url: &str, account_sid: &str) -> String {
    format!("{base_url}/Accounts/{account_sid}/Messages.json")
}

fn message_form<'a>(body: &'a str, to: &'a str, from: &'a str) -> HashMap<&'static str, &'a str> {
    let mut form_body = HashMap::new();
    form_body.insert("To", to);
    form_body.insert("From", from);
    form_body.insert("Body", body);
    form_body
}
