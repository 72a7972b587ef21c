//! Google Pub/Sub REST publisher.
//!
//! Bearer tokens come from a `TokenSource`. On Cloud Run / GCE that is the
//! metadata server, which hands out tokens that expire after about an hour;
//! `MetadataTokenSource` caches one until shortly before expiry. A publish
//! rejected with 401 invalidates the token and is retried once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::traits::Publisher;

const BASE_URL: &str = "https://pubsub.googleapis.com/v1";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the metadata server says the token expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Token sources
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;

    /// Forget `rejected` if it is still the cached token.
    async fn invalidate(&self, _rejected: &str) {}
}

/// A fixed token, e.g. from `gcloud auth print-access-token` during development.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Service-account tokens from the instance metadata server.
pub struct MetadataTokenSource {
    client: reqwest::Client,
    url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl Default for MetadataTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataTokenSource {
    pub fn new() -> Self {
        Self::with_url(METADATA_TOKEN_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenSource for MetadataTokenSource {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let resp = self
            .client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .context("requesting access token from metadata server")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("metadata server returned {status}: {body}");
        }

        let fresh: MetadataToken = resp.json().await.context("parsing metadata token")?;
        debug!(expires_in = fresh.expires_in, "Fetched Pub/Sub access token");

        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: fresh.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fresh.access_token)
    }

    async fn invalidate(&self, rejected: &str) {
        let mut cached = self.cached.lock().await;
        if cached.as_ref().is_some_and(|t| t.value == rejected) {
            *cached = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PublishRequest {
    messages: Vec<OutgoingMessage>,
}

#[derive(Debug, Serialize)]
struct OutgoingMessage {
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

pub struct PubsubPublisher {
    client: reqwest::Client,
    base_url: String,
    project: String,
    tokens: Arc<dyn TokenSource>,
}

impl PubsubPublisher {
    pub fn new(project: String, tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_base_url(project, tokens, BASE_URL)
    }

    pub fn with_base_url(
        project: String,
        tokens: Arc<dyn TokenSource>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project,
            tokens,
        }
    }

    fn publish_url(&self, topic: &str) -> String {
        format!(
            "{}/projects/{}/topics/{}:publish",
            self.base_url, self.project, topic
        )
    }

    async fn send(
        &self,
        topic: &str,
        body: &PublishRequest,
        token: &str,
    ) -> Result<reqwest::Response> {
        self.client
            .post(self.publish_url(topic))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("publishing to {topic}"))
    }
}

#[async_trait]
impl Publisher for PubsubPublisher {
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<String> {
        let body = PublishRequest {
            messages: vec![OutgoingMessage {
                data: STANDARD.encode(&data),
            }],
        };

        let token = self.tokens.access_token().await?;
        let mut resp = self.send(topic, &body, &token).await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!(topic, "Pub/Sub rejected access token, refreshing");
            self.tokens.invalidate(&token).await;
            let token = self.tokens.access_token().await?;
            resp = self.send(topic, &body, &token).await?;
        }

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pub/Sub publish to {topic} returned {status}: {body}");
        }

        let published: PublishResponse = resp.json().await?;
        let message_id = published
            .message_ids
            .into_iter()
            .next()
            .context("Pub/Sub publish response had no message id")?;

        debug!(topic, message_id = %message_id, "Published");
        Ok(message_id)
    }
}
