// Trait abstractions for the pipeline's external collaborators.
//
// TextDetector — OCR over an uploaded image.
// BlobStore — object read/write in named buckets.
// TrackCatalog — catalog credential exchange and track search.
// SmsSender — SMS delivery.
//
// Stages only see these traits, so tests run against the in-memory mocks in
// `testing` with no network.

use anyhow::Result;
use async_trait::async_trait;
use spotify_client::{SpotifyClient, SpotifyError};
use thiserror::Error;
use twilio::TwilioService;

/// An object in a bucket, as referenced by an upload notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub bucket: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// TextDetector
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Full block of text found in the image, `""` when there is none.
    async fn detect_text(&self, image: &ImageRef) -> Result<String>;
}

// ---------------------------------------------------------------------------
// BlobStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Write an object, replacing whatever is stored at `key`.
    async fn write(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// TrackCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog rejected the bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Failed(String),
}

impl From<SpotifyError> for CatalogError {
    fn from(err: SpotifyError) -> Self {
        match err {
            SpotifyError::Unauthorized(message) => CatalogError::Unauthorized(message),
            other => CatalogError::Failed(other.to_string()),
        }
    }
}

#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Client-credentials exchange.
    async fn authorize(&self) -> Result<AccessToken, CatalogError>;

    /// Tracks matching `query`, best match first.
    async fn search_tracks(&self, query: &str, token: &str)
        -> Result<Vec<CatalogTrack>, CatalogError>;
}

/// Spotify Web API as a `TrackCatalog`.
pub struct SpotifyCatalog {
    client: SpotifyClient,
    client_id: String,
    client_secret: String,
}

impl SpotifyCatalog {
    pub fn new(client: SpotifyClient, client_id: String, client_secret: String) -> Self {
        Self {
            client,
            client_id,
            client_secret,
        }
    }
}

#[async_trait]
impl TrackCatalog for SpotifyCatalog {
    async fn authorize(&self) -> Result<AccessToken, CatalogError> {
        let token = self
            .client
            .authorize(&self.client_id, &self.client_secret)
            .await?;
        Ok(AccessToken {
            token: token.access_token,
            expires_in: token.expires_in,
        })
    }

    async fn search_tracks(
        &self,
        query: &str,
        token: &str,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let search = self.client.search_tracks(query, token, 1).await?;
        Ok(search
            .into_tracks()
            .into_iter()
            .map(|t| CatalogTrack {
                id: t.id,
                name: t.name,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// SmsSender
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub id: String,
    pub status: String,
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_message(&self, body: &str, to: &str) -> Result<DeliveryReceipt>;
}

#[async_trait]
impl SmsSender for TwilioService {
    async fn send_message(&self, body: &str, to: &str) -> Result<DeliveryReceipt> {
        let message = TwilioService::send_message(self, body, to).await?;
        Ok(DeliveryReceipt {
            id: message.sid,
            status: message.status,
        })
    }
}
