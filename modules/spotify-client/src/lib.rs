pub mod error;
pub mod types;

pub use error::{Result, SpotifyError};
pub use types::{track_open_url, Artist, Paging, SearchResponse, TokenResponse, Track};

use reqwest::StatusCode;
use types::ErrorEnvelope;

const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
const API_BASE_URL: &str = "https://api.spotify.com/v1";

pub struct SpotifyClient {
    client: reqwest::Client,
    accounts_base: String,
    api_base: String,
}

impl Default for SpotifyClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SpotifyClient {
    pub fn new() -> Self {
        Self::with_base_urls(ACCOUNTS_BASE_URL, API_BASE_URL)
    }

    /// Point the client at alternate hosts (local stubs, proxies).
    pub fn with_base_urls(accounts_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            accounts_base: accounts_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Exchange app credentials for a bearer token (client-credentials grant).
    pub async fn authorize(&self, client_id: &str, client_secret: &str) -> Result<TokenResponse> {
        let url = format!("{}/api/token", self.accounts_base);
        let resp = self
            .client
            .post(&url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let token: TokenResponse = resp.json().await?;
        tracing::info!(expires_in = token.expires_in, "Spotify access token issued");
        Ok(token)
    }

    /// Search the catalog for tracks matching a free-text query.
    pub async fn search_tracks(
        &self,
        query: &str,
        token: &str,
        limit: u32,
    ) -> Result<SearchResponse> {
        let url = format!("{}/search", self.api_base);
        let limit = limit.to_string();

        tracing::debug!(query, "Calling Spotify search");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let search: SearchResponse = resp.json().await?;
        Ok(search)
    }
}

/// Map a non-success response to an error, pulling the message out of
/// Spotify's `{"error": {"status", "message"}}` body when present.
fn status_error(status: StatusCode, body: String) -> SpotifyError {
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(body);

    if status == StatusCode::UNAUTHORIZED {
        return SpotifyError::Unauthorized(message);
    }
    SpotifyError::Api {
        status: status.as_u16(),
        message,
    }
}
