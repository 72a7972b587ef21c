use serde::{Deserialize, Serialize};

/// Response from the client-credentials token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,
}

/// Top-level search response. Only the `tracks` section is requested.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<Paging<Track>>,
}

impl SearchResponse {
    /// Tracks in result order, empty when the section is missing.
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks.map(|p| p.items).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paging<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    /// Web API href (`https://api.spotify.com/v1/tracks/{id}`), not a player link.
    pub href: Option<String>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub external_urls: Option<ExternalUrls>,
}

impl Track {
    /// Canonical open.spotify.com link for this track.
    pub fn open_url(&self) -> String {
        track_open_url(&self.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// Build the playable link for a track identifier.
pub fn track_open_url(track_id: &str) -> String {
    format!("https://open.spotify.com/track/{track_id}")
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}
