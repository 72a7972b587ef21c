use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpotifyError>;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Network error: {0}")]
    Network(String),

    /// The bearer token was rejected (HTTP 401). Callers re-authorize and retry.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl SpotifyError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SpotifyError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for SpotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return SpotifyError::Parse(err.to_string());
        }
        SpotifyError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SpotifyError {
    fn from(err: serde_json::Error) -> Self {
        SpotifyError::Parse(err.to_string())
    }
}
