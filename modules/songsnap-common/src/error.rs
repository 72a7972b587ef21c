use thiserror::Error;

/// A payload arrived without a field its consuming stage requires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation error: missing required field `{field}`")]
pub struct ValidationError {
    pub field: &'static str,
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self { field }
    }
}

#[derive(Error, Debug)]
pub enum SongSnapError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Envelope error: {0}")]
    Envelope(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("SMS error: {0}")]
    Sms(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SongSnapError {
    /// Errors caused by the delivered message itself. Redelivery cannot fix these.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SongSnapError::Validation(_) | SongSnapError::Envelope(_) | SongSnapError::Decode(_)
        )
    }
}

impl From<serde_json::Error> for SongSnapError {
    fn from(err: serde_json::Error) -> Self {
        SongSnapError::Decode(err.to_string())
    }
}
