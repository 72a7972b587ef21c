//! Payload contracts carried between stages.
//!
//! Each payload is decoded into a loose `Raw*` shape first, then validated
//! into the strict type its consuming stage works with. A missing required
//! field is a `ValidationError`; optional fields default explicitly here and
//! nowhere else.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{SongSnapError, ValidationError};

/// A validated message payload.
pub trait Payload: Serialize + Sized {
    /// Wire shape with every field optional.
    type Raw: DeserializeOwned;

    fn validate(raw: Self::Raw) -> Result<Self, ValidationError>;
}

/// JSON-decode and validate a payload.
pub fn decode_payload<P: Payload>(bytes: &[u8]) -> Result<P, SongSnapError> {
    let raw: P::Raw = serde_json::from_slice(bytes)?;
    Ok(P::validate(raw)?)
}

fn require(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value.ok_or(ValidationError::missing(field))
}

/// Like `require`, but an empty string counts as missing.
fn require_non_empty(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::missing(field))
}

// ---------------------------------------------------------------------------
// UploadEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    #[default]
    Exists,
    NotExists,
}

/// Storage notification for an object in the upload bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadEvent {
    pub bucket: String,
    pub name: String,
    #[serde(rename = "resourceState")]
    pub resource_state: ResourceState,
}

impl UploadEvent {
    /// A deletion notification. Nothing downstream runs for these.
    pub fn is_deletion(&self) -> bool {
        self.resource_state == ResourceState::NotExists
    }
}

#[derive(Debug, Deserialize)]
pub struct RawUploadEvent {
    bucket: Option<String>,
    name: Option<String>,
    #[serde(rename = "resourceState")]
    resource_state: Option<ResourceState>,
}

impl Payload for UploadEvent {
    type Raw = RawUploadEvent;

    fn validate(raw: RawUploadEvent) -> Result<Self, ValidationError> {
        Ok(Self {
            bucket: require_non_empty(raw.bucket, "bucket")?,
            name: require_non_empty(raw.name, "name")?,
            resource_state: raw.resource_state.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// SongInfo
// ---------------------------------------------------------------------------

/// Band and song pulled from an image. Either may be empty when extraction
/// was inconclusive; `filename` ties the result back to the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongInfo {
    pub band: String,
    pub song: String,
    pub filename: String,
}

impl SongInfo {
    pub fn is_empty(&self) -> bool {
        self.band.trim().is_empty() && self.song.trim().is_empty()
    }
}

#[derive(Debug, Deserialize)]
pub struct RawSongInfo {
    band: Option<String>,
    song: Option<String>,
    filename: Option<String>,
}

impl Payload for SongInfo {
    type Raw = RawSongInfo;

    fn validate(raw: RawSongInfo) -> Result<Self, ValidationError> {
        Ok(Self {
            band: raw.band.unwrap_or_default(),
            song: raw.song.unwrap_or_default(),
            filename: require(raw.filename, "filename")?,
        })
    }
}

// ---------------------------------------------------------------------------
// ResolvedTrack / NotificationResult
// ---------------------------------------------------------------------------

/// Output of the resolver. An empty `href` is a degraded but valid result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTrack {
    pub href: String,
    pub filename: String,
}

impl ResolvedTrack {
    pub fn degraded(filename: impl Into<String>) -> Self {
        Self {
            href: String::new(),
            filename: filename.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.href.is_empty()
    }
}

/// Published once the SMS went out. Same fields as `ResolvedTrack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    pub href: String,
    pub filename: String,
}

impl From<ResolvedTrack> for NotificationResult {
    fn from(track: ResolvedTrack) -> Self {
        Self {
            href: track.href,
            filename: track.filename,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawTrackLink {
    href: Option<String>,
    filename: Option<String>,
}

impl Payload for ResolvedTrack {
    type Raw = RawTrackLink;

    fn validate(raw: RawTrackLink) -> Result<Self, ValidationError> {
        Ok(Self {
            href: require(raw.href, "href")?,
            filename: require(raw.filename, "filename")?,
        })
    }
}

impl Payload for NotificationResult {
    type Raw = RawTrackLink;

    fn validate(raw: RawTrackLink) -> Result<Self, ValidationError> {
        Ok(Self {
            href: require(raw.href, "href")?,
            filename: require(raw.filename, "filename")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_field<P: Payload + std::fmt::Debug>(json: &str) -> &'static str {
        match decode_payload::<P>(json.as_bytes()) {
            Err(SongSnapError::Validation(e)) => e.field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn upload_event_defaults_to_exists() {
        let event: UploadEvent =
            decode_payload(br#"{"bucket": "uploads", "name": "12065551234.jpg"}"#).unwrap();
        assert_eq!(event.resource_state, ResourceState::Exists);
        assert!(!event.is_deletion());
    }

    #[test]
    fn upload_event_parses_deletion() {
        let event: UploadEvent = decode_payload(
            br#"{"bucket": "uploads", "name": "a.jpg", "resourceState": "not_exists"}"#,
        )
        .unwrap();
        assert!(event.is_deletion());
    }

    #[test]
    fn upload_event_requires_bucket_and_name() {
        assert_eq!(validation_field::<UploadEvent>(r#"{"name": "a.jpg"}"#), "bucket");
        assert_eq!(validation_field::<UploadEvent>(r#"{"bucket": "uploads"}"#), "name");
        assert_eq!(
            validation_field::<UploadEvent>(r#"{"bucket": "", "name": "a.jpg"}"#),
            "bucket"
        );
    }

    #[test]
    fn deletion_without_name_is_still_invalid() {
        assert_eq!(
            validation_field::<UploadEvent>(
                r#"{"bucket": "uploads", "resourceState": "not_exists"}"#
            ),
            "name"
        );
    }

    #[test]
    fn song_info_requires_filename_only() {
        let info: SongInfo = decode_payload(br#"{"filename": "a.jpg"}"#).unwrap();
        assert!(info.is_empty());
        assert_eq!(
            validation_field::<SongInfo>(r#"{"band": "Boston", "song": "Foreplay"}"#),
            "filename"
        );
    }

    #[test]
    fn empty_href_is_present() {
        let track: ResolvedTrack = decode_payload(br#"{"href": "", "filename": "a.jpg"}"#).unwrap();
        assert!(track.is_degraded());
    }

    #[test]
    fn track_links_require_href_and_filename() {
        assert_eq!(validation_field::<ResolvedTrack>(r#"{"filename": "a.jpg"}"#), "href");
        assert_eq!(validation_field::<ResolvedTrack>(r#"{"href": "x"}"#), "filename");
        assert_eq!(
            validation_field::<NotificationResult>(r#"{"filename": "a.jpg"}"#),
            "href"
        );
        assert_eq!(
            validation_field::<NotificationResult>(r#"{"href": ""}"#),
            "filename"
        );
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = decode_payload::<SongInfo>(b"not json").unwrap_err();
        assert!(matches!(err, SongSnapError::Decode(_)));
        assert!(err.is_client_error());
    }
}
