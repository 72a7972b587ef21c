use std::sync::Arc;

use songsnap_bus::{publish_json, Publisher};
use songsnap_common::{SongInfo, SongSnapError, UploadEvent};
use tracing::info;

use crate::stages::extractor::extract_song;
use crate::traits::{ImageRef, TextDetector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Deletion notification; nothing ran.
    Skipped,
    Published(SongInfo),
}

/// Consumes upload notifications: OCR, extraction, publish `SongInfo`.
pub struct IntakeStage {
    detector: Arc<dyn TextDetector>,
    publisher: Arc<dyn Publisher>,
    song_info_topic: String,
}

impl IntakeStage {
    pub fn new(
        detector: Arc<dyn TextDetector>,
        publisher: Arc<dyn Publisher>,
        song_info_topic: String,
    ) -> Self {
        Self {
            detector,
            publisher,
            song_info_topic,
        }
    }

    pub async fn handle(&self, event: UploadEvent) -> Result<IntakeOutcome, SongSnapError> {
        if event.is_deletion() {
            info!(bucket = %event.bucket, name = %event.name, "Deletion event, skipping");
            return Ok(IntakeOutcome::Skipped);
        }

        let image = ImageRef {
            bucket: event.bucket,
            name: event.name,
        };
        let text = self
            .detector
            .detect_text(&image)
            .await
            .map_err(|e| SongSnapError::Ocr(format!("{e:#}")))?;

        let extracted = extract_song(&text);
        info!(
            name = %image.name,
            band = extracted.band.as_deref().unwrap_or(""),
            song = extracted.song.as_deref().unwrap_or(""),
            "Extracted song info"
        );

        let info = extracted.into_song_info(image.name);
        publish_json(&*self.publisher, &self.song_info_topic, &info)
            .await
            .map_err(|e| SongSnapError::Publish(format!("{e:#}")))?;

        info!(filename = %info.filename, topic = %self.song_info_topic, "File processed");
        Ok(IntakeOutcome::Published(info))
    }
}
