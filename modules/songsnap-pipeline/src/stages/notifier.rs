use std::sync::{Arc, LazyLock};

use regex::Regex;
use songsnap_bus::{publish_json, Publisher};
use songsnap_common::{NotificationResult, ResolvedTrack, SongSnapError};
use tracing::info;

use crate::traits::SmsSender;

/// `1` + NANP area code (first digit 2-9) + seven more digits.
static NANP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1[2-9][0-9]{9}").expect("NANP pattern is valid"));

/// Destination number for an upload: the NANP number the filename starts
/// with, in E.164 form, or `default_number`.
pub fn derive_destination(filename: &str, default_number: &str) -> String {
    match NANP_PREFIX.find(filename) {
        Some(m) => format!("+{}", m.as_str()),
        None => default_number.to_string(),
    }
}

/// Consumes `ResolvedTrack`, texts the link, publishes `NotificationResult`.
pub struct NotifierStage {
    sms: Arc<dyn SmsSender>,
    publisher: Arc<dyn Publisher>,
    result_topic: String,
    default_number: String,
}

impl NotifierStage {
    pub fn new(
        sms: Arc<dyn SmsSender>,
        publisher: Arc<dyn Publisher>,
        result_topic: String,
        default_number: String,
    ) -> Self {
        Self {
            sms,
            publisher,
            result_topic,
            default_number,
        }
    }

    pub async fn handle(&self, track: ResolvedTrack) -> Result<NotificationResult, SongSnapError> {
        let to = derive_destination(&track.filename, &self.default_number);

        // Degraded results are sent as-is; the empty body is the signal.
        let receipt = self
            .sms
            .send_message(&track.href, &to)
            .await
            .map_err(|e| SongSnapError::Sms(format!("{e:#}")))?;
        info!(
            filename = %track.filename,
            receipt = %receipt.id,
            status = %receipt.status,
            degraded = track.is_degraded(),
            "Sent track link by SMS"
        );

        let result = NotificationResult::from(track);
        publish_json(&*self.publisher, &self.result_topic, &result)
            .await
            .map_err(|e| SongSnapError::Publish(format!("{e:#}")))?;

        Ok(result)
    }
}
