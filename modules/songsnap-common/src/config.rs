use std::env;

use tracing::info;

use crate::error::SongSnapError;

/// Bus topic names. These are configuration, not structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Carries `SongInfo` from intake to the resolver.
    pub song_info: String,
    /// Carries `ResolvedTrack` from the resolver to the notifier.
    pub send_sms: String,
    /// Carries `NotificationResult` from the notifier to the persister.
    pub result: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            song_info: "getSongInfoTopic".to_string(),
            send_sms: "sendSmsTopic".to_string(),
            result: "resultTopic".to_string(),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub topics: Topics,

    // Storage
    pub result_bucket: String,
    pub storage_root: String,

    // Music catalog
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub resolver_unauthorized_retries: u32,

    // SMS
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub default_to_number: String,

    // OCR
    pub vision_api_key: String,

    // Bus. No project means the in-process bus.
    pub pubsub_project: Option<String>,
    /// Fixed Pub/Sub token; unset means the metadata server.
    pub pubsub_access_token: Option<String>,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, SongSnapError> {
        let defaults = Topics::default();
        Ok(Self {
            topics: Topics {
                song_info: env::var("SONG_INFO_TOPIC").unwrap_or(defaults.song_info),
                send_sms: env::var("SEND_SMS_TOPIC").unwrap_or(defaults.send_sms),
                result: env::var("RESULT_TOPIC").unwrap_or(defaults.result),
            },
            result_bucket: required_env("RESULT_BUCKET")?,
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "./data".to_string()),
            spotify_client_id: required_env("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: required_env("SPOTIFY_CLIENT_SECRET")?,
            resolver_unauthorized_retries: parsed_env("RESOLVER_UNAUTHORIZED_RETRIES", 1)?,
            twilio_account_sid: required_env("TWILIO_ACCOUNT_SID")?,
            twilio_auth_token: required_env("TWILIO_AUTH_TOKEN")?,
            twilio_from_number: required_env("TWILIO_FROM_NUMBER")?,
            default_to_number: required_env("DEFAULT_TO_NUMBER")?,
            vision_api_key: required_env("GOOGLE_VISION_API_KEY")?,
            pubsub_project: optional_env("PUBSUB_PROJECT"),
            pubsub_access_token: optional_env("PUBSUB_ACCESS_TOKEN"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: parsed_env("WEB_PORT", 8080)?,
        })
    }

    /// Log the effective configuration with secrets reduced to set/unset.
    pub fn log_redacted(&self) {
        info!(
            song_info_topic = %self.topics.song_info,
            send_sms_topic = %self.topics.send_sms,
            result_topic = %self.topics.result,
            result_bucket = %self.result_bucket,
            storage_root = %self.storage_root,
            bus = self.pubsub_project.as_deref().unwrap_or("local"),
            resolver_unauthorized_retries = self.resolver_unauthorized_retries,
            spotify_secret_set = !self.spotify_client_secret.is_empty(),
            twilio_token_set = !self.twilio_auth_token.is_empty(),
            vision_key_set = !self.vision_api_key.is_empty(),
            pubsub_token_set = self.pubsub_access_token.is_some(),
            "Loaded configuration"
        );
    }
}

fn required_env(key: &str) -> Result<String, SongSnapError> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SongSnapError::Config(format!("{key} environment variable is required")))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, SongSnapError> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| SongSnapError::Config(format!("{key} must be a number, got {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topics_match_deployed_names() {
        let topics = Topics::default();
        assert_eq!(topics.song_info, "getSongInfoTopic");
        assert_eq!(topics.send_sms, "sendSmsTopic");
        assert_eq!(topics.result, "resultTopic");
    }

    #[test]
    fn parsed_env_falls_back_to_default() {
        assert_eq!(
            parsed_env::<u16>("SONGSNAP_TEST_UNSET_PORT_VAR", 8080).unwrap(),
            8080
        );
    }

    #[test]
    fn required_env_reports_the_key() {
        let err = required_env("SONGSNAP_TEST_UNSET_REQUIRED_VAR").unwrap_err();
        assert!(err.to_string().contains("SONGSNAP_TEST_UNSET_REQUIRED_VAR"));
    }
}
