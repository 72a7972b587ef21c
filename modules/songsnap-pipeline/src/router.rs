//! Topic → stage dispatch shared by the push server and the local bus.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use songsnap_bus::{Publisher, Router};
use songsnap_common::{
    Config, NotificationResult, PushEnvelope, ResolvedTrack, SongInfo, SongSnapError, Topics,
    UploadEvent,
};

use crate::stages::{
    IntakeStage, NotifierStage, PersisterStage, ResolverStage, TokenStore, TrackResolver,
};
use crate::traits::{BlobStore, SmsSender, TextDetector, TrackCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Intake,
    Resolver,
    Notifier,
    Persister,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Intake => "intake",
            Stage::Resolver => "resolver",
            Stage::Notifier => "notifier",
            Stage::Persister => "persister",
        };
        f.write_str(name)
    }
}

/// Collaborators the stages are built from.
pub struct PipelineDeps {
    pub publisher: Arc<dyn Publisher>,
    pub detector: Arc<dyn TextDetector>,
    pub catalog: Arc<dyn TrackCatalog>,
    pub tokens: Arc<TokenStore>,
    pub sms: Arc<dyn SmsSender>,
    pub store: Arc<dyn BlobStore>,
}

/// Non-secret settings the stages need.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub topics: Topics,
    pub result_bucket: String,
    pub default_to_number: String,
    pub unauthorized_retries: u32,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            topics: config.topics.clone(),
            result_bucket: config.result_bucket.clone(),
            default_to_number: config.default_to_number.clone(),
            unauthorized_retries: config.resolver_unauthorized_retries,
        }
    }
}

pub struct PipelineRouter {
    topics: Topics,
    intake: IntakeStage,
    resolver: ResolverStage,
    notifier: NotifierStage,
    persister: PersisterStage,
}

impl PipelineRouter {
    pub fn new(settings: PipelineSettings, deps: PipelineDeps) -> Self {
        let topics = settings.topics;
        let resolver = TrackResolver::new(deps.catalog, deps.tokens)
            .with_unauthorized_retries(settings.unauthorized_retries);

        Self {
            intake: IntakeStage::new(
                deps.detector,
                deps.publisher.clone(),
                topics.song_info.clone(),
            ),
            resolver: ResolverStage::new(resolver, deps.publisher.clone(), topics.send_sms.clone()),
            notifier: NotifierStage::new(
                deps.sms,
                deps.publisher,
                topics.result.clone(),
                settings.default_to_number,
            ),
            persister: PersisterStage::new(deps.store, settings.result_bucket),
            topics,
        }
    }

    /// Stage subscribed to a bus topic. Intake is fed by storage, not a topic.
    pub fn stage_for_topic(&self, topic: &str) -> Option<Stage> {
        if topic == self.topics.song_info {
            Some(Stage::Resolver)
        } else if topic == self.topics.send_sms {
            Some(Stage::Notifier)
        } else if topic == self.topics.result {
            Some(Stage::Persister)
        } else {
            None
        }
    }

    /// Decode and validate the envelope for `stage`, then run it.
    ///
    /// Validation happens before any stage logic, so a bad payload never
    /// reaches a collaborator or the bus.
    pub async fn deliver(&self, stage: Stage, envelope: &PushEnvelope) -> Result<(), SongSnapError> {
        tracing::debug!(%stage, message_id = %envelope.message.message_id, "Delivering message");
        match stage {
            Stage::Intake => {
                let event: UploadEvent = envelope.decode_payload()?;
                self.intake.handle(event).await?;
            }
            Stage::Resolver => {
                let info: SongInfo = envelope.decode_payload()?;
                self.resolver.handle(info).await?;
            }
            Stage::Notifier => {
                let track: ResolvedTrack = envelope.decode_payload()?;
                self.notifier.handle(track).await?;
            }
            Stage::Persister => {
                let result: NotificationResult = envelope.decode_payload()?;
                self.persister.handle(result).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Router for PipelineRouter {
    async fn route(&self, topic: &str, envelope: &PushEnvelope) -> anyhow::Result<()> {
        let stage = self
            .stage_for_topic(topic)
            .ok_or_else(|| anyhow::anyhow!("no stage subscribed to topic {topic}"))?;
        self.deliver(stage, envelope).await?;
        Ok(())
    }
}
