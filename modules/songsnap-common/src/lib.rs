pub mod config;
pub mod envelope;
pub mod error;
pub mod messages;

pub use config::{Config, Topics};
pub use envelope::{PushEnvelope, PushMessage};
pub use error::{SongSnapError, ValidationError};
pub use messages::{
    decode_payload, NotificationResult, Payload, ResolvedTrack, ResourceState, SongInfo,
    UploadEvent,
};
