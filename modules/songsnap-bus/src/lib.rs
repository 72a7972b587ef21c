//! Message bus for the stage pipeline.
//!
//! Stages publish JSON payloads to named topics through a `Publisher` and
//! receive deliveries through a `Router`, one envelope at a time. Two
//! transports: `PubsubPublisher` (Google Pub/Sub REST, push subscriptions
//! deliver back over HTTP) and `LocalBus` (in-process queue drained into a
//! router until settled). `MemoryPublisher` records publishes for tests.

pub mod local;
pub mod memory;
pub mod pubsub;
pub mod traits;

pub use local::{DrainReport, LocalBus};
pub use memory::{MemoryPublisher, PublishedMessage};
pub use pubsub::{MetadataTokenSource, PubsubPublisher, StaticToken, TokenSource};
pub use traits::{publish_json, Publisher, Router};
