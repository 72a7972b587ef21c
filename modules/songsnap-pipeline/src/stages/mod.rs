//! The four bus-driven stages plus the extractor intake runs inline.
//!
//! Intake → (song-info topic) → Resolver → (send-sms topic) → Notifier →
//! (result topic) → Persister.

pub mod extractor;
pub mod intake;
pub mod notifier;
pub mod persister;
pub mod resolver;
pub mod token_store;

pub use extractor::{extract_song, filter_noise_lines, ExtractedSong};
pub use intake::{IntakeOutcome, IntakeStage};
pub use notifier::{derive_destination, NotifierStage};
pub use persister::{result_key, PersisterStage};
pub use resolver::{ResolverStage, TrackResolver};
pub use token_store::TokenStore;
