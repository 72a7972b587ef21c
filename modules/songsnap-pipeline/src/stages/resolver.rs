//! Track resolution against the music catalog.
//!
//! `TrackResolver::resolve` never fails: every problem degrades to an empty
//! `href`. The one automatic retry is for a rejected bearer token, bounded by
//! `unauthorized_retries` per call.

use std::sync::Arc;

use songsnap_bus::{publish_json, Publisher};
use songsnap_common::{ResolvedTrack, SongInfo, SongSnapError};
use spotify_client::track_open_url;
use tracing::{info, warn};

use crate::stages::token_store::TokenStore;
use crate::traits::{CatalogError, TrackCatalog};

pub const DEFAULT_UNAUTHORIZED_RETRIES: u32 = 1;

/// Free-text catalog query for a song.
pub fn search_query(info: &SongInfo) -> String {
    format!("{} {}", info.band.trim(), info.song.trim())
        .trim()
        .to_string()
}

pub struct TrackResolver {
    catalog: Arc<dyn TrackCatalog>,
    tokens: Arc<TokenStore>,
    unauthorized_retries: u32,
}

impl TrackResolver {
    pub fn new(catalog: Arc<dyn TrackCatalog>, tokens: Arc<TokenStore>) -> Self {
        Self {
            catalog,
            tokens,
            unauthorized_retries: DEFAULT_UNAUTHORIZED_RETRIES,
        }
    }

    pub fn with_unauthorized_retries(mut self, retries: u32) -> Self {
        self.unauthorized_retries = retries;
        self
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Resolve a song to a playable link, or the degraded empty `href`.
    pub async fn resolve(&self, info: &SongInfo) -> ResolvedTrack {
        let filename = info.filename.as_str();

        if info.is_empty() {
            info!(filename, "No band or song extracted, skipping catalog search");
            return ResolvedTrack::degraded(filename);
        }

        let query = search_query(info);
        let mut retries_left = self.unauthorized_retries;

        loop {
            let token = match self.tokens.get() {
                Some(token) => token,
                None => match self.authorize().await {
                    Some(token) => token,
                    None => return ResolvedTrack::degraded(filename),
                },
            };

            info!(filename, query = %query, "Searching catalog");
            match self.catalog.search_tracks(&query, &token).await {
                Ok(tracks) => {
                    let Some(first) = tracks.first() else {
                        info!(filename, query = %query, "Catalog returned no tracks");
                        return ResolvedTrack::degraded(filename);
                    };
                    let href = track_open_url(&first.id);
                    info!(filename, track = %first.name, href = %href, "Resolved track");
                    return ResolvedTrack {
                        href,
                        filename: filename.to_string(),
                    };
                }
                Err(CatalogError::Unauthorized(reason)) if retries_left > 0 => {
                    warn!(filename, reason = %reason, retries_left, "Catalog rejected token, re-authorizing");
                    self.tokens.invalidate(&token);
                    retries_left -= 1;
                }
                Err(CatalogError::Unauthorized(reason)) => {
                    warn!(filename, reason = %reason, "Catalog rejected token, retry budget exhausted");
                    return ResolvedTrack::degraded(filename);
                }
                Err(e) => {
                    warn!(filename, error = %e, "Catalog search failed");
                    return ResolvedTrack::degraded(filename);
                }
            }
        }
    }

    async fn authorize(&self) -> Option<String> {
        info!("No cached catalog token, authorizing");
        match self.catalog.authorize().await {
            Ok(access) => {
                info!(expires_in = access.expires_in, "Catalog token cached");
                self.tokens.set(access.token.clone());
                Some(access.token)
            }
            Err(e) => {
                warn!(error = %e, "Catalog authorization failed");
                None
            }
        }
    }
}

/// Consumes `SongInfo`, publishes `ResolvedTrack` to the send-sms topic.
pub struct ResolverStage {
    resolver: TrackResolver,
    publisher: Arc<dyn Publisher>,
    send_sms_topic: String,
}

impl ResolverStage {
    pub fn new(resolver: TrackResolver, publisher: Arc<dyn Publisher>, send_sms_topic: String) -> Self {
        Self {
            resolver,
            publisher,
            send_sms_topic,
        }
    }

    pub async fn handle(&self, info: SongInfo) -> Result<ResolvedTrack, SongSnapError> {
        let track = self.resolver.resolve(&info).await;

        publish_json(&*self.publisher, &self.send_sms_topic, &track)
            .await
            .map_err(|e| SongSnapError::Publish(format!("{e:#}")))?;

        info!(
            filename = %track.filename,
            degraded = track.is_degraded(),
            topic = %self.send_sms_topic,
            "Published resolved track"
        );
        Ok(track)
    }
}
