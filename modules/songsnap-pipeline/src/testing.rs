// Test mocks for the pipeline.
//
// Three mocks matching the collaborator traits that talk to the network:
// - ScriptedCatalog (TrackCatalog) — queued auth/search outcomes with call counters
// - RecordingSms (SmsSender) — records every message, optionally fails
// - FixedTextDetector (TextDetector) — name→text map
//
// BlobStore and Publisher already have in-memory implementations
// (MemoryBlobStore, MemoryPublisher).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::traits::{
    AccessToken, CatalogError, CatalogTrack, DeliveryReceipt, ImageRef, SmsSender, TextDetector,
    TrackCatalog,
};

// ---------------------------------------------------------------------------
// ScriptedCatalog
// ---------------------------------------------------------------------------

/// Catalog whose responses are queued up front.
///
/// Authorization issues `token-1`, `token-2`, ... unless a failure is queued.
/// Searches pop the next scripted outcome; with nothing queued they fail,
/// unless `always_finds` set a fallback track.
pub struct ScriptedCatalog {
    auth_failures: Mutex<VecDeque<String>>,
    searches: Mutex<VecDeque<Result<Vec<CatalogTrack>, CatalogError>>>,
    fallback: Option<CatalogTrack>,
    authorize_calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
    tokens_used: Mutex<Vec<String>>,
}

impl Default for ScriptedCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self {
            auth_failures: Mutex::new(VecDeque::new()),
            searches: Mutex::new(VecDeque::new()),
            fallback: None,
            authorize_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            tokens_used: Mutex::new(Vec::new()),
        }
    }

    fn push_search(self, outcome: Result<Vec<CatalogTrack>, CatalogError>) -> Self {
        self.searches.lock().unwrap().push_back(outcome);
        self
    }

    pub fn finds(self, id: &str, name: &str) -> Self {
        self.push_search(Ok(vec![CatalogTrack {
            id: id.to_string(),
            name: name.to_string(),
        }]))
    }

    pub fn finds_nothing(self) -> Self {
        self.push_search(Ok(vec![]))
    }

    /// Next search answers 401.
    pub fn rejects_token(self) -> Self {
        self.push_search(Err(CatalogError::Unauthorized(
            "The access token expired".to_string(),
        )))
    }

    pub fn search_fails(self, message: &str) -> Self {
        self.push_search(Err(CatalogError::Failed(message.to_string())))
    }

    pub fn auth_fails(self, message: &str) -> Self {
        self.auth_failures
            .lock()
            .unwrap()
            .push_back(message.to_string());
        self
    }

    pub fn always_finds(mut self, id: &str, name: &str) -> Self {
        self.fallback = Some(CatalogTrack {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn tokens_used(&self) -> Vec<String> {
        self.tokens_used.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackCatalog for ScriptedCatalog {
    async fn authorize(&self) -> Result<AccessToken, CatalogError> {
        let n = self.authorize_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(message) = self.auth_failures.lock().unwrap().pop_front() {
            return Err(CatalogError::Failed(message));
        }
        Ok(AccessToken {
            token: format!("token-{n}"),
            expires_in: 3600,
        })
    }

    async fn search_tracks(
        &self,
        query: &str,
        token: &str,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.tokens_used.lock().unwrap().push(token.to_string());

        let scripted = self.searches.lock().unwrap().pop_front();
        match (scripted, &self.fallback) {
            (Some(outcome), _) => outcome,
            (None, Some(track)) => Ok(vec![track.clone()]),
            (None, None) => Err(CatalogError::Failed("unscripted search".to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingSms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub body: String,
    pub to: String,
}

#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<SentSms>>,
    fail: AtomicBool,
    reject_empty: AtomicBool,
}

impl RecordingSms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sms = Self::default();
        sms.fail.store(true, Ordering::SeqCst);
        sms
    }

    /// Refuses empty bodies the way Twilio does (error 21602).
    pub fn rejecting_empty_body() -> Self {
        let sms = Self::default();
        sms.reject_empty.store(true, Ordering::SeqCst);
        sms
    }

    pub fn sent(&self) -> Vec<SentSms> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send_message(&self, body: &str, to: &str) -> Result<DeliveryReceipt> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("carrier unavailable");
        }
        if body.is_empty() && self.reject_empty.load(Ordering::SeqCst) {
            bail!("Twilio API error (400, code 21602): Message body is required.");
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentSms {
            body: body.to_string(),
            to: to.to_string(),
        });
        Ok(DeliveryReceipt {
            id: format!("SM{}", sent.len()),
            status: "queued".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// FixedTextDetector
// ---------------------------------------------------------------------------

/// Returns registered text per object name. Unregistered names are an error.
#[derive(Default)]
pub struct FixedTextDetector {
    texts: HashMap<String, String>,
    calls: AtomicUsize,
}

impl FixedTextDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_image(mut self, name: &str, text: &str) -> Self {
        self.texts.insert(name.to_string(), text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextDetector for FixedTextDetector {
    async fn detect_text(&self, image: &ImageRef) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.texts.get(&image.name) {
            Some(text) => Ok(text.clone()),
            None => bail!("no text registered for {}/{}", image.bucket, image.name),
        }
    }
}
