use std::sync::Arc;

use songsnap_common::{NotificationResult, SongSnapError};
use tracing::info;

use crate::traits::BlobStore;

pub const RESULT_SUFFIX: &str = ".txt";

/// Storage key for the result of an upload.
pub fn result_key(filename: &str) -> String {
    format!("{filename}{RESULT_SUFFIX}")
}

/// Consumes `NotificationResult`, writes it to the results bucket.
pub struct PersisterStage {
    store: Arc<dyn BlobStore>,
    bucket: String,
}

impl PersisterStage {
    pub fn new(store: Arc<dyn BlobStore>, bucket: String) -> Self {
        Self { store, bucket }
    }

    /// Returns the key written. Rewriting the same result is harmless.
    pub async fn handle(&self, result: NotificationResult) -> Result<String, SongSnapError> {
        let key = result_key(&result.filename);
        let body = serde_json::to_vec(&result)?;

        info!(bucket = %self.bucket, key = %key, "Saving result");
        self.store
            .write(&self.bucket, &key, body)
            .await
            .map_err(|e| SongSnapError::Storage(format!("{e:#}")))?;

        info!(key = %key, "Result saved");
        Ok(key)
    }
}
