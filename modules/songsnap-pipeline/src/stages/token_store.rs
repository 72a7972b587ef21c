use std::sync::{PoisonError, RwLock};

/// Process-wide cached catalog credential.
///
/// Holds at most one token. Reads and writes replace the whole value, so a
/// reader never sees a partially updated token; concurrent writers are
/// last-write-wins. Never persisted.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Clear the cache only if it still holds `stale`. Returns whether it did.
    ///
    /// A token stored by a concurrent resolution after `stale` was read is
    /// left alone.
    pub fn invalidate(&self, stale: &str) -> bool {
        let mut token = self.token.write().unwrap_or_else(PoisonError::into_inner);
        if token.as_deref() == Some(stale) {
            *token = None;
            return true;
        }
        false
    }

    pub fn is_authorized(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
