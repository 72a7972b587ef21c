//! BlobStore implementations: local filesystem and in-memory.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::traits::BlobStore;

/// Buckets are directories under `root`; keys are relative paths inside them.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        check_segment("bucket", bucket)?;
        check_segment("key", key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

/// Reject empty, absolute or parent-escaping names.
fn check_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        bail!("{kind} must not be empty");
    }
    let escapes = Path::new(value)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        bail!("{kind} {value:?} must be a relative path without '..'");
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                bail!("object {bucket}/{key} not found")
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn write(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests and local runs. Thread-safe.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn insert(&self, bucket: &str, key: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes);
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.get(bucket, key)
            .with_context(|| format!("object {bucket}/{key} not found"))
    }

    async fn write(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.insert(bucket, key, bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_store_round_trips_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.write("results", "a.jpg.txt", b"first".to_vec()).await.unwrap();
        store.write("results", "a.jpg.txt", b"second".to_vec()).await.unwrap();

        assert_eq!(store.read("results", "a.jpg.txt").await.unwrap(), b"second");
        assert!(dir.path().join("results").join("a.jpg.txt").exists());
    }

    #[tokio::test]
    async fn fs_store_creates_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.write("uploads", "2024/img.png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.read("uploads", "2024/img.png").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn fs_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        assert!(store.write("results", "../escape.txt", vec![]).await.is_err());
        assert!(store.write("results", "/etc/passwd", vec![]).await.is_err());
        assert!(store.write("", "a.txt", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn fs_store_missing_object_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        let err = store.read("uploads", "missing.jpg").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryBlobStore::new();
        store.write("b", "k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.read("b", "k").await.unwrap(), b"v");
        assert!(store.read("b", "other").await.is_err());
        assert_eq!(store.len(), 1);
    }
}
