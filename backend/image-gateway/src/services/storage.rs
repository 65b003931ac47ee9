//! Upload/fetch gateway over object storage
//!
//! `BlobStore` is the only storage seam the request path sees. No retries
//! are applied here; the caller decides what a failure means.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use s3_utils::{S3Error, S3Operations};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    #[error("Object store I/O error: {0}")]
    Io(String),
}

impl From<S3Error> for StoreError {
    fn from(err: S3Error) -> Self {
        match err {
            S3Error::NotFound(key) => StoreError::NotFound(key),
            S3Error::Unavailable(msg) => StoreError::Unavailable(msg),
            S3Error::Io(msg) => StoreError::Io(msg),
        }
    }
}

/// Durable object storage keyed by caller supplied names.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `name` and return the locator to hand the worker.
    async fn put(&self, bytes: Bytes, name: &str) -> Result<String, StoreError>;

    /// Read back the object behind `locator`.
    async fn get(&self, locator: &str) -> Result<Bytes, StoreError>;

    /// Cheap reachability probe used by the readiness endpoint.
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// `BlobStore` backed by an S3-compatible bucket.
pub struct S3BlobStore {
    operations: S3Operations,
}

impl S3BlobStore {
    pub fn new(operations: S3Operations) -> Self {
        Self { operations }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, bytes: Bytes, name: &str) -> Result<String, StoreError> {
        let content_type = content_type_for(name);
        Ok(self.operations.put_object(name, bytes, content_type).await?)
    }

    async fn get(&self, locator: &str) -> Result<Bytes, StoreError> {
        Ok(self.operations.get_object(locator).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(self.operations.head_bucket().await?)
    }
}

/// Process-local `BlobStore` for tests and local runs without a bucket.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<String, Bytes>>,
    unavailable: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store is unavailable".to_string(),
            ));
        }
        Ok(())
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.objects.read().contains_key(locator)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, bytes: Bytes, name: &str) -> Result<String, StoreError> {
        self.check_available()?;
        self.objects.write().insert(name.to_string(), bytes);
        Ok(name.to_string())
    }

    async fn get(&self, locator: &str) -> Result<Bytes, StoreError> {
        self.check_available()?;
        self.objects
            .read()
            .get(locator)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(locator.to_string()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

/// MIME type guessed from the object name's extension
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}
