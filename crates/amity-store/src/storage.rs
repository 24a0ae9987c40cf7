//! Remote binary storage collaborator used by the photo lifecycle.

use std::future::Future;

use bytes::Bytes;
use thiserror::Error;

/// Where an uploaded photo ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPhoto {
    /// Public locator served to clients.
    pub url: String,
    /// Identifier needed to delete the object later.
    pub public_id: String,
}

/// Opaque failure reported by the storage backend. The message is passed
/// through to the caller unmodified.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct StorageError(pub String);

/// Remote storage for photo bytes.
pub trait PhotoStorage: Send + Sync {
    fn upload(&self, data: Bytes) -> impl Future<Output = Result<StoredPhoto, StorageError>> + Send;

    fn delete(&self, public_id: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}
