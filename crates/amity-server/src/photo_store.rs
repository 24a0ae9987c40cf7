//! Disk-backed photo storage.
//!
//! Each upload is written to `<base>/<uuid>` and published at
//! `<public_base_url>/photos/<uuid>`. The uuid doubles as the remote
//! identifier handed back to the store for later deletion.

use std::path::PathBuf;

use amity_store::{PhotoStorage, StorageError, StoredPhoto};
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServerError;

#[derive(Debug, Clone)]
pub struct PhotoStore {
    base_path: PathBuf,
    public_base_url: String,
    max_size: usize,
}

impl PhotoStore {
    pub async fn new(base_path: PathBuf, public_base_url: String, max_size: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::Internal(format!(
                "Failed to create photo directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Photo store initialized");

        Ok(Self {
            base_path,
            public_base_url,
            max_size,
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Read the bytes of a stored photo.
    pub async fn get(&self, public_id: &str) -> Result<Vec<u8>, ServerError> {
        let path = self
            .photo_path(public_id)
            .ok_or_else(|| ServerError::NotFound(format!("Photo not found: {public_id}")))?;

        if !path.exists() {
            return Err(ServerError::NotFound(format!("Photo not found: {public_id}")));
        }

        let data = fs::read(&path)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to read photo {public_id}: {e}")))?;

        debug!(public_id, size = data.len(), "Retrieved photo");
        Ok(data)
    }

    /// Only well-formed uuids map to a file, so a caller-supplied id can never
    /// leave the base directory.
    fn photo_path(&self, public_id: &str) -> Option<PathBuf> {
        let id = Uuid::parse_str(public_id).ok()?;
        Some(self.base_path.join(id.to_string()))
    }
}

impl PhotoStorage for PhotoStore {
    async fn upload(&self, data: Bytes) -> Result<StoredPhoto, StorageError> {
        if data.is_empty() {
            return Err(StorageError("Empty photo".to_string()));
        }
        if data.len() > self.max_size {
            return Err(StorageError(format!(
                "Photo too large: {} bytes (max {})",
                data.len(),
                self.max_size
            )));
        }

        let id = Uuid::new_v4();
        let path = self.base_path.join(id.to_string());

        fs::write(&path, &data)
            .await
            .map_err(|e| StorageError(format!("Failed to write photo {id}: {e}")))?;

        debug!(id = %id, size = data.len(), "Stored photo");
        Ok(StoredPhoto {
            url: format!("{}/photos/{}", self.public_base_url, id),
            public_id: id.to_string(),
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
        let path = self
            .photo_path(public_id)
            .ok_or_else(|| StorageError(format!("Unknown photo id: {public_id}")))?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(public_id, "Deleted photo");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(public_id, "Photo already absent");
                Ok(())
            }
            Err(e) => Err(StorageError(format!("Failed to delete photo {public_id}: {e}"))),
        }
    }
}
