//! In-memory object storage for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use campus_core::ports::{ObjectStorage, StorageError, StoredObject, UploadMetadata};

struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

/// Keeps uploaded buffers in a map and hands out `base_url`-prefixed URLs.
pub struct InMemoryObjectStorage {
    base_url: String,
    max_bytes: usize,
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl InMemoryObjectStorage {
    pub fn new(base_url: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            base_url: base_url.into(),
            max_bytes,
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Content type and bytes of a stored object.
    pub async fn get(&self, id: &str) -> Option<(String, Vec<u8>)> {
        self.blobs
            .read()
            .await
            .get(id)
            .map(|blob| (blob.content_type.clone(), blob.bytes.clone()))
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

impl Default for InMemoryObjectStorage {
    fn default() -> Self {
        Self::new("memory://uploads", 10 * 1024 * 1024)
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        metadata: UploadMetadata,
    ) -> Result<StoredObject, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::Rejected("empty upload".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let id = format!("{}/{}", metadata.folder, Uuid::new_v4());
        let url = format!("{}/{}", self.base_url, id);

        self.blobs.write().await.insert(
            id.clone(),
            StoredBlob {
                bytes,
                content_type: metadata.content_type,
            },
        );

        Ok(StoredObject { url, id })
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.blobs
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}
