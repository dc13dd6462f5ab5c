//! Object storage port.

use async_trait::async_trait;

/// Metadata sent along with an uploaded buffer.
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub content_type: String,
    pub folder: String,
}

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    /// Opaque provider identifier, used for deletion.
    pub id: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        metadata: UploadMetadata,
    ) -> Result<StoredObject, StorageError>;

    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage provider failed: {0}")]
    Provider(String),
}
