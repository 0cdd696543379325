use async_trait::async_trait;

use super::error::StorageError;
use super::key::ObjectKey;

/// Key-addressed object storage. Writing an existing key replaces it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    async fn put(&self, key: &ObjectKey, data: &[u8], content_type: &str)
    -> Result<(), StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError>;

    /// Size of an object in bytes.
    async fn size(&self, key: &ObjectKey) -> Result<u64, StorageError>;
}
