use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::key::ObjectKey;
use super::traits::ObjectStore;

/// Filesystem-backed object store.
///
/// Objects are stored at `{base_path}/{key}`, so `files/12/a.zip` lands in
/// `{base_path}/files/12/a.zip`. Writes go through a temp file and a rename,
/// which makes an overwrite atomic.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    /// Compute the filesystem path for a key, rejecting traversal.
    fn object_path(&self, key: &ObjectKey) -> Result<PathBuf, StorageError> {
        let mut path = self.base_path.clone();
        for segment in key.segments() {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(StorageError::InvalidKey(key.to_string()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(
        &self,
        key: &ObjectKey,
        data: &[u8],
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let object_path = self.object_path(key)?;

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        let object_path = self.object_path(key)?;
        Ok(fs::try_exists(&object_path).await?)
    }

    async fn size(&self, key: &ObjectKey) -> Result<u64, StorageError> {
        let object_path = self.object_path(key)?;
        match fs::metadata(&object_path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
