use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use tracing::debug;

use super::error::StorageError;
use super::key::ObjectKey;
use super::traits::ObjectStore;
use crate::config::StorageAppConfig;

/// Object store backed by an S3-compatible bucket (R2, MinIO, AWS).
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
}

impl S3ObjectStore {
    /// Build a bucket handle from configuration. No request is made.
    pub fn new(config: &StorageAppConfig) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key_id),
            Some(&config.secret_access_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Remote(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }

    /// Check that the bucket answers and accepts our credentials, so a bad
    /// endpoint fails before any item is processed. A 404 for the probe key
    /// is the expected answer.
    pub async fn probe(&self) -> Result<(), StorageError> {
        let (_, code) = self.bucket.head_object("/").await?;
        debug!(bucket = %self.bucket.name(), code, "Probed object store");
        if code == 401 || code == 403 || code >= 500 {
            return Err(StorageError::Status {
                key: "/".into(),
                code,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &ObjectKey,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key.as_str(), data, content_type)
            .await?;

        match response.status_code() {
            200..=299 => Ok(()),
            code => Err(StorageError::Status {
                key: key.to_string(),
                code,
            }),
        }
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError> {
        let (_, code) = self.bucket.head_object(key.as_str()).await?;
        match code {
            200..=299 => Ok(true),
            404 => Ok(false),
            code => Err(StorageError::Status {
                key: key.to_string(),
                code,
            }),
        }
    }

    async fn size(&self, key: &ObjectKey) -> Result<u64, StorageError> {
        let (head, code) = self.bucket.head_object(key.as_str()).await?;
        match code {
            200..=299 => Ok(head.content_length.unwrap_or_default().max(0) as u64),
            404 => Err(StorageError::NotFound(key.to_string())),
            code => Err(StorageError::Status {
                key: key.to_string(),
                code,
            }),
        }
    }
}

impl From<S3Error> for StorageError {
    fn from(err: S3Error) -> Self {
        match err {
            S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(String::new()),
            S3Error::HttpFailWithBody(code, body) => {
                StorageError::Remote(format!("status {code}: {body}"))
            }
            other => StorageError::Remote(other.to_string()),
        }
    }
}
