use std::path::PathBuf;

use serde::Deserialize;

/// Which object store implementation backs migrated payloads.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3-compatible bucket (Cloudflare R2 in production).
    S3,
    /// Local directory with the same key layout, for rehearsal runs.
    Filesystem,
}

/// App-level object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Storage backend. Default: "s3".
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Bucket name. Required for the S3 backend.
    #[serde(default)]
    pub bucket: String,
    /// S3 endpoint URL, e.g. `https://<account>.r2.cloudflarestorage.com`.
    #[serde(default)]
    pub endpoint: String,
    /// Signing region. R2 accepts "auto". Default: "auto".
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    /// Use path-style addressing instead of virtual hosts. Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
    /// Root directory for the filesystem backend. Default: "./storage".
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_backend() -> StorageBackend {
    StorageBackend::S3
}
fn default_region() -> String {
    "auto".into()
}
fn default_path_style() -> bool {
    true
}
fn default_root() -> PathBuf {
    PathBuf::from("./storage")
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bucket: String::new(),
            endpoint: String::new(),
            region: default_region(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            path_style: default_path_style(),
            root: default_root(),
        }
    }
}

impl StorageAppConfig {
    /// Names of settings the selected backend needs but that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.backend == StorageBackend::S3 {
            if self.bucket.is_empty() {
                missing.push("storage.bucket");
            }
            if self.endpoint.is_empty() {
                missing.push("storage.endpoint");
            }
            if self.access_key_id.is_empty() {
                missing.push("storage.access_key_id");
            }
            if self.secret_access_key.is_empty() {
                missing.push("storage.secret_access_key");
            }
        }
        missing
    }
}
