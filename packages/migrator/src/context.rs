use std::sync::Arc;

use common::storage::ObjectStore;
use common::storage::filesystem::FilesystemObjectStore;
use common::storage::s3::S3ObjectStore;
use config::ConfigError;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::{MigratorConfig, StorageBackend};
use crate::database;
use crate::error::Result;

/// Whether a run may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    DryRun,
    Execute,
}

impl RunMode {
    pub fn from_execute_flag(execute: bool) -> Self {
        if execute { Self::Execute } else { Self::DryRun }
    }

    pub fn is_dry_run(self) -> bool {
        self == Self::DryRun
    }
}

/// Which stores a command touches besides the target database.
#[derive(Debug, Clone, Copy, Default)]
pub struct Requirements {
    pub source: bool,
    pub store: bool,
}

/// Client handles shared by every step of a run. Built once at startup and
/// passed by reference.
#[derive(Clone)]
pub struct MigrationContext {
    pub target: DatabaseConnection,
    /// Legacy database, for the migrate steps.
    pub source: Option<DatabaseConnection>,
    pub store: Option<Arc<dyn ObjectStore>>,
    pub mode: RunMode,
}

impl MigrationContext {
    /// Connect every store the run needs. Any failure here is fatal and
    /// happens before the first mutation.
    pub async fn connect(
        config: &MigratorConfig,
        mode: RunMode,
        needs: Requirements,
    ) -> Result<Self> {
        // Check all settings before opening any connection.
        let source_config = needs.source.then(|| config.require_source()).transpose()?;
        let storage_config = needs.store.then(|| config.require_storage()).transpose()?;

        let source = match source_config {
            Some(source_config) => {
                let db = database::connect(&source_config.url).await?;
                info!("Connected to source database");
                Some(db)
            }
            None => None,
        };

        // Schema sync is DDL; a dry run only reads what is already there.
        let target = match mode {
            RunMode::Execute => database::init_target(&config.target.url).await?,
            RunMode::DryRun => database::connect(&config.target.url).await?,
        };
        info!("Connected to target database");

        let store = match storage_config {
            Some(storage) => Some(build_store(storage).await?),
            None => None,
        };

        Ok(Self {
            target,
            source,
            store,
            mode,
        })
    }

    pub fn source(&self) -> Result<&DatabaseConnection> {
        Ok(self
            .source
            .as_ref()
            .ok_or_else(|| ConfigError::NotFound("source.url".into()))?)
    }

    pub fn store(&self) -> Result<&dyn ObjectStore> {
        Ok(self
            .store
            .as_deref()
            .ok_or_else(|| ConfigError::NotFound("storage".into()))?)
    }
}

async fn build_store(storage: &common::config::StorageAppConfig) -> Result<Arc<dyn ObjectStore>> {
    match storage.backend {
        StorageBackend::S3 => {
            let store = S3ObjectStore::new(storage)?;
            store.probe().await?;
            info!(bucket = %storage.bucket, endpoint = %storage.endpoint, "Object store ready");
            Ok(Arc::new(store))
        }
        StorageBackend::Filesystem => {
            let store = FilesystemObjectStore::new(storage.root.clone()).await?;
            info!(root = %storage.root.display(), "Filesystem object store ready");
            Ok(Arc::new(store))
        }
    }
}
