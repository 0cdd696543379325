use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{StorageAppConfig, StorageBackend};

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Migration tuning knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct MigrationConfig {
    /// Source rows fetched per page. Default: 10.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Objects checked by `verify`. Default: 10.
    #[serde(default = "default_verify_samples")]
    pub verify_samples: u64,
}

fn default_batch_size() -> u64 {
    10
}
fn default_verify_samples() -> u64 {
    10
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            verify_samples: default_verify_samples(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MigratorConfig {
    /// Legacy database. Only the migrate steps need it.
    pub source: Option<DatabaseConfig>,
    /// New database every step writes to.
    pub target: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageAppConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl MigratorConfig {
    /// Load `config/<env>.toml`, then apply `MIGRATOR__SECTION__KEY`
    /// environment overrides (e.g. `MIGRATOR__TARGET__URL`).
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("migration.batch_size", 10_i64)?
            .set_default("migration.verify_samples", 10_i64)?
            .set_default("storage.backend", "s3")?
            .set_default("storage.region", "auto")?
            .add_source(File::with_name(&config_path(env)).required(false))
            .add_source(Environment::with_prefix("MIGRATOR").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.target.url.is_empty() {
            return Err(ConfigError::NotFound("target.url".into()));
        }
        if self.migration.batch_size == 0 {
            return Err(ConfigError::Message(
                "migration.batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Storage settings, or a config error listing what the backend lacks.
    pub fn require_storage(&self) -> Result<&StorageAppConfig, ConfigError> {
        let missing = self.storage.missing_fields();
        if missing.is_empty() {
            Ok(&self.storage)
        } else {
            Err(ConfigError::Message(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }

    /// Source database settings, or a config error naming the missing key.
    pub fn require_source(&self) -> Result<&DatabaseConfig, ConfigError> {
        self.source
            .as_ref()
            .filter(|s| !s.url.is_empty())
            .ok_or_else(|| ConfigError::NotFound("source.url".into()))
    }
}

/// Config file stem for an environment name.
pub fn config_path(env: &str) -> String {
    format!("config/{env}")
}
