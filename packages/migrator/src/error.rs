use std::fmt;

use common::storage::StorageError;
use sea_orm::DbErr;
use thiserror::Error;

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum MigratorError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Object store error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, MigratorError>;

/// Where in its lifecycle a single item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Uploading,
    MetadataWriting,
    TagLinking,
    Inserting,
    Split,
    Delete,
    Merge,
    Verifying,
    SequenceReset,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uploading => "uploading",
            Self::MetadataWriting => "metadata_writing",
            Self::TagLinking => "tag_linking",
            Self::Inserting => "inserting",
            Self::Split => "split",
            Self::Delete => "delete",
            Self::Merge => "merge",
            Self::Verifying => "verifying",
            Self::SequenceReset => "sequence_reset",
        };
        f.write_str(name)
    }
}

/// A recoverable failure of one file, user, or tag operation.
#[derive(Debug, Clone, Error)]
#[error("{stage}: {message}")]
pub struct ItemError {
    pub stage: Stage,
    pub message: String,
}

impl ItemError {
    pub fn new(stage: Stage, err: impl fmt::Display) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

/// Attach a [`Stage`] to any displayable error.
pub trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, ItemError>;
}

impl<T, E: fmt::Display> AtStage<T> for std::result::Result<T, E> {
    fn at(self, stage: Stage) -> std::result::Result<T, ItemError> {
        self.map_err(|e| ItemError::new(stage, e))
    }
}
