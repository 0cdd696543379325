use common::storage::{ObjectKey, ObjectStore};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, Statement,
};
use tracing::{info, warn};

use crate::entity::file;
use crate::error::{ItemError, Result, Stage};
use crate::report::MigrationReport;

pub const STEP: &str = "verify";

const SAMPLE_SQL: &str = "SELECT id, file_path FROM files \
     WHERE file_path IS NOT NULL ORDER BY RANDOM() LIMIT $1";

#[derive(Debug, FromQueryResult)]
struct SampledFile {
    id: i32,
    file_path: String,
}

#[derive(Debug)]
pub struct Verification {
    /// Target rows that point at an object.
    pub migrated: u64,
    pub report: MigrationReport,
}

/// Read-only spot check that migrated rows have their objects.
pub async fn verify(
    target: &DatabaseConnection,
    store: &dyn ObjectStore,
    samples: u64,
) -> Result<Verification> {
    let migrated = file::Entity::find()
        .filter(file::Column::FilePath.is_not_null())
        .count(target)
        .await?;
    info!(migrated, "Files with object keys");

    let limit = i64::try_from(samples).unwrap_or(i64::MAX);
    let sampled = SampledFile::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        SAMPLE_SQL,
        [limit.into()],
    ))
    .all(target)
    .await?;

    let mut report = MigrationReport::new(STEP, false);
    for row in sampled {
        let key = ObjectKey::from_raw(row.file_path);
        let result = match store.exists(&key).await {
            Ok(true) => {
                info!(file_id = row.id, key = %key, "Object found");
                Ok(())
            }
            Ok(false) => {
                warn!(file_id = row.id, key = %key, "Object missing");
                Err(ItemError::new(Stage::Verifying, format!("object {key} missing")))
            }
            Err(e) => Err(ItemError::new(Stage::Verifying, e)),
        };
        report.record(format!("file {}", row.id), result);
    }

    Ok(Verification { migrated, report })
}
