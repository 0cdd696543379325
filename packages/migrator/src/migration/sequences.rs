use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr, Statement};
use tracing::info;

use crate::context::RunMode;
use crate::error::{AtStage, Result, Stage};
use crate::report::MigrationReport;

pub const STEP: &str = "fix-sequences";

/// Tables whose ids are copied from the legacy database.
pub const TABLES: &[&str] = &["files", "tags", "users"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceState {
    pub table: &'static str,
    pub max_id: i32,
}

/// Move each serial sequence past the highest migrated id, so the
/// application's next insert does not collide.
pub async fn fix_sequences(
    db: &DatabaseConnection,
    mode: RunMode,
) -> Result<(Vec<SequenceState>, MigrationReport)> {
    let mut report = MigrationReport::new(STEP, mode.is_dry_run());
    let mut states = Vec::with_capacity(TABLES.len());

    for &table in TABLES {
        let max_id = max_id(db, table).await?;
        info!(table, max_id, "Current maximum id");
        states.push(SequenceState { table, max_id });

        if mode.is_dry_run() {
            report.record_skipped();
            continue;
        }
        let result = reset_sequence(db, table).await.at(Stage::SequenceReset);
        if result.is_ok() {
            info!(table, "Sequence reset");
        }
        report.record(format!("table {table}"), result);
    }

    Ok((states, report))
}

async fn max_id(db: &DatabaseConnection, table: &str) -> std::result::Result<i32, DbErr> {
    let sql = format!("SELECT COALESCE(MAX(id), 0) AS max_id FROM {table}");
    let row = db
        .query_one_raw(Statement::from_string(DbBackend::Postgres, sql))
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("max id of {table}")))?;
    row.try_get("", "max_id")
}

async fn reset_sequence(db: &DatabaseConnection, table: &str) -> std::result::Result<(), DbErr> {
    let sql = format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), GREATEST(MAX(id), 1)) FROM {table}"
    );
    db.execute_unprepared(&sql).await?;
    Ok(())
}
