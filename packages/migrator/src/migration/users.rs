use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryOrder,
    QuerySelect, Set,
};
use tracing::{debug, info};

use crate::context::RunMode;
use crate::entity::user;
use crate::error::{AtStage, Result, Stage};
use crate::legacy;
use crate::report::MigrationReport;

pub const STEP: &str = "migrate-users";

/// Email for legacy users that never set one. Unique per id.
pub fn placeholder_email(id: i32) -> String {
    format!("user{id}@placeholder.local")
}

pub struct UserMigrator<'a> {
    source: &'a DatabaseConnection,
    target: &'a DatabaseConnection,
    mode: RunMode,
    batch_size: u64,
}

impl<'a> UserMigrator<'a> {
    pub fn new(
        source: &'a DatabaseConnection,
        target: &'a DatabaseConnection,
        mode: RunMode,
        batch_size: u64,
    ) -> Self {
        Self {
            source,
            target,
            mode,
            batch_size: batch_size.max(1),
        }
    }

    /// Users already present in the target are counted as skipped.
    pub async fn run(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport::new(STEP, self.mode.is_dry_run());
        let total = legacy::user::Entity::find().count(self.source).await?;
        info!(total, "Migrating users");

        let mut offset = 0u64;
        loop {
            let page = legacy::user::Entity::find()
                .order_by_asc(legacy::user::Column::Id)
                .limit(self.batch_size)
                .offset(offset)
                .all(self.source)
                .await?;
            if page.is_empty() {
                break;
            }

            for row in &page {
                if self.mode.is_dry_run() {
                    debug!(user_id = row.id, name = %row.name, "Would migrate user");
                    report.record_skipped();
                    continue;
                }
                match insert_user(self.target, row).await.at(Stage::Inserting) {
                    Ok(true) => report.record(format!("user {}", row.id), Ok(())),
                    Ok(false) => report.record_skipped(),
                    Err(e) => report.record(format!("user {}", row.id), Err(e)),
                }
            }
            offset += page.len() as u64;
        }

        info!(
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failed,
            "User migration finished"
        );
        Ok(report)
    }
}

pub fn user_record(row: &legacy::user::Model) -> user::ActiveModel {
    let email = row
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| placeholder_email(row.id));

    user::ActiveModel {
        id: Set(row.id),
        name: Set(row.name.clone()),
        email: Set(email),
        password: Set(row.password.clone().unwrap_or_default()),
        remember_token: Set(row.remember_token.clone()),
        created_at: Set(row.created_at),
        updated_at: Set(row.updated_at),
    }
}

/// Insert unless the id is taken. Returns whether a row was written.
pub async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    row: &legacy::user::Model,
) -> std::result::Result<bool, DbErr> {
    let result = user::Entity::insert(user_record(row))
        .on_conflict(OnConflict::column(user::Column::Id).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await;

    match result {
        Ok(rows) => Ok(rows > 0),
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) => Err(e),
    }
}
