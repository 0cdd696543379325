use common::storage::{ObjectKey, ObjectStore, content_type_for};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::context::RunMode;
use crate::entity::{file, user};
use crate::error::{AtStage, ItemError, Result, Stage};
use crate::legacy;
use crate::report::MigrationReport;
use crate::tags::TagStore;

pub const STEP: &str = "migrate-files";

/// Owner name stored when the legacy row has none.
pub const ANONYMOUS: &str = "Anonymous";

/// Copies legacy file rows and their payloads into the object store and the
/// target schema, keeping each row's id.
pub struct FileMigrator<'a> {
    source: &'a DatabaseConnection,
    target: &'a DatabaseConnection,
    store: &'a dyn ObjectStore,
    mode: RunMode,
    batch_size: u64,
}

impl<'a> FileMigrator<'a> {
    pub fn new(
        source: &'a DatabaseConnection,
        target: &'a DatabaseConnection,
        store: &'a dyn ObjectStore,
        mode: RunMode,
        batch_size: u64,
    ) -> Self {
        Self {
            source,
            target,
            store,
            mode,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn run(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport::new(STEP, self.mode.is_dry_run());

        let total = legacy::file::Entity::find()
            .filter(legacy::file::Column::FileData.is_not_null())
            .count(self.source)
            .await?;
        info!(total, batch_size = self.batch_size, "Migrating files");

        let mut offset = 0u64;
        loop {
            let page = fetch_page(self.source, offset, self.batch_size).await?;
            if page.is_empty() {
                break;
            }
            debug!(offset, rows = page.len(), "Fetched page");

            for row in &page {
                if self.mode.is_dry_run() {
                    plan_file(row);
                    report.record_skipped();
                    continue;
                }
                let result = migrate_file(self.target, self.store, row).await;
                report.record(format!("file {} {:?}", row.id, row.file_name), result);
            }

            offset += page.len() as u64;
            info!(processed = offset, total, "Progress");
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "File migration finished"
        );
        Ok(report)
    }
}

/// One page of legacy files that carry a payload, ordered by id.
pub async fn fetch_page(
    source: &DatabaseConnection,
    offset: u64,
    limit: u64,
) -> std::result::Result<Vec<legacy::file::Model>, DbErr> {
    legacy::file::Entity::find()
        .filter(legacy::file::Column::FileData.is_not_null())
        .order_by_asc(legacy::file::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(source)
        .await
}

fn plan_file(row: &legacy::file::Model) {
    let key = ObjectKey::for_file(row.id, &row.file_name);
    info!(
        file_id = row.id,
        key = %key,
        content_type = content_type_for(&row.file_name),
        size = payload(row).len(),
        tags = ?row.tag_slots(),
        "Would migrate file"
    );
}

fn payload(row: &legacy::file::Model) -> &[u8] {
    row.file_data.as_deref().unwrap_or_default()
}

/// Upload, then write metadata and tag links. Safe to repeat: the upload
/// overwrites the same key and the row is upserted by id.
pub async fn migrate_file(
    target: &DatabaseConnection,
    store: &dyn ObjectStore,
    row: &legacy::file::Model,
) -> std::result::Result<(), ItemError> {
    let key = upload_payload(store, row).await?;
    write_metadata(target, row, &key).await?;
    info!(file_id = row.id, key = %key, "Migrated file");
    Ok(())
}

pub async fn upload_payload(
    store: &dyn ObjectStore,
    row: &legacy::file::Model,
) -> std::result::Result<ObjectKey, ItemError> {
    let key = ObjectKey::for_file(row.id, &row.file_name);
    let content_type = content_type_for(&row.file_name);
    store
        .put(&key, payload(row), content_type)
        .await
        .at(Stage::Uploading)?;
    debug!(file_id = row.id, key = %key, content_type, "Uploaded object");
    Ok(key)
}

/// Owner check, upsert and tag links in one transaction.
pub async fn write_metadata(
    target: &DatabaseConnection,
    row: &legacy::file::Model,
    key: &ObjectKey,
) -> std::result::Result<(), ItemError> {
    let txn = target.begin().await.at(Stage::MetadataWriting)?;

    let owner = resolve_owner(&txn, row.uploader_id())
        .await
        .at(Stage::MetadataWriting)?;
    if owner.is_none() && row.upload_user_id.is_some() {
        debug!(file_id = row.id, legacy_owner = ?row.upload_user_id, "Owner not found, storing as orphan");
    }

    let size = payload(row).len() as i64;
    upsert_file(&txn, file_record(row, key, size, owner))
        .await
        .at(Stage::MetadataWriting)?;

    link_tags(&txn, row.id, &row.tag_slots())
        .await
        .at(Stage::TagLinking)?;

    txn.commit().await.at(Stage::MetadataWriting)?;
    Ok(())
}

/// `Some(id)` only if the user exists in the target.
pub async fn resolve_owner<C: ConnectionTrait>(
    conn: &C,
    legacy_id: Option<i32>,
) -> std::result::Result<Option<i32>, DbErr> {
    let Some(id) = legacy_id else {
        return Ok(None);
    };
    let found = user::Entity::find_by_id(id).count(conn).await?;
    Ok((found > 0).then_some(id))
}

/// Target row for a legacy file. `created_at` is only written on insert.
pub fn file_record(
    row: &legacy::file::Model,
    key: &ObjectKey,
    size: i64,
    owner: Option<i32>,
) -> file::ActiveModel {
    let owner_name = row
        .upload_owner_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(ANONYMOUS);

    file::ActiveModel {
        id: Set(row.id),
        upload_user_id: Set(owner),
        upload_owner_name: Set(owner_name.to_string()),
        file_name: Set(row.file_name.clone()),
        file_path: Set(Some(key.to_string())),
        file_size: Set(size),
        file_comment: Set(row.file_comment.clone().unwrap_or_default()),
        data_type: Set(row.data_type.clone().unwrap_or_default()),
        downloadable_at: Set(row.downloadable_at),
        created_at: Set(row.created_at),
        updated_at: Set(row.updated_at),
    }
}

async fn upsert_file<C: ConnectionTrait>(conn: &C, model: file::ActiveModel) -> std::result::Result<(), DbErr> {
    let result = file::Entity::insert(model)
        .on_conflict(
            OnConflict::column(file::Column::Id)
                .update_columns([
                    file::Column::UploadUserId,
                    file::Column::UploadOwnerName,
                    file::Column::FileName,
                    file::Column::FilePath,
                    file::Column::FileSize,
                    file::Column::FileComment,
                    file::Column::DataType,
                    file::Column::DownloadableAt,
                    file::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Link each slot's text verbatim. Variants are merged later by `clean-tags`.
async fn link_tags<C: ConnectionTrait>(
    conn: &C,
    file_id: i32,
    slots: &[&str],
) -> std::result::Result<(), DbErr> {
    let store = TagStore::new(conn);
    for name in slots {
        let tag_id = store.get_or_create(name).await?;
        store.link(file_id, tag_id).await?;
    }
    Ok(())
}
