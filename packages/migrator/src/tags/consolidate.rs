use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info};

use super::analyzer::{CleanupPlan, MergeGroup, SplitTarget, TagUsage, analyze, find_duplicates};
use super::store::TagStore;
use crate::context::RunMode;
use crate::error::{AtStage, ItemError, Result, Stage};
use crate::report::MigrationReport;

pub const STEP: &str = "clean-tags";

/// Result of one `clean-tags` run.
#[derive(Debug)]
pub struct Consolidation {
    /// Plan built from the inventory at start.
    pub plan: CleanupPlan,
    /// Duplicate groups actually merged. Re-derived after split and delete
    /// in execute mode, equal to `plan.merges` in a dry run.
    pub merged: Vec<MergeGroup>,
    pub report: MigrationReport,
}

/// Splits multi-word tags, drops blank ones, then merges case and width
/// variants into one canonical tag.
pub struct TagConsolidator<'a> {
    db: &'a DatabaseConnection,
    mode: RunMode,
}

impl<'a> TagConsolidator<'a> {
    pub fn new(db: &'a DatabaseConnection, mode: RunMode) -> Self {
        Self { db, mode }
    }

    pub async fn run(&self) -> Result<Consolidation> {
        let inventory = TagStore::new(self.db).fetch_usage().await?;
        let plan = analyze(&inventory);
        log_plan(&inventory, &plan);

        let mut report = MigrationReport::new(STEP, self.mode.is_dry_run());

        if self.mode.is_dry_run() {
            let planned = plan.splits.len()
                + plan.deletions.len()
                + plan.merges.iter().map(|g| g.remove.len()).sum::<usize>();
            for _ in 0..planned {
                report.record_skipped();
            }
            let merged = plan.merges.clone();
            return Ok(Consolidation {
                plan,
                merged,
                report,
            });
        }

        for target in &plan.splits {
            report.record(subject(&target.tag), split_tag(self.db, target).await);
        }

        for tag in &plan.deletions {
            report.record(subject(tag), delete_blank(self.db, tag).await);
        }

        // Splitting may have created or removed variants.
        let merged = if plan.splits.is_empty() && plan.deletions.is_empty() {
            plan.merges.clone()
        } else {
            find_duplicates(&TagStore::new(self.db).fetch_usage().await?)
        };

        for group in &merged {
            for remove in &group.remove {
                report.record(subject(remove), merge_pair(self.db, &group.keep, remove).await);
            }
        }

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            "Tag cleanup finished"
        );

        Ok(Consolidation {
            plan,
            merged,
            report,
        })
    }
}

fn subject(tag: &TagUsage) -> String {
    format!("tag {} {:?}", tag.id, tag.tag_name)
}

fn log_plan(inventory: &[TagUsage], plan: &CleanupPlan) {
    info!(
        tags = inventory.len(),
        splits = plan.splits.len(),
        deletions = plan.deletions.len(),
        merge_groups = plan.merges.len(),
        "Analyzed tag inventory"
    );
    for target in &plan.splits {
        info!(
            tag_id = target.tag.id,
            tag_name = %target.tag.tag_name,
            files = target.tag.file_count,
            tokens = ?target.tokens,
            "Split planned"
        );
    }
    for tag in &plan.deletions {
        info!(tag_id = tag.id, files = tag.file_count, "Blank tag delete planned");
    }
    for group in &plan.merges {
        let removed: Vec<&str> = group.remove.iter().map(|t| t.tag_name.as_str()).collect();
        info!(
            keep_id = group.keep.id,
            keep = %group.keep.tag_name,
            remove = ?removed,
            "Merge planned"
        );
    }
}

/// Replace a multi-word tag with one tag per token. All or nothing.
pub async fn split_tag(
    db: &DatabaseConnection,
    target: &SplitTarget,
) -> std::result::Result<(), ItemError> {
    let txn = db.begin().await.at(Stage::Split)?;
    let store = TagStore::new(&txn);

    for token in &target.tokens {
        let token_id = store.get_or_create(token).await.at(Stage::Split)?;
        let copied = store
            .copy_links(target.tag.id, token_id)
            .await
            .at(Stage::Split)?;
        debug!(tag_id = target.tag.id, token = %token, token_id, copied, "Copied links");
    }
    store.unlink_all(target.tag.id).await.at(Stage::Split)?;
    store.delete_tag(target.tag.id).await.at(Stage::Split)?;

    txn.commit().await.at(Stage::Split)?;
    info!(tag_id = target.tag.id, tokens = ?target.tokens, "Split tag");
    Ok(())
}

pub async fn delete_blank(
    db: &DatabaseConnection,
    tag: &TagUsage,
) -> std::result::Result<(), ItemError> {
    let txn = db.begin().await.at(Stage::Delete)?;
    let store = TagStore::new(&txn);

    let unlinked = store.unlink_all(tag.id).await.at(Stage::Delete)?;
    store.delete_tag(tag.id).await.at(Stage::Delete)?;

    txn.commit().await.at(Stage::Delete)?;
    info!(tag_id = tag.id, unlinked, "Deleted blank tag");
    Ok(())
}

/// Move every link of `remove` onto `keep`, then delete `remove`.
pub async fn merge_pair(
    db: &DatabaseConnection,
    keep: &TagUsage,
    remove: &TagUsage,
) -> std::result::Result<(), ItemError> {
    let result = async {
        let txn = db.begin().await?;
        let store = TagStore::new(&txn);
        let copied = store.copy_links(remove.id, keep.id).await?;
        store.unlink_all(remove.id).await?;
        store.delete_tag(remove.id).await?;
        txn.commit().await?;
        Ok::<_, sea_orm::DbErr>(copied)
    }
    .await;

    match result {
        Ok(copied) => {
            info!(keep_id = keep.id, removed_id = remove.id, copied, "Merged tag");
            Ok(())
        }
        Err(e) => Err(ItemError::new(Stage::Merge, e)),
    }
}
