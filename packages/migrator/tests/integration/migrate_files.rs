use std::collections::HashSet;
use std::sync::Arc;

use common::storage::{ObjectKey, ObjectStore};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel, Set};

use migrator::context::RunMode;
use migrator::error::Stage;
use migrator::legacy;
use migrator::migration::FileMigrator;
use migrator::migration::files::write_metadata;

use crate::common::{FlakyStore, LegacyFile, TestEnv, at};

async fn migrate(env: &TestEnv, store: &dyn ObjectStore, mode: RunMode) -> migrator::report::MigrationReport {
    FileMigrator::new(&env.source, &env.target, store, mode, 10)
        .run()
        .await
        .expect("file migration aborted")
}

mod happy_path {
    use super::*;

    #[tokio::test]
    async fn rows_objects_and_raw_tags_are_migrated() {
        let env = TestEnv::spawn().await;
        env.legacy_user(1, "alice", Some("alice@example.com")).await;
        migrator::migration::UserMigrator::new(&env.source, &env.target, RunMode::Execute, 10)
            .run()
            .await
            .unwrap();

        env.legacy_file(
            LegacyFile::new(1, "team.zip")
                .owner("1")
                .tags(&[" RPG ", "   ", "ア ク"]),
        )
        .await;
        env.legacy_file(LegacyFile::new(2, "replay.lzh").owner("1")).await;
        env.legacy_file(LegacyFile::new(3, "empty.txt").without_data()).await;

        let report = migrate(&env, env.store.as_ref(), RunMode::Execute).await;
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 2);
        assert!(!report.has_failures());

        let files = env.target_files().await;
        let ids: Vec<i32> = files.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let first = &files[0];
        assert_eq!(first.file_path.as_deref(), Some("files/1/team.zip"));
        assert_eq!(first.file_size, "payload of 1".len() as i64);
        assert_eq!(first.upload_user_id, Some(1));
        assert_eq!(first.upload_owner_name, "owner1");

        let key = ObjectKey::for_file(1, "team.zip");
        assert!(env.store.exists(&key).await.unwrap());
        let on_disk = std::fs::read(env.store_dir.path().join("files/1/team.zip")).unwrap();
        assert_eq!(on_disk, b"payload of 1");

        // Slots are trimmed only; splitting is left to clean-tags.
        assert_eq!(env.tags_of(1).await, vec!["RPG", "ア ク"]);
        assert!(env.tags_of(2).await.is_empty());
    }

    #[tokio::test]
    async fn small_batches_cover_every_page() {
        let env = TestEnv::spawn().await;
        for id in 1..=5 {
            env.legacy_file(LegacyFile::new(id, "a.zip")).await;
        }

        let report = FileMigrator::new(&env.source, &env.target, env.store.as_ref(), RunMode::Execute, 2)
            .run()
            .await
            .unwrap();
        assert_eq!(report.succeeded, 5);
        assert_eq!(env.target_files().await.len(), 5);
    }

    #[tokio::test]
    async fn shared_tag_text_reuses_one_tag() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip").tags(&["RPG"])).await;
        env.legacy_file(LegacyFile::new(2, "b.zip").tags(&["RPG", "RPG"])).await;

        migrate(&env, env.store.as_ref(), RunMode::Execute).await;

        assert_eq!(env.tag_names().await, vec!["RPG"]);
        assert_eq!(env.files_of("RPG").await, vec![1, 2]);
    }
}

mod owners {
    use super::*;

    #[tokio::test]
    async fn unknown_or_garbage_owner_is_stored_as_null() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip").owner("99")).await;
        env.legacy_file(LegacyFile::new(2, "b.zip").owner("guest")).await;

        let report = migrate(&env, env.store.as_ref(), RunMode::Execute).await;
        assert_eq!(report.succeeded, 2);

        let files = env.target_files().await;
        assert!(files.iter().all(|f| f.upload_user_id.is_none()));
    }

    #[tokio::test]
    async fn missing_owner_name_becomes_anonymous() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip").owner_name(None)).await;
        env.legacy_file(LegacyFile::new(2, "b.zip").owner_name(Some(""))).await;

        migrate(&env, env.store.as_ref(), RunMode::Execute).await;

        let names: Vec<String> = env
            .target_files()
            .await
            .into_iter()
            .map(|f| f.upload_owner_name)
            .collect();
        assert_eq!(names, vec!["Anonymous", "Anonymous"]);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn upload_failure_does_not_stop_later_files() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip").tags(&["RPG"])).await;
        env.legacy_file(LegacyFile::new(2, "b.zip").tags(&["RPG"])).await;

        let flaky = FlakyStore {
            inner: Arc::clone(&env.store),
            fail_ids: HashSet::from([1]),
        };
        let report = migrate(&env, &flaky, RunMode::Execute).await;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].stage, Stage::Uploading);
        assert!(report.failures[0].subject.contains("file 1"));

        // Nothing about file 1 reached the database.
        let ids: Vec<i32> = env.target_files().await.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(env.files_of("RPG").await, vec![2]);

        // A later run with a healthy store finishes the job.
        let report = migrate(&env, env.store.as_ref(), RunMode::Execute).await;
        assert!(!report.has_failures());
        assert_eq!(env.files_of("RPG").await, vec![1, 2]);
    }

    #[tokio::test]
    async fn rerun_completes_tag_links_for_a_written_row() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(7, "team.zip").tags(&["RPG", "多脚"])).await;

        // State left behind by a run that uploaded and wrote the row but
        // never linked tags.
        let row = legacy::file::Entity::find_by_id(7)
            .one(&env.source)
            .await
            .unwrap()
            .unwrap();
        let bare = legacy::file::Model {
            search_tag1: None,
            search_tag2: None,
            ..row
        };
        let key = ObjectKey::for_file(7, "team.zip");
        env.store.put(&key, b"payload of 7", "application/zip").await.unwrap();
        write_metadata(&env.target, &bare, &key).await.unwrap();
        assert!(env.tags_of(7).await.is_empty());

        let report = migrate(&env, env.store.as_ref(), RunMode::Execute).await;
        assert!(!report.has_failures());

        let files = env.target_files().await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, 7);
        assert_eq!(files[0].file_path.as_deref(), Some(key.as_str()));
        assert_eq!(env.tags_of(7).await, vec!["RPG", "多脚"]);
    }

    #[tokio::test]
    async fn tag_link_failure_rolls_back_the_row() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip").tags(&["RPG"])).await;
        env.legacy_file(LegacyFile::new(2, "b.zip").tags(&["RPG", "多脚"])).await;

        env.target
            .execute_unprepared(
                "CREATE FUNCTION reject_link() RETURNS trigger AS $$ \
                 BEGIN RAISE EXCEPTION 'link rejected'; END; $$ LANGUAGE plpgsql",
            )
            .await
            .unwrap();
        env.target
            .execute_unprepared(
                "CREATE TRIGGER reject_file_2 BEFORE INSERT ON file_tags \
                 FOR EACH ROW WHEN (NEW.file_id = 2) EXECUTE FUNCTION reject_link()",
            )
            .await
            .unwrap();

        let report = migrate(&env, env.store.as_ref(), RunMode::Execute).await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].stage, Stage::TagLinking);
        assert!(report.failures[0].subject.contains("file 2"));

        // The upsert shared the transaction, so no half-written row remains.
        let ids: Vec<i32> = env.target_files().await.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(env.tag_names().await, vec!["RPG"]);

        env.target
            .execute_unprepared("DROP TRIGGER reject_file_2 ON file_tags")
            .await
            .unwrap();
        let report = migrate(&env, env.store.as_ref(), RunMode::Execute).await;
        assert!(!report.has_failures());
        assert_eq!(env.tags_of(2).await, vec!["RPG", "多脚"]);
    }
}

mod idempotence {
    use super::*;

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip").tags(&["RPG", "ア ク"])).await;
        env.legacy_file(LegacyFile::new(2, "b.zip").tags(&["RPG"])).await;

        migrate(&env, env.store.as_ref(), RunMode::Execute).await;
        let files_before = env.target_files().await;
        let links_before = env.link_count().await;

        let report = migrate(&env, env.store.as_ref(), RunMode::Execute).await;
        assert!(!report.has_failures());
        assert_eq!(env.target_files().await, files_before);
        assert_eq!(env.link_count().await, links_before);
        assert_eq!(env.tag_names().await, vec!["RPG", "ア ク"]);
    }

    #[tokio::test]
    async fn remigration_keeps_created_at_and_refreshes_the_rest() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip").created(at(2019, 6, 1))).await;
        migrate(&env, env.store.as_ref(), RunMode::Execute).await;

        let mut row = legacy::file::Entity::find_by_id(1)
            .one(&env.source)
            .await
            .unwrap()
            .unwrap()
            .into_active_model();
        row.file_name = Set("renamed.zip".to_string());
        row.created_at = Set(Some(at(2024, 1, 1)));
        row.updated_at = Set(Some(at(2024, 1, 2)));
        row.update(&env.source).await.unwrap();

        migrate(&env, env.store.as_ref(), RunMode::Execute).await;

        let files = env.target_files().await;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].created_at, Some(at(2019, 6, 1)));
        assert_eq!(files[0].updated_at, Some(at(2024, 1, 2)));
        assert_eq!(files[0].file_name, "renamed.zip");
        assert_eq!(files[0].file_path.as_deref(), Some("files/1/renamed.zip"));
    }
}

mod dry_run {
    use super::*;

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip").tags(&["RPG"])).await;
        env.legacy_file(LegacyFile::new(2, "b.pdf")).await;

        let report = migrate(&env, env.store.as_ref(), RunMode::DryRun).await;
        assert!(report.dry_run);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.succeeded, 0);

        assert!(env.target_files().await.is_empty());
        assert!(env.tag_names().await.is_empty());
        assert!(
            !env.store
                .exists(&ObjectKey::for_file(1, "a.zip"))
                .await
                .unwrap()
        );
    }
}
