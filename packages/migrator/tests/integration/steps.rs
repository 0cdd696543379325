use std::collections::HashSet;
use std::sync::Arc;

use common::storage::{ObjectKey, ObjectStore};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use migrator::context::RunMode;
use migrator::entity::{tag, user};
use migrator::error::Stage;
use migrator::migration::{FileMigrator, UserMigrator, fix_sequences, verify};

use crate::common::{FlakyStore, LegacyFile, TestEnv};

mod users {
    use super::*;

    #[tokio::test]
    async fn users_keep_ids_and_get_placeholder_emails() {
        let env = TestEnv::spawn().await;
        env.legacy_user(3, "alice", Some("alice@example.com")).await;
        env.legacy_user(8, "bob", None).await;

        let report = UserMigrator::new(&env.source, &env.target, RunMode::Execute, 1)
            .run()
            .await
            .unwrap();
        assert_eq!(report.succeeded, 2);

        let users = user::Entity::find().all(&env.target).await.unwrap();
        let mut rows: Vec<(i32, String)> = users.into_iter().map(|u| (u.id, u.email)).collect();
        rows.sort();
        assert_eq!(
            rows,
            vec![
                (3, "alice@example.com".to_string()),
                (8, "user8@placeholder.local".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn existing_users_are_skipped_on_rerun() {
        let env = TestEnv::spawn().await;
        env.legacy_user(1, "alice", None).await;

        let migrator = UserMigrator::new(&env.source, &env.target, RunMode::Execute, 10);
        migrator.run().await.unwrap();
        let second = migrator.run().await.unwrap();

        assert_eq!(second.attempted, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.succeeded, 0);
        assert!(!second.has_failures());
    }

    #[tokio::test]
    async fn dry_run_inserts_nothing() {
        let env = TestEnv::spawn().await;
        env.legacy_user(1, "alice", None).await;

        let report = UserMigrator::new(&env.source, &env.target, RunMode::DryRun, 10)
            .run()
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert!(user::Entity::find().all(&env.target).await.unwrap().is_empty());
    }
}

mod sequences {
    use super::*;

    #[tokio::test]
    async fn next_serial_id_exceeds_migrated_maximum() {
        let env = TestEnv::spawn().await;
        for id in [5, 40] {
            tag::ActiveModel {
                id: Set(id),
                tag_name: Set(format!("t{id}")),
            }
            .insert(&env.target)
            .await
            .unwrap();
        }

        let (states, report) = fix_sequences(&env.target, RunMode::Execute).await.unwrap();
        assert!(!report.has_failures());
        let tags = states.iter().find(|s| s.table == "tags").unwrap();
        assert_eq!(tags.max_id, 40);

        let next = env.target_tag("fresh").await;
        assert!(next > 40, "got id {next}");
    }

    #[tokio::test]
    async fn dry_run_only_reads_maxima() {
        let env = TestEnv::spawn().await;
        tag::ActiveModel {
            id: Set(10),
            tag_name: Set("t10".to_string()),
        }
        .insert(&env.target)
        .await
        .unwrap();

        let (states, report) = fix_sequences(&env.target, RunMode::DryRun).await.unwrap();
        assert_eq!(report.skipped, 3);
        assert_eq!(states.len(), 3);

        // Sequence untouched: the first generated id is still 1.
        assert_eq!(env.target_tag("fresh").await, 1);
    }
}

mod verification {
    use super::*;

    #[tokio::test]
    async fn missing_objects_are_failures() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip")).await;
        FileMigrator::new(&env.source, &env.target, env.store.as_ref(), RunMode::Execute, 10)
            .run()
            .await
            .unwrap();
        // A row whose object was never written.
        env.target_file(2).await;

        let outcome = verify(&env.target, env.store.as_ref(), 10).await.unwrap();
        assert_eq!(outcome.migrated, 2);
        assert_eq!(outcome.report.attempted, 2);
        assert_eq!(outcome.report.succeeded, 1);
        assert_eq!(outcome.report.failed, 1);
        assert_eq!(outcome.report.failures[0].stage, Stage::Verifying);
        assert!(outcome.report.failures[0].subject.contains("file 2"));
    }

    #[tokio::test]
    async fn sample_size_caps_checks() {
        let env = TestEnv::spawn().await;
        for id in 1..=4 {
            env.legacy_file(LegacyFile::new(id, "a.zip")).await;
        }
        FileMigrator::new(&env.source, &env.target, env.store.as_ref(), RunMode::Execute, 10)
            .run()
            .await
            .unwrap();

        let outcome = verify(&env.target, env.store.as_ref(), 2).await.unwrap();
        assert_eq!(outcome.migrated, 4);
        assert_eq!(outcome.report.attempted, 2);
        assert!(!outcome.report.has_failures());
    }

    #[tokio::test]
    async fn failed_upload_is_not_counted_as_migrated() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip")).await;
        env.legacy_file(LegacyFile::new(2, "b.zip")).await;
        let flaky = FlakyStore {
            inner: Arc::clone(&env.store),
            fail_ids: HashSet::from([2]),
        };
        FileMigrator::new(&env.source, &env.target, &flaky, RunMode::Execute, 10)
            .run()
            .await
            .unwrap();

        let outcome = verify(&env.target, env.store.as_ref(), 10).await.unwrap();
        assert_eq!(outcome.migrated, 1);
        assert!(!outcome.report.has_failures());
        assert!(!env.store.exists(&ObjectKey::for_file(2, "b.zip")).await.unwrap());
    }
}

mod context {
    use migrator::config::{
        DatabaseConfig, MigrationConfig, MigratorConfig, StorageAppConfig, StorageBackend,
    };
    use migrator::context::{MigrationContext, Requirements};

    use super::*;

    fn config(env: &TestEnv) -> MigratorConfig {
        MigratorConfig {
            source: Some(DatabaseConfig {
                url: env.source_url.clone(),
            }),
            target: DatabaseConfig {
                url: env.target_url.clone(),
            },
            storage: StorageAppConfig {
                backend: StorageBackend::Filesystem,
                root: env.store_dir.path().to_path_buf(),
                ..Default::default()
            },
            migration: MigrationConfig::default(),
        }
    }

    #[tokio::test]
    async fn context_opens_only_what_the_step_needs() {
        let env = TestEnv::spawn().await;
        let ctx = MigrationContext::connect(&config(&env), RunMode::Execute, Requirements::default())
            .await
            .unwrap();
        assert!(ctx.source().is_err());
        assert!(ctx.store().is_err());
    }

    #[tokio::test]
    async fn s3_without_credentials_fails_before_connecting() {
        let env = TestEnv::spawn().await;
        let config = MigratorConfig {
            storage: StorageAppConfig::default(),
            ..config(&env)
        };
        let needs = Requirements {
            source: true,
            store: true,
        };
        let err = MigrationContext::connect(&config, RunMode::Execute, needs)
            .await
            .err()
            .expect("missing credentials must be fatal");
        assert!(err.to_string().contains("storage.bucket"), "{err}");
    }

    #[tokio::test]
    async fn files_migrate_through_a_configured_context() {
        let env = TestEnv::spawn().await;
        env.legacy_file(LegacyFile::new(1, "a.zip")).await;

        let needs = Requirements {
            source: true,
            store: true,
        };
        let ctx = MigrationContext::connect(&config(&env), RunMode::Execute, needs)
            .await
            .unwrap();
        let report = FileMigrator::new(
            ctx.source().unwrap(),
            &ctx.target,
            ctx.store().unwrap(),
            ctx.mode,
            10,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(report.succeeded, 1);
        assert!(env.store.exists(&ObjectKey::for_file(1, "a.zip")).await.unwrap());
    }
}
