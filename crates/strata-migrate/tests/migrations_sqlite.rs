//! Migration generation, files and the ledger against in-memory SQLite.

mod common;

use common::{blog_schema, count, memory_source, table_names};
use strata_migrate::prelude::*;

#[tokio::test]
async fn generated_migration_runs_and_reverts() {
    let source = memory_source().await;
    let desired = blog_schema("50");

    let migration = source
        .generate_migration(&desired, "create blog")
        .await
        .unwrap()
        .expect("a migration for an empty database");
    assert!(migration.name.starts_with("CreateBlog"));
    assert!(!migration.down.is_empty());

    let known = vec![migration.clone()];
    assert!(source.has_pending_migrations(&known).await.unwrap());

    let ran = source
        .run_migrations(&known, RunOptions::default())
        .await
        .unwrap();
    assert_eq!(ran, known);
    assert_eq!(table_names(&source).await, vec!["post", "user"]);
    assert!(source
        .generate_migration(&desired, "nothing")
        .await
        .unwrap()
        .is_none());

    let statuses = source.show_migrations(&known).await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].applied);

    let reverted = source
        .revert_last_migration(&known, RunOptions::default())
        .await
        .unwrap();
    assert_eq!(reverted.id, migration.id);
    assert!(table_names(&source).await.is_empty());
    assert_eq!(count(&source, "SELECT COUNT(*) FROM \"migrations\"").await, 0);

    source.destroy().await.unwrap();
}

#[tokio::test]
async fn revert_on_empty_ledger_leaves_source_usable() {
    let source = memory_source().await;
    let result = source
        .revert_last_migration(&[], RunOptions::default())
        .await;
    assert!(matches!(result, Err(MigrateError::NothingToRevert)));

    // Still usable afterwards
    assert!(source.show_migrations(&[]).await.unwrap().is_empty());
    source.destroy().await.unwrap();
}

#[tokio::test]
async fn migrations_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = memory_source().await;

    let migration = source
        .generate_migration(&blog_schema("50"), "create blog")
        .await
        .unwrap()
        .unwrap();
    MigrationWriter::new(dir.path()).write(&migration).unwrap();

    let known = load_migrations(dir.path()).unwrap();
    assert_eq!(known, vec![migration]);
    source
        .run_migrations(&known, RunOptions::default())
        .await
        .unwrap();
    assert_eq!(table_names(&source).await, vec!["post", "user"]);
    source.destroy().await.unwrap();
}

#[tokio::test]
async fn each_mode_keeps_the_applied_prefix() {
    let source = memory_source().await;
    let known = vec![
        Migration::from_sql(
            "CreateTag1700000000001",
            &["CREATE TABLE \"tag\" (\"id\" integer NOT NULL, PRIMARY KEY (\"id\"))"],
            &["DROP TABLE \"tag\""],
        )
        .unwrap(),
        Migration::from_sql(
            "InsertIntoMissing1700000000002",
            &["INSERT INTO \"missing\" VALUES (1)"],
            &[],
        )
        .unwrap(),
    ];

    let err = source
        .run_migrations(&known, RunOptions::default().transaction(TransactionMode::Each))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("InsertIntoMissing1700000000002"));
    assert!(matches!(
        err,
        MigrateError::PartialBatchFailure { ref applied, .. } if applied.len() == 1
    ));
    assert_eq!(table_names(&source).await, vec!["tag"]);

    let statuses = source.show_migrations(&known).await.unwrap();
    assert!(statuses[0].applied);
    assert!(!statuses[1].applied);
    source.destroy().await.unwrap();
}

#[tokio::test]
async fn none_mode_keeps_the_applied_prefix() {
    let source = memory_source().await;
    let known = vec![
        Migration::from_sql(
            "CreateTag1700000000001",
            &["CREATE TABLE \"tag\" (\"id\" integer NOT NULL, PRIMARY KEY (\"id\"))"],
            &["DROP TABLE \"tag\""],
        )
        .unwrap(),
        Migration::from_sql("Broken1700000000002", &["NOT SQL"], &[]).unwrap(),
    ];

    let result = source
        .run_migrations(&known, RunOptions::default().transaction(TransactionMode::None))
        .await;
    assert!(matches!(result, Err(MigrateError::PartialBatchFailure { .. })));
    assert_eq!(table_names(&source).await, vec!["tag"]);
    source.destroy().await.unwrap();
}
