//! End-to-end synchronization against in-memory SQLite.
//!
//! Each test syncs a model, reads the schema back through the introspector
//! and checks that the differ sees nothing left to do.

mod common;

use common::{blog_schema, count, memory_source, table_names};
use sqlx::Row;
use strata_core::diff;
use strata_core::prelude::{Generation, ReferentialAction};
use strata_migrate::prelude::*;

#[tokio::test]
async fn sync_then_introspect_is_stable() {
    let source = memory_source().await;
    let desired = blog_schema("50");

    let sql = source.synchronize(&desired, false).await.unwrap();
    assert!(!sql.up_queries.is_empty());

    let live = source.introspect(None).await.unwrap();
    let remaining = diff(&desired, &live, source.dialect()).unwrap();
    assert!(remaining.is_empty(), "unexpected changes: {:?}", remaining.changes);
    assert!(source.log_sync_sql(&desired).await.unwrap().up_queries.is_empty());

    source.destroy().await.unwrap();
}

#[tokio::test]
async fn introspection_reads_back_the_model() {
    let source = memory_source().await;
    source.synchronize(&blog_schema("50"), false).await.unwrap();

    let live = source.introspect(None).await.unwrap();
    assert_eq!(table_names(&source).await, vec!["post", "user"]);

    let post = live.get_table(&TableName::new("post")).unwrap();
    let id = post.get_column("id").unwrap();
    assert_eq!(id.generation, Some(Generation::Increment));
    assert_eq!(post.primary_key.as_ref().unwrap().columns, vec!["id"]);

    let status = post.get_column("status").unwrap();
    assert_eq!(status.data_type, "enum");
    assert_eq!(status.enum_values, vec!["draft", "published"]);
    assert!(post.checks.iter().all(|c| !c.expression.contains("IN (")));

    let title = post.get_column("title").unwrap();
    assert_eq!(title.length.as_deref(), Some("50"));
    assert!(!title.nullable);

    let fk = &post.foreign_keys[0];
    assert_eq!(fk.referenced_table, TableName::new("user"));
    assert_eq!(fk.on_delete, ReferentialAction::SetNull);
    assert!(fk.name.as_deref().is_some_and(|n| n.starts_with("FK_")));

    let index = &post.indices[0];
    assert_eq!(index.columns, vec!["title"]);
    assert_eq!(index.predicate.as_deref(), Some("deleted_at IS NULL"));

    assert_eq!(live.views.len(), 1);
    assert_eq!(live.views[0].name, TableName::new("published_post"));

    source.destroy().await.unwrap();
}

#[tokio::test]
async fn growing_a_varchar_keeps_rows() {
    let source = memory_source().await;
    source.synchronize(&blog_schema("50"), false).await.unwrap();

    sqlx::query("INSERT INTO \"user\" (\"email\") VALUES ('ada@example.com')")
        .execute(source.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO \"post\" (\"title\", \"author_id\") VALUES ('Hello', 1)")
        .execute(source.pool())
        .await
        .unwrap();

    let desired = blog_schema("100");
    source.synchronize(&desired, false).await.unwrap();

    let row = sqlx::query("SELECT \"title\", \"status\" FROM \"post\"")
        .fetch_one(source.pool())
        .await
        .unwrap();
    assert_eq!(row.get::<String, _>("title"), "Hello");
    assert_eq!(row.get::<String, _>("status"), "draft");

    let live = source.introspect(None).await.unwrap();
    let post = live.get_table(&TableName::new("post")).unwrap();
    assert_eq!(post.get_column("title").unwrap().length.as_deref(), Some("100"));
    assert!(diff(&desired, &live, source.dialect()).unwrap().is_empty());

    source.destroy().await.unwrap();
}

#[tokio::test]
async fn log_sync_sql_does_not_execute() {
    let source = memory_source().await;
    let sql = source.log_sync_sql(&blog_schema("50")).await.unwrap();
    assert!(sql.up_script().contains("CREATE TABLE \"post\""));
    assert!(table_names(&source).await.is_empty());
    source.destroy().await.unwrap();
}

#[tokio::test]
async fn drop_database_removes_everything() {
    let source = memory_source().await;
    source.synchronize(&blog_schema("50"), false).await.unwrap();
    source
        .run_migrations(&[], RunOptions::default())
        .await
        .unwrap();

    source.drop_database().await.unwrap();
    assert_eq!(
        count(&source, "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'").await,
        0
    );
    source.destroy().await.unwrap();
}

#[tokio::test]
async fn sync_with_drop_rebuilds_from_scratch() {
    let source = memory_source().await;
    source.synchronize(&blog_schema("50"), false).await.unwrap();
    sqlx::query("INSERT INTO \"user\" (\"email\") VALUES ('ada@example.com')")
        .execute(source.pool())
        .await
        .unwrap();

    source.synchronize(&blog_schema("50"), true).await.unwrap();
    assert_eq!(count(&source, "SELECT COUNT(*) FROM \"user\"").await, 0);
    source.destroy().await.unwrap();
}

#[tokio::test]
async fn introspection_filter_limits_tables() {
    let source = memory_source().await;
    source.synchronize(&blog_schema("50"), false).await.unwrap();

    let only_user = source
        .introspect(Some(&[TableName::new("user")][..]))
        .await
        .unwrap();
    assert_eq!(only_user.tables.len(), 1);
    assert_eq!(only_user.tables[0].name, TableName::new("user"));
    source.destroy().await.unwrap();
}
