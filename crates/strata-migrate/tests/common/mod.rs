#![allow(dead_code)]

use sqlx::Row;
use strata_core::prelude::{CheckConstraint, ForeignKey, Index, ReferentialAction, UniqueConstraint, View};
use strata_migrate::prelude::*;

pub async fn memory_source() -> DataSource {
    DataSource::connect(DataSourceOptions::new("sqlite::memory:"))
        .await
        .unwrap_or_else(|e| panic!("Failed to open in-memory SQLite: {e}"))
}

pub fn user_table() -> Table {
    Table::new("user")
        .column(Column::new("id", "integer").primary().generated(Generation::Increment))
        .column(Column::new("email", "varchar").length("255"))
        .unique(UniqueConstraint::new(["email"]))
}

pub fn post_table(title_length: &str) -> Table {
    Table::new("post")
        .column(Column::new("id", "integer").primary().generated(Generation::Increment))
        .column(Column::new("title", "varchar").length(title_length))
        .column(
            Column::new("status", "enum")
                .enum_values(["draft", "published"])
                .default_value("'draft'"),
        )
        .column(Column::new("author_id", "integer").nullable())
        .column(Column::new("deleted_at", "datetime").nullable())
        .check(CheckConstraint::new("length(title) > 0"))
        .index(Index::new(["title"]).predicate("deleted_at IS NULL"))
        .foreign_key(
            ForeignKey::new(["author_id"], "user", ["id"]).on_delete(ReferentialAction::SetNull),
        )
}

pub fn blog_schema(title_length: &str) -> Schema {
    Schema::new()
        .table(user_table())
        .table(post_table(title_length))
        .view(View::new(
            "published_post",
            "SELECT \"id\", \"title\" FROM \"post\" WHERE \"status\" = 'published'",
        ))
}

pub async fn count(source: &DataSource, sql: &str) -> i64 {
    sqlx::query(sql)
        .fetch_one(source.pool())
        .await
        .unwrap()
        .get::<i64, _>(0)
}

pub async fn table_names(source: &DataSource) -> Vec<String> {
    let mut names: Vec<String> = source
        .introspect(None)
        .await
        .unwrap()
        .tables
        .into_iter()
        .map(|t| t.name.name)
        .collect();
    names.sort();
    names
}
