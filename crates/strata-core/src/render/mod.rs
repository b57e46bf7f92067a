//! DDL synthesis.
//!
//! [`render`] turns one [`Operation`] into the statements that apply it and
//! the statements that undo it, for a given [`Dialect`]. Rendering is pure:
//! nothing here touches a database. Names the model leaves empty are filled
//! in from [`crate::naming`], and every identifier is quoted by the dialect.

mod column;
mod constraint;
mod table;

use tracing::trace;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::operation::{Change, Operation};
use crate::query::{Query, RenderedSql, SqlInMemory};
use crate::schema::Table;

/// Renders the forward statements of `operation`.
pub fn statements(operation: &Operation, dialect: &Dialect) -> Result<Vec<Query>> {
    let queries = match operation {
        Operation::CreateTable { table } => table::create_table(table, dialect)?,
        Operation::DropTable { table } => table::drop_table(table, dialect)?,
        Operation::RecreateTable { from, to } => table::recreate_table(from, to, dialect)?,
        Operation::AddColumn { table, column } => column::add_column(table, column, dialect)?,
        Operation::DropColumn { table, column } => column::drop_column(table, column, dialect)?,
        Operation::AlterColumn { table, from, to } => {
            column::alter_column(table, from, to, dialect)?
        }
        Operation::AddPrimaryKey { table, primary_key } => {
            vec![constraint::add_primary_key(table, primary_key, dialect)?]
        }
        Operation::DropPrimaryKey { table, primary_key } => {
            vec![constraint::drop_primary_key(table, primary_key, dialect)?]
        }
        Operation::RenamePrimaryKey { table, from, to, .. } => {
            vec![constraint::rename_primary_key(table, from, to, dialect)?]
        }
        Operation::CreateIndex { table, index } => {
            vec![constraint::create_index(table, index, dialect)?]
        }
        Operation::DropIndex { table, index } => vec![constraint::drop_index(table, index, dialect)],
        Operation::AddUnique { table, unique } => {
            vec![constraint::add_unique(table, unique, dialect)?]
        }
        Operation::DropUnique { table, unique } => {
            vec![constraint::drop_unique(table, unique, dialect)?]
        }
        Operation::AddCheck { table, check } => vec![constraint::add_check(table, check, dialect)?],
        Operation::DropCheck { table, check } => {
            vec![constraint::drop_check(table, check, dialect)?]
        }
        Operation::AddExclusion { table, exclusion } => {
            vec![constraint::add_exclusion(table, exclusion, dialect)?]
        }
        Operation::DropExclusion { table, exclusion } => {
            vec![constraint::drop_exclusion(table, exclusion, dialect)?]
        }
        Operation::AddForeignKey { table, foreign_key } => {
            vec![constraint::add_foreign_key(table, foreign_key, dialect)?]
        }
        Operation::DropForeignKey { table, foreign_key } => {
            vec![constraint::drop_foreign_key(table, foreign_key, dialect)?]
        }
        Operation::CreateView { view } => vec![table::create_view(view, dialect)?],
        Operation::DropView { view } => vec![table::drop_view(view, dialect)?],
        Operation::SetTableComment { table, to, .. } => {
            vec![table::set_table_comment(table, to.as_deref(), dialect)?]
        }
    };
    trace!(
        operation = %operation.describe(),
        dialect = %dialect,
        statements = queries.len(),
        "Rendered operation"
    );
    Ok(queries)
}

/// Renders `operation` in both directions.
pub fn render(operation: &Operation, dialect: &Dialect) -> Result<RenderedSql> {
    Ok(RenderedSql {
        up: statements(operation, dialect)?,
        down: statements(&operation.inverse(), dialect)?,
    })
}

/// Renders a change using its recorded `up` and `down` operations.
pub fn render_change(change: &Change, dialect: &Dialect) -> Result<RenderedSql> {
    Ok(RenderedSql {
        up: statements(&change.up, dialect)?,
        down: statements(&change.down, dialect)?,
    })
}

/// Renders an ordered list of changes. The down statements come out in
/// reverse change order, ready to execute.
pub fn render_changes(changes: &[Change], dialect: &Dialect) -> Result<SqlInMemory> {
    let mut sql = SqlInMemory::default();
    let mut down_blocks = Vec::with_capacity(changes.len());
    for change in changes {
        let rendered = render_change(change, dialect)?;
        sql.up_queries.extend(rendered.up);
        down_blocks.push(rendered.down);
    }
    for block in down_blocks.into_iter().rev() {
        sql.down_queries.extend(block);
    }
    Ok(sql)
}

/// CREATE TABLE statements for a table, as used to bootstrap metadata tables.
pub fn create_table_statements(table: &Table, dialect: &Dialect) -> Result<Vec<Query>> {
    statements(
        &Operation::CreateTable {
            table: table.clone(),
        },
        dialect,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MYSQL, POSTGRES};
    use crate::schema::{Column, TableName};

    #[test]
    fn render_pairs_add_and_drop_column() {
        let op = Operation::AddColumn {
            table: TableName::new("post"),
            column: Column::new("description", "varchar")
                .length("100")
                .default_value("'x'"),
        };
        let rendered = render(&op, &POSTGRES).unwrap();
        assert_eq!(rendered.up.len(), 1);
        assert_eq!(
            rendered.up[0].sql,
            "ALTER TABLE \"post\" ADD \"description\" varchar(100) DEFAULT 'x' NOT NULL"
        );
        assert_eq!(
            rendered.down[0].sql,
            "ALTER TABLE \"post\" DROP COLUMN \"description\""
        );
    }

    #[test]
    fn render_changes_reverses_down_blocks() {
        let changes = vec![
            Change::new(Operation::AddColumn {
                table: TableName::new("a"),
                column: Column::new("x", "int"),
            }),
            Change::new(Operation::AddColumn {
                table: TableName::new("b"),
                column: Column::new("y", "int"),
            }),
        ];
        let sql = render_changes(&changes, &MYSQL).unwrap();
        assert_eq!(
            sql.up_queries.iter().map(|q| q.sql.as_str()).collect::<Vec<_>>(),
            vec![
                "ALTER TABLE `a` ADD `x` int NOT NULL",
                "ALTER TABLE `b` ADD `y` int NOT NULL"
            ]
        );
        assert_eq!(
            sql.down_queries.iter().map(|q| q.sql.as_str()).collect::<Vec<_>>(),
            vec![
                "ALTER TABLE `b` DROP COLUMN `y`",
                "ALTER TABLE `a` DROP COLUMN `x`"
            ]
        );
    }
}
