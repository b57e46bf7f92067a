//! Schema change operations.
//!
//! An [`Operation`] is one structural change, carrying every object it
//! touches in full. Because drops keep the dropped definition, every
//! operation has an exact inverse and a migration's down direction never
//! has to consult the database.

use serde::{Deserialize, Serialize};

use crate::schema::{
    CheckConstraint, Column, ExclusionConstraint, ForeignKey, Index, PrimaryKey, Table, TableName,
    UniqueConstraint, View,
};

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Create a table with its columns, keys, constraints and indices.
    CreateTable {
        /// The table to create.
        table: Table,
    },
    /// Drop a table.
    DropTable {
        /// The table as it exists before the drop.
        table: Table,
    },
    /// Rebuild a table under a new definition, copying surviving columns.
    RecreateTable {
        /// Current definition.
        from: Table,
        /// New definition.
        to: Table,
    },
    /// Add a column.
    AddColumn {
        /// Owning table.
        table: TableName,
        /// The new column.
        column: Column,
    },
    /// Drop a column.
    DropColumn {
        /// Owning table.
        table: TableName,
        /// The column as it exists before the drop.
        column: Column,
    },
    /// Change a column in place.
    AlterColumn {
        /// Owning table.
        table: TableName,
        /// Current definition.
        from: Column,
        /// New definition.
        to: Column,
    },
    /// Add a primary key.
    AddPrimaryKey {
        /// Owning table.
        table: TableName,
        /// The key to add.
        primary_key: PrimaryKey,
    },
    /// Drop a primary key.
    DropPrimaryKey {
        /// Owning table.
        table: TableName,
        /// The key as it exists before the drop.
        primary_key: PrimaryKey,
    },
    /// Rename a primary key constraint without touching its columns.
    RenamePrimaryKey {
        /// Owning table.
        table: TableName,
        /// Key columns.
        columns: Vec<String>,
        /// Current name.
        from: String,
        /// New name.
        to: String,
    },
    /// Create an index.
    CreateIndex {
        /// Owning table.
        table: TableName,
        /// The index to create.
        index: Index,
    },
    /// Drop an index.
    DropIndex {
        /// Owning table.
        table: TableName,
        /// The index as it exists before the drop.
        index: Index,
    },
    /// Add a unique constraint.
    AddUnique {
        /// Owning table.
        table: TableName,
        /// The constraint to add.
        unique: UniqueConstraint,
    },
    /// Drop a unique constraint.
    DropUnique {
        /// Owning table.
        table: TableName,
        /// The constraint as it exists before the drop.
        unique: UniqueConstraint,
    },
    /// Add a check constraint.
    AddCheck {
        /// Owning table.
        table: TableName,
        /// The constraint to add.
        check: CheckConstraint,
    },
    /// Drop a check constraint.
    DropCheck {
        /// Owning table.
        table: TableName,
        /// The constraint as it exists before the drop.
        check: CheckConstraint,
    },
    /// Add an exclusion constraint.
    AddExclusion {
        /// Owning table.
        table: TableName,
        /// The constraint to add.
        exclusion: ExclusionConstraint,
    },
    /// Drop an exclusion constraint.
    DropExclusion {
        /// Owning table.
        table: TableName,
        /// The constraint as it exists before the drop.
        exclusion: ExclusionConstraint,
    },
    /// Add a foreign key.
    AddForeignKey {
        /// Owning table.
        table: TableName,
        /// The key to add.
        foreign_key: ForeignKey,
    },
    /// Drop a foreign key.
    DropForeignKey {
        /// Owning table.
        table: TableName,
        /// The key as it exists before the drop.
        foreign_key: ForeignKey,
    },
    /// Create a view.
    CreateView {
        /// The view to create.
        view: View,
    },
    /// Drop a view.
    DropView {
        /// The view as it exists before the drop.
        view: View,
    },
    /// Change a table's comment.
    SetTableComment {
        /// Owning table.
        table: TableName,
        /// Current comment.
        from: Option<String>,
        /// New comment.
        to: Option<String>,
    },
}

impl Operation {
    /// Returns the operation that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            Self::CreateTable { table } => Self::DropTable {
                table: table.clone(),
            },
            Self::DropTable { table } => Self::CreateTable {
                table: table.clone(),
            },
            Self::RecreateTable { from, to } => Self::RecreateTable {
                from: to.clone(),
                to: from.clone(),
            },
            Self::AddColumn { table, column } => Self::DropColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Self::DropColumn { table, column } => Self::AddColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Self::AlterColumn { table, from, to } => Self::AlterColumn {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Self::AddPrimaryKey { table, primary_key } => Self::DropPrimaryKey {
                table: table.clone(),
                primary_key: primary_key.clone(),
            },
            Self::DropPrimaryKey { table, primary_key } => Self::AddPrimaryKey {
                table: table.clone(),
                primary_key: primary_key.clone(),
            },
            Self::RenamePrimaryKey {
                table,
                columns,
                from,
                to,
            } => Self::RenamePrimaryKey {
                table: table.clone(),
                columns: columns.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Self::CreateIndex { table, index } => Self::DropIndex {
                table: table.clone(),
                index: index.clone(),
            },
            Self::DropIndex { table, index } => Self::CreateIndex {
                table: table.clone(),
                index: index.clone(),
            },
            Self::AddUnique { table, unique } => Self::DropUnique {
                table: table.clone(),
                unique: unique.clone(),
            },
            Self::DropUnique { table, unique } => Self::AddUnique {
                table: table.clone(),
                unique: unique.clone(),
            },
            Self::AddCheck { table, check } => Self::DropCheck {
                table: table.clone(),
                check: check.clone(),
            },
            Self::DropCheck { table, check } => Self::AddCheck {
                table: table.clone(),
                check: check.clone(),
            },
            Self::AddExclusion { table, exclusion } => Self::DropExclusion {
                table: table.clone(),
                exclusion: exclusion.clone(),
            },
            Self::DropExclusion { table, exclusion } => Self::AddExclusion {
                table: table.clone(),
                exclusion: exclusion.clone(),
            },
            Self::AddForeignKey { table, foreign_key } => Self::DropForeignKey {
                table: table.clone(),
                foreign_key: foreign_key.clone(),
            },
            Self::DropForeignKey { table, foreign_key } => Self::AddForeignKey {
                table: table.clone(),
                foreign_key: foreign_key.clone(),
            },
            Self::CreateView { view } => Self::DropView { view: view.clone() },
            Self::DropView { view } => Self::CreateView { view: view.clone() },
            Self::SetTableComment { table, from, to } => Self::SetTableComment {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            },
        }
    }

    /// Returns the table (or view) the operation applies to.
    #[must_use]
    pub fn target(&self) -> &TableName {
        match self {
            Self::CreateTable { table } | Self::DropTable { table } => &table.name,
            Self::RecreateTable { to, .. } => &to.name,
            Self::CreateView { view } | Self::DropView { view } => &view.name,
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::AlterColumn { table, .. }
            | Self::AddPrimaryKey { table, .. }
            | Self::DropPrimaryKey { table, .. }
            | Self::RenamePrimaryKey { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddUnique { table, .. }
            | Self::DropUnique { table, .. }
            | Self::AddCheck { table, .. }
            | Self::DropCheck { table, .. }
            | Self::AddExclusion { table, .. }
            | Self::DropExclusion { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. }
            | Self::SetTableComment { table, .. } => table,
        }
    }

    /// Returns `true` when applying the operation can lose data.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        match self {
            Self::DropTable { .. } | Self::DropColumn { .. } => true,
            Self::RecreateTable { from, to } => from
                .columns
                .iter()
                .any(|c| to.get_column(&c.name).is_none()),
            _ => false,
        }
    }

    /// Returns a human-readable description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("Create table '{}'", table.name),
            Self::DropTable { table } => format!("Drop table '{}'", table.name),
            Self::RecreateTable { to, .. } => format!("Recreate table '{}'", to.name),
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{}'", column.name, table)
            }
            Self::DropColumn { table, column } => {
                format!("Drop column '{}' from table '{}'", column.name, table)
            }
            Self::AlterColumn { table, to, .. } => {
                format!("Alter column '{}' in table '{}'", to.name, table)
            }
            Self::AddPrimaryKey { table, primary_key } => format!(
                "Add primary key ({}) to table '{}'",
                primary_key.columns.join(", "),
                table
            ),
            Self::DropPrimaryKey { table, .. } => {
                format!("Drop primary key of table '{}'", table)
            }
            Self::RenamePrimaryKey { table, from, to, .. } => format!(
                "Rename primary key '{}' to '{}' on table '{}'",
                from, to, table
            ),
            Self::CreateIndex { table, index } => format!(
                "Create index '{}' on table '{}'",
                index.name.as_deref().unwrap_or("?"),
                table
            ),
            Self::DropIndex { table, index } => format!(
                "Drop index '{}' on table '{}'",
                index.name.as_deref().unwrap_or("?"),
                table
            ),
            Self::AddUnique { table, unique } => format!(
                "Add unique constraint ({}) to table '{}'",
                unique.columns.join(", "),
                table
            ),
            Self::DropUnique { table, unique } => format!(
                "Drop unique constraint ({}) from table '{}'",
                unique.columns.join(", "),
                table
            ),
            Self::AddCheck { table, check } => {
                format!("Add check '{}' to table '{}'", check.expression, table)
            }
            Self::DropCheck { table, check } => {
                format!("Drop check '{}' from table '{}'", check.expression, table)
            }
            Self::AddExclusion { table, .. } => {
                format!("Add exclusion constraint to table '{}'", table)
            }
            Self::DropExclusion { table, .. } => {
                format!("Drop exclusion constraint from table '{}'", table)
            }
            Self::AddForeignKey { table, foreign_key } => format!(
                "Add foreign key ({}) on table '{}' referencing '{}'",
                foreign_key.columns.join(", "),
                table,
                foreign_key.referenced_table
            ),
            Self::DropForeignKey { table, foreign_key } => format!(
                "Drop foreign key ({}) on table '{}' referencing '{}'",
                foreign_key.columns.join(", "),
                table,
                foreign_key.referenced_table
            ),
            Self::CreateView { view } => format!("Create view '{}'", view.name),
            Self::DropView { view } => format!("Drop view '{}'", view.name),
            Self::SetTableComment { table, .. } => {
                format!("Change comment of table '{}'", table)
            }
        }
    }
}

/// A forward operation paired with its inverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Forward operation.
    pub up: Operation,
    /// Operation that undoes `up`.
    pub down: Operation,
}

impl Change {
    /// Pairs `up` with its computed inverse.
    #[must_use]
    pub fn new(up: Operation) -> Self {
        let down = up.inverse();
        Self { up, down }
    }
}

impl From<Operation> for Change {
    fn from(up: Operation) -> Self {
        Self::new(up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new("users")
            .column(Column::new("id", "int").primary())
            .column(Column::new("name", "varchar").length("50"))
    }

    #[test]
    fn inverse_of_create_table_drops_it() {
        let op = Operation::CreateTable { table: users() };
        match op.inverse() {
            Operation::DropTable { table } => assert_eq!(table, users()),
            other => panic!("Expected DropTable, got {:?}", other),
        }
    }

    #[test]
    fn inverse_is_an_involution() {
        let column = Column::new("bio", "text").nullable();
        let ops = vec![
            Operation::CreateTable { table: users() },
            Operation::AddColumn {
                table: TableName::new("users"),
                column: column.clone(),
            },
            Operation::AlterColumn {
                table: TableName::new("users"),
                from: Column::new("name", "varchar").length("50"),
                to: Column::new("name", "varchar").length("100"),
            },
            Operation::RenamePrimaryKey {
                table: TableName::new("users"),
                columns: vec!["id".to_string()],
                from: "PK_1".to_string(),
                to: "PK_2".to_string(),
            },
            Operation::CreateView {
                view: View::new("names", "SELECT name FROM users"),
            },
            Operation::SetTableComment {
                table: TableName::new("users"),
                from: None,
                to: Some("people".to_string()),
            },
        ];
        for op in ops {
            assert_eq!(op.inverse().inverse(), op);
            assert_ne!(op.inverse(), op);
        }
    }

    #[test]
    fn change_carries_inverse() {
        let change = Change::new(Operation::AddColumn {
            table: TableName::new("users"),
            column: Column::new("bio", "text"),
        });
        assert!(matches!(change.down, Operation::DropColumn { .. }));
        assert!(change.down.is_destructive());
        assert!(!change.up.is_destructive());
    }

    #[test]
    fn recreate_is_destructive_only_when_columns_disappear() {
        let narrower = Table::new("users").column(Column::new("id", "int").primary());
        let op = Operation::RecreateTable {
            from: users(),
            to: narrower,
        };
        assert!(op.is_destructive());
        assert!(!op.inverse().is_destructive());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let op = Operation::DropView {
            view: View::new("names", "SELECT name FROM users"),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"kind\":\"drop_view\""));
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
        assert_eq!(back.describe(), "Drop view 'names'");
    }
}
