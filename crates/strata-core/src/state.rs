//! Schema state reconstruction.
//!
//! [`SchemaState`] replays operations onto a model and yields the model the
//! database would have afterwards. It is how up/down symmetry and diff
//! idempotence are checked without a database, and how the expected schema
//! is rebuilt from a migration's operations.
//!
//! Tables are looked up by exact name, so replay an operation list against
//! the same naming the diff was computed with.

use crate::error::{Result, SchemaError};
use crate::operation::{Change, Operation};
use crate::schema::{Schema, Table, TableName};

/// A schema model that operations can be applied to.
#[derive(Debug, Clone, Default)]
pub struct SchemaState {
    schema: Schema,
}

impl SchemaState {
    /// Creates an empty schema state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing model.
    #[must_use]
    pub fn from_schema(schema: Schema) -> Self {
        Self { schema }
    }

    /// Returns the current schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Consumes and returns the schema.
    #[must_use]
    pub fn into_schema(self) -> Schema {
        self.schema
    }

    /// Applies the forward direction of every change, in order.
    pub fn apply_up(&mut self, changes: &[Change]) -> Result<()> {
        for change in changes {
            self.apply(&change.up)?;
        }
        Ok(())
    }

    /// Applies the backward direction of every change, last change first.
    pub fn apply_down(&mut self, changes: &[Change]) -> Result<()> {
        for change in changes.iter().rev() {
            self.apply(&change.down)?;
        }
        Ok(())
    }

    fn table_mut(&mut self, name: &TableName) -> Result<&mut Table> {
        self.schema
            .get_table_mut(name)
            .ok_or_else(|| SchemaError::InvalidState(format!("Table '{}' does not exist", name)))
    }

    fn column_position(table: &Table, name: &str) -> Result<usize> {
        table
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| {
                SchemaError::InvalidState(format!(
                    "Column '{}' does not exist in table '{}'",
                    name, table.name
                ))
            })
    }

    /// Removes the first item matching `matches`, or fails with `what`.
    fn remove<T>(
        items: &mut Vec<T>,
        matches: impl Fn(&T) -> bool,
        what: impl FnOnce() -> String,
    ) -> Result<()> {
        let idx = items
            .iter()
            .position(matches)
            .ok_or_else(|| SchemaError::InvalidState(what()))?;
        items.remove(idx);
        Ok(())
    }

    /// Applies a single operation to the schema state.
    pub fn apply(&mut self, operation: &Operation) -> Result<()> {
        match operation {
            Operation::CreateTable { table } => {
                if self.schema.get_table(&table.name).is_some() {
                    return Err(SchemaError::InvalidState(format!(
                        "Table '{}' already exists",
                        table.name
                    )));
                }
                self.schema.tables.push(table.clone());
            }

            Operation::DropTable { table } => {
                Self::remove(
                    &mut self.schema.tables,
                    |t| t.name == table.name,
                    || format!("Table '{}' does not exist", table.name),
                )?;
            }

            Operation::RecreateTable { from, to } => {
                let existing = self.table_mut(&from.name)?;
                *existing = to.clone();
            }

            Operation::AddColumn { table, column } => {
                let t = self.table_mut(table)?;
                if t.get_column(&column.name).is_some() {
                    return Err(SchemaError::InvalidState(format!(
                        "Column '{}' already exists in table '{}'",
                        column.name, table
                    )));
                }
                t.columns.push(column.clone());
            }

            Operation::DropColumn { table, column } => {
                let t = self.table_mut(table)?;
                let idx = Self::column_position(t, &column.name)?;
                t.columns.remove(idx);
            }

            Operation::AlterColumn { table, from, to } => {
                let t = self.table_mut(table)?;
                let idx = Self::column_position(t, &from.name)?;
                t.columns[idx] = to.clone();
            }

            Operation::AddPrimaryKey { table, primary_key } => {
                let t = self.table_mut(table)?;
                if t.primary_key.is_some() {
                    return Err(SchemaError::InvalidState(format!(
                        "Table '{}' already has a primary key",
                        table
                    )));
                }
                t.primary_key = Some(primary_key.clone());
            }

            Operation::DropPrimaryKey { table, .. } => {
                let t = self.table_mut(table)?;
                if t.primary_key.take().is_none() {
                    return Err(SchemaError::InvalidState(format!(
                        "Table '{}' has no primary key",
                        table
                    )));
                }
            }

            Operation::RenamePrimaryKey { table, from, to, .. } => {
                let t = self.table_mut(table)?;
                match &mut t.primary_key {
                    Some(pk) if pk.name.as_deref() == Some(from.as_str()) => {
                        pk.name = Some(to.clone());
                    }
                    _ => {
                        return Err(SchemaError::InvalidState(format!(
                            "Primary key '{}' does not exist on table '{}'",
                            from, table
                        )));
                    }
                }
            }

            Operation::CreateIndex { table, index } => {
                self.table_mut(table)?.indices.push(index.clone());
            }

            Operation::DropIndex { table, index } => {
                let t = self.table_mut(table)?;
                Self::remove(
                    &mut t.indices,
                    |i| i == index,
                    || format!("Index {:?} does not exist on table '{}'", index.name, table),
                )?;
            }

            Operation::AddUnique { table, unique } => {
                self.table_mut(table)?.uniques.push(unique.clone());
            }

            Operation::DropUnique { table, unique } => {
                let t = self.table_mut(table)?;
                Self::remove(
                    &mut t.uniques,
                    |u| u == unique,
                    || format!("Unique {:?} does not exist on table '{}'", unique.name, table),
                )?;
            }

            Operation::AddCheck { table, check } => {
                self.table_mut(table)?.checks.push(check.clone());
            }

            Operation::DropCheck { table, check } => {
                let t = self.table_mut(table)?;
                Self::remove(
                    &mut t.checks,
                    |c| c == check,
                    || format!("Check {:?} does not exist on table '{}'", check.name, table),
                )?;
            }

            Operation::AddExclusion { table, exclusion } => {
                self.table_mut(table)?.exclusions.push(exclusion.clone());
            }

            Operation::DropExclusion { table, exclusion } => {
                let t = self.table_mut(table)?;
                Self::remove(
                    &mut t.exclusions,
                    |x| x == exclusion,
                    || {
                        format!(
                            "Exclusion {:?} does not exist on table '{}'",
                            exclusion.name, table
                        )
                    },
                )?;
            }

            Operation::AddForeignKey { table, foreign_key } => {
                self.table_mut(table)?.foreign_keys.push(foreign_key.clone());
            }

            Operation::DropForeignKey { table, foreign_key } => {
                let t = self.table_mut(table)?;
                Self::remove(
                    &mut t.foreign_keys,
                    |fk| fk == foreign_key,
                    || {
                        format!(
                            "Foreign key {:?} does not exist on table '{}'",
                            foreign_key.name, table
                        )
                    },
                )?;
            }

            Operation::CreateView { view } => {
                if self.schema.views.iter().any(|v| v.name == view.name) {
                    return Err(SchemaError::InvalidState(format!(
                        "View '{}' already exists",
                        view.name
                    )));
                }
                self.schema.views.push(view.clone());
            }

            Operation::DropView { view } => {
                Self::remove(
                    &mut self.schema.views,
                    |v| v.name == view.name,
                    || format!("View '{}' does not exist", view.name),
                )?;
            }

            Operation::SetTableComment { table, to, .. } => {
                self.table_mut(table)?.comment = to.clone();
            }
        }
        Ok(())
    }
}
