//! Deterministic names for constraints and indices the model leaves unnamed.
//!
//! Each name is a fixed prefix plus a hex prefix of the SHA-256 digest of the
//! owning table and its sorted column list. The scheme is versioned by
//! [`NAMING_SCHEME_VERSION`]: once a name has been written to a database it
//! must come out of this module unchanged forever, otherwise every existing
//! auto-named constraint would look renamed to the differ.

use sha2::{Digest, Sha256};

use crate::dialect::Dialect;
use crate::schema::{Table, TableName};

/// Version of the naming scheme. Bump it together with the golden tests.
pub const NAMING_SCHEME_VERSION: u32 = 1;

/// Returns the first `len` hex digits of SHA-256 over `input`.
pub(crate) fn short_hash(input: &str, len: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest.iter() {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex.truncate(len);
    hex
}

fn sorted_key(table: &TableName, columns: &[String]) -> String {
    let mut sorted: Vec<&str> = columns.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    format!("{}_{}", table.name, sorted.join("_"))
}

/// `PK_` name for a primary key over `columns`.
#[must_use]
pub fn primary_key_name(table: &TableName, columns: &[String]) -> String {
    format!("PK_{}", short_hash(&sorted_key(table, columns), 27))
}

/// `FK_` name for a foreign key from `columns`.
#[must_use]
pub fn foreign_key_name(table: &TableName, columns: &[String]) -> String {
    format!("FK_{}", short_hash(&sorted_key(table, columns), 27))
}

/// `UQ_` name for a unique constraint over `columns`.
#[must_use]
pub fn unique_name(table: &TableName, columns: &[String]) -> String {
    format!("UQ_{}", short_hash(&sorted_key(table, columns), 27))
}

/// `IDX_` name for an index; a partial index also hashes its predicate.
#[must_use]
pub fn index_name(table: &TableName, columns: &[String], predicate: Option<&str>) -> String {
    let mut key = sorted_key(table, columns);
    if let Some(predicate) = predicate {
        key.push('_');
        key.push_str(predicate);
    }
    format!("IDX_{}", short_hash(&key, 26))
}

/// `CHK_` name for a check constraint.
#[must_use]
pub fn check_name(table: &TableName, expression: &str) -> String {
    format!("CHK_{}", short_hash(&format!("{}_{}", table.name, expression), 26))
}

/// `XCL_` name for an exclusion constraint.
#[must_use]
pub fn exclusion_name(table: &TableName, expression: &str) -> String {
    format!("XCL_{}", short_hash(&format!("{}_{}", table.name, expression), 26))
}

/// `DF_` name for a SQL Server default constraint.
#[must_use]
pub fn default_constraint_name(table: &TableName, column: &str) -> String {
    format!("DF_{}", short_hash(&format!("{}_{}", table.name, column), 27))
}

/// Name of the native enum type backing `column` on Postgres-family engines.
#[must_use]
pub fn enum_type_name(table: &TableName, column: &str) -> String {
    format!("{}_{}_enum", table.name, column)
}

/// Check constraint name guarding an enum column on engines without a
/// native enum type.
#[must_use]
pub fn enum_check_name(table: &TableName, column: &str) -> String {
    check_name(table, &format!("{}_enum", column))
}

/// Returns a copy of `table` in which every unnamed primary key, index and
/// constraint carries its generated name, every name fits the dialect's
/// identifier limit, and the `primary`/`unique` column flags are folded into
/// explicit constraints.
///
/// Expressions hashed into names are normalized first, so spelling variants
/// of the same predicate or check produce the same name.
#[must_use]
pub fn resolve_names(table: &Table, dialect: &Dialect) -> Table {
    let mut resolved = table.clone();
    let seed = table.name.name.as_str();
    let fit = |name: String| dialect.truncate_name(&name, seed);

    resolved.primary_key = table.effective_primary_key().map(|mut pk| {
        let name = pk
            .name
            .take()
            .unwrap_or_else(|| primary_key_name(&table.name, &pk.columns));
        pk.name = Some(fit(name));
        pk
    });
    resolved.uniques = table
        .effective_uniques()
        .into_iter()
        .map(|mut unique| {
            let name = unique
                .name
                .take()
                .unwrap_or_else(|| unique_name(&table.name, &unique.columns));
            unique.name = Some(fit(name));
            unique
        })
        .collect();
    for column in &mut resolved.columns {
        column.primary = false;
        column.unique = false;
    }

    for index in &mut resolved.indices {
        let name = index.name.take().unwrap_or_else(|| {
            let predicate = index
                .predicate
                .as_deref()
                .map(|p| dialect.normalize_expression(p));
            index_name(&table.name, &index.columns, predicate.as_deref())
        });
        index.name = Some(fit(name));
    }
    for fk in &mut resolved.foreign_keys {
        let name = fk
            .name
            .take()
            .unwrap_or_else(|| foreign_key_name(&table.name, &fk.columns));
        fk.name = Some(fit(name));
    }
    for check in &mut resolved.checks {
        let name = check.name.take().unwrap_or_else(|| {
            check_name(&table.name, &dialect.normalize_expression(&check.expression))
        });
        check.name = Some(fit(name));
    }
    for exclusion in &mut resolved.exclusions {
        let name = exclusion.name.take().unwrap_or_else(|| {
            exclusion_name(
                &table.name,
                &dialect.normalize_expression(&exclusion.expression),
            )
        });
        exclusion.name = Some(fit(name));
    }
    resolved
}
