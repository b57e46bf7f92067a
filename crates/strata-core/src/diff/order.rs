//! Table dependency ordering.

use std::collections::{BTreeMap, BTreeSet};

use crate::schema::{Table, TableName};

/// Orders `tables` so that every table comes after the tables its foreign
/// keys reference.
///
/// Kahn's algorithm; among tables that are ready at the same time the
/// smaller name goes first. Tables caught in a reference cycle cannot be
/// ordered and are appended by name.
pub(crate) fn dependency_order(tables: &[&Table]) -> Vec<TableName> {
    let names: BTreeSet<&TableName> = tables.iter().map(|t| &t.name).collect();

    let mut depends_on: BTreeMap<&TableName, BTreeSet<&TableName>> = BTreeMap::new();
    let mut dependents: BTreeMap<&TableName, BTreeSet<&TableName>> = BTreeMap::new();
    for table in tables {
        let entry = depends_on.entry(&table.name).or_default();
        for fk in &table.foreign_keys {
            let target = &fk.referenced_table;
            if target == &table.name {
                continue;
            }
            if let Some(known) = names.get(target) {
                entry.insert(*known);
                dependents.entry(*known).or_default().insert(&table.name);
            }
        }
    }

    let mut remaining: BTreeMap<&TableName, usize> = depends_on
        .iter()
        .map(|(name, deps)| (*name, deps.len()))
        .collect();
    let mut ready: BTreeSet<&TableName> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();

    let mut order = Vec::with_capacity(tables.len());
    while let Some(next) = ready.pop_first() {
        remaining.remove(next);
        order.push(next.clone());
        if let Some(children) = dependents.get(next) {
            for child in children {
                if let Some(count) = remaining.get_mut(child) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*child);
                    }
                }
            }
        }
    }

    order.extend(remaining.into_keys().cloned());
    order
}

/// Position of every table in `order`.
pub(crate) fn ranks(order: &[TableName]) -> BTreeMap<TableName, usize> {
    order
        .iter()
        .enumerate()
        .map(|(rank, name)| (name.clone(), rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ForeignKey};

    fn table(name: &str, references: &[&str]) -> Table {
        let mut table = Table::new(name).column(Column::new("id", "int"));
        for target in references {
            table = table.foreign_key(ForeignKey::new(["id"], *target, ["id"]));
        }
        table
    }

    fn names(order: &[TableName]) -> Vec<&str> {
        order.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn referenced_tables_come_first() {
        let post = table("post", &["user", "account"]);
        let account = table("account", &["user"]);
        let user = table("user", &[]);
        let order = dependency_order(&[&post, &account, &user]);
        assert_eq!(names(&order), vec!["user", "account", "post"]);
    }

    #[test]
    fn ties_break_by_name() {
        let b = table("b", &[]);
        let a = table("a", &[]);
        let c = table("c", &["a"]);
        let order = dependency_order(&[&c, &b, &a]);
        assert_eq!(names(&order), vec!["a", "b", "c"]);
    }

    #[test]
    fn cycles_are_appended_by_name() {
        let x = table("x", &["y"]);
        let y = table("y", &["x"]);
        let free = table("free", &[]);
        let self_ref = table("node", &["node"]);
        let order = dependency_order(&[&y, &x, &free, &self_ref]);
        assert_eq!(names(&order), vec!["free", "node", "x", "y"]);
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let post = table("post", &["elsewhere"]);
        assert_eq!(names(&dependency_order(&[&post])), vec!["post"]);
    }
}
