//! Rendered SQL statements.

use serde::{Deserialize, Serialize};

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// 64-bit integer.
    Integer(i64),
    /// Text.
    Text(String),
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One SQL statement plus its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Statement text.
    pub sql: String,
    /// Values for the statement's placeholders, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<QueryValue>,
}

impl Query {
    /// Creates a statement without parameters.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    /// Appends a bound parameter.
    #[must_use]
    pub fn bind(mut self, value: impl Into<QueryValue>) -> Self {
        self.parameters.push(value.into());
        self
    }
}

impl From<String> for Query {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}

impl From<&str> for Query {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

/// Forward and backward statements for a single operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedSql {
    /// Statements that apply the operation.
    pub up: Vec<Query>,
    /// Statements that undo it.
    pub down: Vec<Query>,
}

/// Forward and backward statements for a whole diff.
///
/// `down_queries` is already in execution order: the inverse of the last
/// change comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlInMemory {
    /// Statements that move the database to the desired model.
    pub up_queries: Vec<Query>,
    /// Statements that move it back.
    pub down_queries: Vec<Query>,
}

impl SqlInMemory {
    /// Returns `true` when there is nothing to execute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.up_queries.is_empty() && self.down_queries.is_empty()
    }

    /// Joins the forward statements into a script, one per line.
    #[must_use]
    pub fn up_script(&self) -> String {
        script(&self.up_queries)
    }

    /// Joins the backward statements into a script, one per line.
    #[must_use]
    pub fn down_script(&self) -> String {
        script(&self.down_queries)
    }
}

fn script(queries: &[Query]) -> String {
    queries
        .iter()
        .map(|q| format!("{};", q.sql))
        .collect::<Vec<_>>()
        .join("\n")
}
