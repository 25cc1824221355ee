//! The unit of work carried by a changeset

use serde::Serialize;

/// A raw SQL change: the statement text plus the execution policy flags
/// the directive grammar can set on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlChange {
    pub sql: String,

    /// Split the text into individual statements on the end delimiter.
    pub split_statements: bool,

    /// Strip comments from the text before execution.
    pub strip_comments: bool,

    /// Statement separator override. `None` means the engine default.
    pub end_delimiter: Option<String>,
}

impl Default for SqlChange {
    fn default() -> Self {
        Self {
            sql: String::new(),
            split_statements: true,
            strip_comments: true,
            end_delimiter: None,
        }
    }
}

/// One entry in a changeset's rollback list.
///
/// `Empty` records that a rollback was declared "not required"; the
/// migration engine treats it as a successful no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RollbackChange {
    Empty,
    Sql(SqlChange),
}
