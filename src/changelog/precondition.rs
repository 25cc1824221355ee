//! Preconditions: predicates evaluated before a changeset is applied

use serde::Serialize;
use strum_macros::{Display, EnumString, IntoStaticStr, VariantNames};

/// What the engine does when a precondition fails.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString, IntoStaticStr, VariantNames,
)]
pub enum FailOption {
    #[strum(serialize = "HALT")]
    Halt,
    #[strum(serialize = "CONTINUE")]
    Continue,
    #[strum(serialize = "MARK_RAN")]
    MarkRan,
    #[strum(serialize = "WARN")]
    Warn,
}

/// What the engine does when evaluating a precondition raises an error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString, IntoStaticStr, VariantNames,
)]
pub enum ErrorOption {
    #[strum(serialize = "HALT")]
    Halt,
    #[strum(serialize = "CONTINUE")]
    Continue,
    #[strum(serialize = "MARK_RAN")]
    MarkRan,
    #[strum(serialize = "WARN")]
    Warn,
}

/// How preconditions behave when the engine only generates SQL instead of
/// executing it. Set from either `onSqlOutput:` or the legacy
/// `onUpdateSql:`; the two spellings are mutually exclusive on a
/// directive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString, IntoStaticStr, VariantNames,
)]
pub enum SqlOutputOption {
    #[strum(serialize = "IGNORE")]
    Ignore,
    #[strum(serialize = "TEST")]
    Test,
    #[strum(serialize = "FAIL")]
    Fail,
}

/// Container for a changeset's preconditions: the failure policy header
/// plus the nested conditions in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreconditionContainer {
    pub on_fail: Option<FailOption>,
    pub on_error: Option<ErrorOption>,
    pub on_sql_output: Option<SqlOutputOption>,
    pub conditions: Vec<Precondition>,
}

/// A nested precondition. Only `sql-check` is expressible in the comment
/// directive syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Precondition {
    SqlCheck(SqlCheckPrecondition),
}

/// `precondition-sql-check`: run `sql` and compare the single-value
/// result against `expected_result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlCheckPrecondition {
    pub expected_result: String,
    pub sql: String,
}
