//! Dialect adapters
//!
//! A dialect supplies everything about the host language the parser must
//! not hard-code: the comment tokens directives hide in, the extension
//! check used for dispatch, the change constructor, and the handful of
//! hooks whose behaviour differs per host language. The parser owns the
//! control flow; the dialect is a capability record it consults.

mod sql;

pub use sql::SqlDialect;

use crate::changelog::{ChangeSet, SqlChange};
use crate::error::ChangeLogParseError;
use crate::grammar::DirectiveGrammar;

pub trait Dialect {
    /// Single-line comment token, e.g. `--` for SQL. Directives live on
    /// lines starting with it.
    fn single_line_comment(&self) -> &str;

    /// Multi-line comment open token, e.g. `/*`. Required: without it a
    /// dialect cannot support multi-line rollback blocks.
    fn start_multi_line_comment(&self) -> &str;

    /// Multi-line comment close token, e.g. `*/`.
    fn end_multi_line_comment(&self) -> &str;

    /// Whether this dialect handles files with the given name.
    fn supports_extension(&self, path: &str) -> bool;

    /// Label for the change sequence in error messages, e.g. `sql`.
    fn sequence_type(&self) -> &str;

    /// Reference documentation linked from formatting errors.
    fn documentation_link(&self) -> &str;

    /// Fresh change value for a primary or rollback change.
    fn new_change(&self) -> SqlChange;

    /// Install assembled sequence text into a change.
    fn set_change_sequence(&self, change: &mut SqlChange, sequence: String);

    /// Whether the EOF end-delimiter heuristic applies to the assembled
    /// change.
    fn is_end_delimiter(&self, change: &SqlChange) -> bool;

    /// Handle the body of a `preconditions` directive. Dialects differ in
    /// which header attributes they accept.
    fn handle_preconditions(
        &self,
        change_set: &mut ChangeSet,
        grammar: &DirectiveGrammar,
        body: &str,
    ) -> Result<(), ChangeLogParseError>;
}
