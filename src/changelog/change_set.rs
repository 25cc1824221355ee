//! Changesets: the atomic unit of migration

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::changelog::{ObjectQuotingStrategy, PreconditionContainer, RollbackChange, SqlChange};

/// A single migration step, identified by (path, author, id).
///
/// The parser guarantees `id` and `author` are non-empty and that exactly
/// one primary change is attached. Boolean flags carry the documented
/// defaults when their attribute is absent from the changeset directive.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSet {
    pub id: String,
    pub author: String,

    /// Resolved path: the `logicalFilePath:` attribute when present, the
    /// changelog's logical path otherwise, the physical path as a last
    /// resort. Normalized at creation.
    pub file_path: String,

    /// Context expression, quotes stripped. Populated from
    /// `contextFilter:` or, when that is absent, the legacy `context:`.
    pub context_filter: Option<String>,

    pub labels: Option<String>,
    pub dbms: Option<String>,

    pub run_with: Option<String>,
    pub run_with_spool_file: Option<String>,

    pub run_always: bool,
    pub run_on_change: bool,
    pub run_in_transaction: bool,
    pub fail_on_error: bool,
    pub ignore: bool,

    pub comments: Option<String>,
    pub valid_checksums: BTreeSet<String>,

    pub preconditions: Option<PreconditionContainer>,

    /// The primary change. Its SQL is installed exactly once, when the
    /// changeset is finalised at the next changeset directive or EOF.
    pub change: SqlChange,

    pub rollback_changes: Vec<RollbackChange>,

    pub quoting_strategy: ObjectQuotingStrategy,
}

impl Default for ChangeSet {
    fn default() -> Self {
        Self {
            id: String::new(),
            author: String::new(),
            file_path: String::new(),
            context_filter: None,
            labels: None,
            dbms: None,
            run_with: None,
            run_with_spool_file: None,
            run_always: false,
            run_on_change: false,
            run_in_transaction: true,
            fail_on_error: true,
            ignore: false,
            comments: None,
            valid_checksums: BTreeSet::new(),
            preconditions: None,
            change: SqlChange::default(),
            rollback_changes: Vec::new(),
            quoting_strategy: ObjectQuotingStrategy::default(),
        }
    }
}

impl fmt::Display for ChangeSet {
    /// `path::id::author`, the identity format used in error messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.file_path, self.id, self.author)
    }
}
