//! Parsed changelog data model
//!
//! A [`ChangeLog`] is the ordered collection of [`ChangeSet`]s parsed from
//! a single file, plus the metadata needed to identify it and to resolve
//! rollback references. It is created empty by the parser, populated in
//! source order, and never mutated after the parse returns.

mod change;
mod change_set;
mod precondition;

pub use change::{RollbackChange, SqlChange};
pub use change_set::ChangeSet;
pub use precondition::{
    ErrorOption, FailOption, Precondition, PreconditionContainer, SqlCheckPrecondition,
    SqlOutputOption,
};

use serde::Serialize;
use strum_macros::{Display, EnumString, IntoStaticStr};

/// How the downstream migration engine quotes object names. The parser
/// never interprets this; it is inherited by every changeset from its
/// changelog.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString, IntoStaticStr,
)]
pub enum ObjectQuotingStrategy {
    #[default]
    #[strum(serialize = "LEGACY")]
    Legacy,
    #[strum(serialize = "QUOTE_ALL_OBJECTS")]
    QuoteAllObjects,
    #[strum(serialize = "QUOTE_ONLY_RESERVED_WORDS")]
    QuoteOnlyReservedWords,
}

/// An ordered collection of changesets parsed from one changelog file.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeLog {
    /// Path the file was opened under. Identity for this parse.
    pub physical_file_path: String,

    /// Logical path from the header or a `logicalFilePath:` directive.
    pub logical_file_path: Option<String>,

    pub object_quoting_strategy: ObjectQuotingStrategy,

    /// Changesets in source order.
    pub change_sets: Vec<ChangeSet>,

    /// Parent changelog supplied by the caller. Used only when a rollback
    /// references a changeset that is not defined in this file.
    #[serde(skip)]
    pub parent: Option<Box<ChangeLog>>,
}

impl ChangeLog {
    pub fn new(physical_file_path: impl Into<String>) -> Self {
        Self {
            physical_file_path: physical_file_path.into(),
            logical_file_path: None,
            object_quoting_strategy: ObjectQuotingStrategy::default(),
            change_sets: Vec::new(),
            parent: None,
        }
    }

    /// The path this changelog is known by: the logical path when one was
    /// declared, the physical path otherwise.
    pub fn file_path(&self) -> &str {
        self.logical_file_path
            .as_deref()
            .unwrap_or(&self.physical_file_path)
    }

    /// Look up a changeset by its (path, author, id) identity. The path is
    /// normalized before comparison and compared case-insensitively.
    pub fn get_change_set(&self, path: &str, author: &str, id: &str) -> Option<&ChangeSet> {
        let normalized = normalize_path(path);
        self.change_sets.iter().find(|cs| {
            cs.file_path.eq_ignore_ascii_case(&normalized) && cs.author == author && cs.id == id
        })
    }
}

/// Normalize a changelog path for storage and lookup: backslashes become
/// forward slashes and a leading `./` is dropped.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}
