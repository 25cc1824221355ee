//! Rollback resolution by changeset reference
//!
//! A rollback buffer mentioning `changesetId` names another changeset
//! instead of carrying SQL. Resolution parses the reference, looks the
//! changeset up in the current changelog, then walks the parent chain
//! upward, and copies the resolved changeset's change into the referring
//! changeset's rollback list.

use crate::changelog::{ChangeLog, SqlChange, normalize_path};
use crate::error::ChangeLogParseError;
use crate::grammar::{DirectiveGrammar, first_capture, trim_to_none};

/// Resolve a `changesetId:`/`changesetAuthor:`/`changesetPath:` reference
/// from a rollback buffer. The path defaults to the physical location of
/// the file being parsed.
pub(crate) fn resolve_rollback_reference(
    grammar: &DirectiveGrammar,
    physical_path: &str,
    changelog: &ChangeLog,
    rollback_buffer: &str,
) -> Result<Vec<SqlChange>, ChangeLogParseError> {
    // References may span multiple rollback lines; collapse line breaks
    // before matching.
    let block = rollback_buffer.replace('\n', "").replace('\r', "");

    let id = reference_field(&grammar.rollback_change_set_id, &block);
    let author = reference_field(&grammar.rollback_change_set_author, &block);
    let path = reference_field(&grammar.rollback_change_set_path, &block);

    let Some(id) = id else {
        return Err(ChangeLogParseError::IncompleteRollbackReference {
            field: "changesetId",
            block,
        });
    };
    let Some(author) = author else {
        return Err(ChangeLogParseError::IncompleteRollbackReference {
            field: "changesetAuthor",
            block,
        });
    };
    let path = path.unwrap_or_else(|| physical_path.to_string());

    let mut scope = Some(changelog);
    while let Some(log) = scope {
        if let Some(resolved) = log.get_change_set(&path, &author, &id) {
            return Ok(vec![resolved.change.clone()]);
        }
        scope = log.parent.as_deref();
    }

    Err(ChangeLogParseError::UnknownRollbackChangeSet {
        change_set: format!("{}::{}::{}", normalize_path(&path), id, author),
    })
}

fn reference_field(pattern: &regex::Regex, block: &str) -> Option<String> {
    first_capture(pattern, block).and_then(|v| trim_to_none(&v).map(str::to_string))
}
