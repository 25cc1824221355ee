//! Parse error type
//!
//! Every failure terminates the parse immediately; the partially built
//! changelog is discarded by the caller. Messages that reach users quote
//! the offending line number and the documentation link supplied by the
//! dialect, so they must keep their exact wording.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChangeLogParseError {
    #[error("Error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A line looks like a directive (one-dash or incomplete form) but is
    /// not one. The leading newline is part of the established message
    /// format.
    #[error(
        "\nUnexpected formatting at line {line}. Formatted {sequence_type} changelogs require known formats, such as '{example}' and others to be recognized and run. Learn all the options at {documentation_link}"
    )]
    UnexpectedFormatting {
        line: usize,
        sequence_type: String,
        example: String,
        documentation_link: String,
    },

    #[error(
        "\nUnexpected formatting at line {line}. Formatted {sequence_type} changelogs do not allow comment lines outside of changesets. Learn all the options at {documentation_link}"
    )]
    CommentOutsideChangeSet {
        line: usize,
        sequence_type: String,
        documentation_link: String,
    },

    /// A changeset reached its boundary (next changeset directive or EOF)
    /// with an empty body.
    #[error("No {sequence_type} for changeset {change_set}")]
    MissingChangeSequence {
        sequence_type: String,
        change_set: String,
    },

    #[error("Unknown ignoreLines syntax")]
    UnknownIgnoreLinesSyntax,

    #[error("Liquibase rollback comment is not closed.")]
    UnclosedMultiLineRollback,

    #[error("The '{name}' precondition type is not supported.")]
    UnsupportedPreconditionType { name: String },

    #[error("Could not parse a SqlCheck precondition from '{body}'.")]
    InvalidSqlCheckPrecondition { body: String },

    #[error(
        "Please modify the changelog to have preconditions set with either 'onUpdateSql' or 'onSqlOutput', not both."
    )]
    ConflictingSqlOutputOptions,

    #[error("Unknown {attribute} attribute value '{value}'. Possible values: {possible_values}")]
    InvalidPreconditionAttribute {
        attribute: &'static str,
        value: String,
        possible_values: String,
    },

    /// A rollback block contains a changeset reference but is missing
    /// `changesetId` or `changesetAuthor`.
    #[error("'{field}' not set in rollback block '{block}'")]
    IncompleteRollbackReference { field: &'static str, block: String },

    #[error("Change set {change_set} does not exist")]
    UnknownRollbackChangeSet { change_set: String },
}
