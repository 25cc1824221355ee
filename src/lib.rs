//! formatted-changelog: parser for schema changelogs written as comments
//! in a host language's native source
//!
//! A formatted changelog is an ordinary SQL script whose migration
//! structure is encoded in specially formed comments: a header sentinel,
//! `--changeset author:id` boundaries, rollback blocks, preconditions and
//! parameter declarations. This crate reads such a file through a
//! [`resource::ResourceAccessor`] and produces an in-memory
//! [`changelog::ChangeLog`] tree for a downstream migration engine.
//!
//! The parser is single-threaded and synchronous; it holds no state
//! across invocations. Callers parallelise over independent files.

pub mod changelog;
pub mod dialect;
pub mod error;
pub mod grammar;
pub mod params;
pub mod parser;
pub mod resource;
pub mod scanner;

// Re-export commonly used types
pub use changelog::{ChangeLog, ChangeSet, RollbackChange, SqlChange};
pub use error::ChangeLogParseError;
pub use params::{Parameter, ParameterExpander, ParameterRegistry};
pub use parser::{
    ChangeLogParser, ChangeLogParserRegistry, FormattedChangeLogParser,
    FormattedSqlChangeLogParser, PRIORITY_DEFAULT,
};
pub use resource::{FileSystemResourceAccessor, MemoryResourceAccessor, ResourceAccessor};
