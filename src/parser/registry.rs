//! Parser dispatch
//!
//! Callers that handle heterogeneous changelog formats register parsers
//! here and let the registry pick one per file: the highest-priority
//! parser whose `supports` check passes.

use crate::changelog::ChangeLog;
use crate::dialect::Dialect;
use crate::error::ChangeLogParseError;
use crate::params::ParameterExpander;
use crate::parser::FormattedChangeLogParser;
use crate::resource::ResourceAccessor;

/// Baseline parser priority. Parsers compete on priority when more than
/// one supports a file.
pub const PRIORITY_DEFAULT: i32 = 1;

/// The contract a registrable changelog parser implements.
pub trait ChangeLogParser {
    fn supports(&self, path: &str, accessor: &dyn ResourceAccessor) -> bool;

    fn priority(&self) -> i32;

    fn parse(
        &self,
        path: &str,
        parameters: &mut dyn ParameterExpander,
        accessor: &dyn ResourceAccessor,
    ) -> Result<ChangeLog, ChangeLogParseError>;
}

impl<D: Dialect> ChangeLogParser for FormattedChangeLogParser<D> {
    fn supports(&self, path: &str, accessor: &dyn ResourceAccessor) -> bool {
        FormattedChangeLogParser::supports(self, path, accessor)
    }

    /// The formatted family outranks generic parsers for the same
    /// extension.
    fn priority(&self) -> i32 {
        PRIORITY_DEFAULT + 5
    }

    fn parse(
        &self,
        path: &str,
        parameters: &mut dyn ParameterExpander,
        accessor: &dyn ResourceAccessor,
    ) -> Result<ChangeLog, ChangeLogParseError> {
        FormattedChangeLogParser::parse(self, path, parameters, accessor)
    }
}

/// Ordered collection of parsers with highest-priority-wins selection.
#[derive(Default)]
pub struct ChangeLogParserRegistry {
    parsers: Vec<Box<dyn ChangeLogParser>>,
}

impl ChangeLogParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parser: Box<dyn ChangeLogParser>) {
        self.parsers.push(parser);
    }

    /// The highest-priority parser supporting the given resource, if any.
    pub fn find_parser(
        &self,
        path: &str,
        accessor: &dyn ResourceAccessor,
    ) -> Option<&dyn ChangeLogParser> {
        self.parsers
            .iter()
            .filter(|parser| parser.supports(path, accessor))
            .max_by_key(|parser| parser.priority())
            .map(|parser| parser.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FormattedSqlChangeLogParser;
    use crate::resource::MemoryResourceAccessor;

    #[test]
    fn test_formatted_parser_priority() {
        let parser = FormattedSqlChangeLogParser::default();
        assert_eq!(ChangeLogParser::priority(&parser), PRIORITY_DEFAULT + 5);
    }

    #[test]
    fn test_registry_selects_supporting_parser() {
        let mut accessor = MemoryResourceAccessor::new();
        accessor.add("changelog.sql", "--liquibase formatted sql\n");
        accessor.add("plain.sql", "SELECT 1;\n");

        let mut registry = ChangeLogParserRegistry::new();
        registry.register(Box::new(FormattedSqlChangeLogParser::default()));

        assert!(registry.find_parser("changelog.sql", &accessor).is_some());
        assert!(registry.find_parser("plain.sql", &accessor).is_none());
        assert!(registry.find_parser("missing.sql", &accessor).is_none());
    }
}
