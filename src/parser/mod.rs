//! Parser state machine
//!
//! Drives the whole parse: reads classified lines, maintains the changeset
//! under construction together with its body and rollback buffers, handles
//! ignore regions and multi-line rollback blocks, and finalises each
//! changeset at its boundary (the next changeset directive or EOF).
//!
//! The machine has four states: before the first changeset, inside a
//! changeset, inside an `ignoreLines` region, and inside a multi-line
//! rollback block. Classification is context-free; what a directive means
//! in the current state is decided here. Directive-shaped lines that are
//! not valid in the current state are discarded, with two exceptions that
//! abort the parse: a `comment` directive outside any changeset, and the
//! alt-dash near-miss forms.

mod registry;
pub(crate) mod rollback;

pub use registry::{ChangeLogParser, ChangeLogParserRegistry, PRIORITY_DEFAULT};

use std::io::BufReader;

use regex::Regex;

use crate::changelog::{
    ChangeLog, ChangeSet, Precondition, PreconditionContainer, RollbackChange,
    SqlCheckPrecondition, normalize_path,
};
use crate::dialect::{Dialect, SqlDialect};
use crate::error::ChangeLogParseError;
use crate::grammar::{
    Directive, DirectiveGrammar, boolean_capture, first_capture, strip_enclosing_quotes,
    strip_quote_edges, trim_to_none,
};
use crate::params::{Parameter, ParameterExpander};
use crate::resource::ResourceAccessor;
use crate::scanner::LineScanner;

/// Parser position within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeFirstChangeSet,
    InChangeSet,
    /// Between `ignoreLines:start` and `ignoreLines:end`.
    IgnoreBlock { resume_in_change_set: bool },
    /// After a multi-line rollback open token, before its close token.
    MultiLineRollback,
}

/// Rollback attributes captured on a changeset directive. They apply when
/// that changeset's rollback buffer becomes a change, which happens only
/// at finalisation.
#[derive(Debug, Default)]
struct RollbackAttributes {
    split_statements: Option<bool>,
    end_delimiter: Option<String>,
}

/// The formatted changelog parser, generic over the host-language dialect.
pub struct FormattedChangeLogParser<D: Dialect> {
    dialect: D,
    grammar: DirectiveGrammar,
}

/// The SQL instantiation, the only dialect shipped with the crate.
pub type FormattedSqlChangeLogParser = FormattedChangeLogParser<SqlDialect>;

impl Default for FormattedSqlChangeLogParser {
    fn default() -> Self {
        Self::new(SqlDialect)
    }
}

impl<D: Dialect> FormattedChangeLogParser<D> {
    pub fn new(dialect: D) -> Self {
        let grammar = DirectiveGrammar::new(
            dialect.single_line_comment(),
            dialect.start_multi_line_comment(),
            dialect.end_multi_line_comment(),
        );
        Self { dialect, grammar }
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    pub fn grammar(&self) -> &DirectiveGrammar {
        &self.grammar
    }

    /// Whether this parser handles the given resource: the dialect's
    /// extension check must pass and the first non-blank line must carry
    /// the header sentinel. I/O failures mean "not supported".
    pub fn supports(&self, path: &str, accessor: &dyn ResourceAccessor) -> bool {
        if !self.dialect.supports_extension(path) {
            return false;
        }
        let Ok(stream) = accessor.open(path) else {
            return false;
        };
        let mut scanner = LineScanner::new(BufReader::new(stream));
        loop {
            match scanner.read_line() {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    return self.grammar.first_line.is_match(&line);
                }
                Ok(None) | Err(_) => return false,
            }
        }
    }

    /// Parse a changelog with no parent.
    pub fn parse(
        &self,
        physical_path: &str,
        parameters: &mut dyn ParameterExpander,
        accessor: &dyn ResourceAccessor,
    ) -> Result<ChangeLog, ChangeLogParseError> {
        self.parse_with_parent(physical_path, parameters, accessor, None)
    }

    /// Parse a changelog whose rollback references may resolve against a
    /// previously parsed parent chain.
    pub fn parse_with_parent(
        &self,
        physical_path: &str,
        parameters: &mut dyn ParameterExpander,
        accessor: &dyn ResourceAccessor,
        parent: Option<ChangeLog>,
    ) -> Result<ChangeLog, ChangeLogParseError> {
        let mut changelog = ChangeLog::new(physical_path);
        changelog.parent = parent.map(Box::new);

        let stream = accessor
            .open(physical_path)
            .map_err(|source| io_error(physical_path, source))?;
        let mut scanner = LineScanner::new(BufReader::new(stream));

        let mut state = State::BeforeFirstChangeSet;
        // Index of the changeset under construction. Changesets join the
        // changelog as soon as their directive is seen so that rollback
        // references can find earlier changesets of the same file.
        let mut current: Option<usize> = None;
        let mut body = String::new();
        let mut rollback_buffer = String::new();
        let mut rollback_attributes = RollbackAttributes::default();

        while let Some(line) = scanner
            .read_line()
            .map_err(|source| io_error(physical_path, source))?
        {
            let line_number = scanner.line_number();

            match state {
                State::MultiLineRollback => {
                    match self.grammar.multi_line_rollback_close(&line) {
                        Some(prefix) => {
                            rollback_buffer.push_str(&prefix);
                            state = State::InChangeSet;
                        }
                        // Lines inside the block accumulate verbatim,
                        // without separators.
                        None => rollback_buffer.push_str(&line),
                    }
                    continue;
                }
                State::IgnoreBlock {
                    resume_in_change_set,
                } => {
                    match self.grammar.classify(&line) {
                        Directive::IgnoreLines(value) if value == "end" => {
                            state = if resume_in_change_set {
                                State::InChangeSet
                            } else {
                                State::BeforeFirstChangeSet
                            };
                        }
                        Directive::AltIgnoreLines => {
                            return Err(self.formatting_error(line_number, "--ignoreLines:end"));
                        }
                        _ => {}
                    }
                    continue;
                }
                State::BeforeFirstChangeSet | State::InChangeSet => {}
            }

            match self.grammar.classify(&line) {
                Directive::Property => self.handle_property(&line, parameters, &changelog),
                Directive::AltProperty => {
                    return Err(self.formatting_error(
                        line_number,
                        "--property name=<property name> value=<property value>",
                    ));
                }
                Directive::Header => {
                    // The sentinel re-declares (or clears) the logical
                    // path wherever it appears. Inside a changeset the
                    // line is still body text.
                    changelog.logical_file_path =
                        first_capture(&self.grammar.logical_file_path, &line);
                    if current.is_some() {
                        body.push_str(&line);
                        body.push('\n');
                    }
                }
                Directive::IgnoreLines(value) => {
                    if value == "start" {
                        state = State::IgnoreBlock {
                            resume_in_change_set: current.is_some(),
                        };
                    } else {
                        let mut remaining: u64 = value
                            .parse()
                            .map_err(|_| ChangeLogParseError::UnknownIgnoreLinesSyntax)?;
                        while remaining > 0 {
                            let skipped = scanner
                                .read_line()
                                .map_err(|source| io_error(physical_path, source))?;
                            if skipped.is_none() {
                                break;
                            }
                            remaining -= 1;
                        }
                    }
                }
                Directive::AltIgnoreLines | Directive::AltIgnore => {
                    return Err(self.formatting_error(line_number, "--ignoreLines:<count|start>"));
                }
                Directive::ChangeSet { author, id } => {
                    if let Some(index) = current {
                        let attributes = std::mem::take(&mut rollback_attributes);
                        self.finalize_change_set(
                            &mut changelog,
                            index,
                            parameters,
                            &body,
                            &rollback_buffer,
                            attributes,
                            false,
                            physical_path,
                        )?;
                    }
                    rollback_attributes = self.start_change_set(
                        &line,
                        line_number,
                        &author,
                        &id,
                        &mut changelog,
                        parameters,
                    )?;
                    current = Some(changelog.change_sets.len() - 1);
                    state = State::InChangeSet;
                    body.clear();
                    rollback_buffer.clear();
                }
                Directive::AltChangeSet => {
                    return Err(
                        self.formatting_error(line_number, "--changeset <authorname>:<changesetId>")
                    );
                }
                Directive::Comment(text) => match current {
                    Some(index) => changelog.change_sets[index].comments = Some(text),
                    None => {
                        return Err(ChangeLogParseError::CommentOutsideChangeSet {
                            line: line_number,
                            sequence_type: self.dialect.sequence_type().to_string(),
                            documentation_link: self.dialect.documentation_link().to_string(),
                        });
                    }
                },
                Directive::AltComment => {
                    if current.is_some() {
                        return Err(self.formatting_error(line_number, "--comment <comment>"));
                    }
                }
                Directive::ValidCheckSum(checksum) => {
                    if let Some(index) = current {
                        changelog.change_sets[index].valid_checksums.insert(checksum);
                    }
                }
                Directive::AltValidCheckSum => {
                    if current.is_some() {
                        return Err(
                            self.formatting_error(line_number, "--validChecksum <checksum>")
                        );
                    }
                }
                Directive::Rollback(text) => {
                    if current.is_some() {
                        rollback_buffer.push_str(&text);
                        rollback_buffer.push('\n');
                    }
                }
                Directive::AltRollback => {
                    if current.is_some() {
                        let example =
                            format!("--rollback <rollback {}>", self.dialect.sequence_type());
                        return Err(self.formatting_error(line_number, &example));
                    }
                }
                Directive::RollbackMultiLineStart => {
                    if current.is_some() {
                        state = State::MultiLineRollback;
                    }
                }
                Directive::Preconditions(header) => {
                    if let Some(index) = current {
                        self.dialect.handle_preconditions(
                            &mut changelog.change_sets[index],
                            &self.grammar,
                            &header,
                        )?;
                    }
                }
                Directive::AltPreconditions => {
                    if current.is_some() {
                        return Err(self.formatting_error(
                            line_number,
                            "--preconditions <onFail>|<onError>|<onUpdate>",
                        ));
                    }
                }
                Directive::Precondition {
                    name,
                    body: condition_body,
                } => {
                    if let Some(index) = current {
                        self.handle_precondition(
                            &mut changelog,
                            index,
                            parameters,
                            &name,
                            &condition_body,
                        )?;
                    }
                }
                Directive::AltPrecondition => {
                    if current.is_some() {
                        return Err(self.formatting_error(line_number, "--precondition-sql-check"));
                    }
                }
                Directive::Body => {
                    if current.is_some() {
                        body.push_str(&line);
                        body.push('\n');
                    }
                    // Lines before the first changeset are discarded.
                }
            }
        }

        if state == State::MultiLineRollback {
            return Err(ChangeLogParseError::UnclosedMultiLineRollback);
        }

        if let Some(index) = current {
            self.finalize_change_set(
                &mut changelog,
                index,
                parameters,
                &body,
                &rollback_buffer,
                rollback_attributes,
                true,
                physical_path,
            )?;
        }

        Ok(changelog)
    }

    /// Begin a changeset from its directive line: confirm the strict
    /// author:id form, evaluate the attribute sub-directives, and attach
    /// the changeset (with its primary change) to the changelog.
    fn start_change_set(
        &self,
        line: &str,
        line_number: usize,
        author_group: &str,
        id_group: &str,
        changelog: &mut ChangeLog,
        parameters: &mut dyn ParameterExpander,
    ) -> Result<RollbackAttributes, ChangeLogParseError> {
        let g = &self.grammar;

        // The loose pattern tolerates whitespace after the colon; the
        // literal confirmation does not. Author and id must be joined.
        let confirmation = Regex::new(&format!(
            r"(?i)^\s*{}\s*changeset\s+{}.*$",
            g.single_line_comment,
            regex::escape(&format!("{author_group}:{id_group}"))
        ))
        .expect("valid directive pattern");
        if !confirmation.is_match(line) {
            return Err(
                self.formatting_error(line_number, "--changeset <authorname>:<changesetId>")
            );
        }

        let strip_comments = boolean_capture(&g.strip_comments, line);
        let split_statements = boolean_capture(&g.split_statements, line);
        let rollback_split_statements = boolean_capture(&g.rollback_split_statements, line);
        let run_on_change = boolean_capture(&g.run_on_change, line).unwrap_or(false);
        let run_always = boolean_capture(&g.run_always, line).unwrap_or(false);
        let run_in_transaction = boolean_capture(&g.run_in_transaction, line).unwrap_or(true);
        let fail_on_error = boolean_capture(&g.fail_on_error, line).unwrap_or(true);

        let run_with = first_capture(&g.run_with, line).map(|v| parameters.expand(&v, changelog));
        let run_with_spool_file =
            first_capture(&g.run_with_spool_file, line).map(|v| parameters.expand(&v, changelog));
        let end_delimiter = first_capture(&g.end_delimiter, line);
        let rollback_end_delimiter = first_capture(&g.rollback_end_delimiter, line);

        // contextFilter wins over the legacy context spelling.
        let context_filter = context_capture(&g.context_filter, line)
            .or_else(|| context_capture(&g.context, line))
            .map(|v| parameters.expand(&v, changelog));
        let labels = first_capture(&g.labels, line).map(|v| parameters.expand(&v, changelog));
        let dbms = first_capture(&g.dbms, line).map(|v| parameters.expand(&v, changelog));
        let ignore = first_capture(&g.ignore, line)
            .map(|v| parameters.expand(&v, changelog))
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let file_path = {
            let raw = first_capture(&g.logical_file_path, line)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| changelog.file_path().to_string());
            normalize_path(&parameters.expand(&raw, changelog))
        };

        let id = parameters.expand(strip_enclosing_quotes(id_group), changelog);
        let author = parameters.expand(strip_enclosing_quotes(author_group), changelog);

        let mut change = self.dialect.new_change();
        if let Some(split) = split_statements {
            change.split_statements = split;
        }
        change.strip_comments = strip_comments.unwrap_or(true);
        change.end_delimiter = end_delimiter;

        changelog.change_sets.push(ChangeSet {
            id,
            author,
            file_path,
            context_filter,
            labels,
            dbms,
            run_with,
            run_with_spool_file,
            run_always,
            run_on_change,
            run_in_transaction,
            fail_on_error,
            ignore,
            comments: None,
            valid_checksums: Default::default(),
            preconditions: None,
            change,
            rollback_changes: Vec::new(),
            quoting_strategy: changelog.object_quoting_strategy,
        });

        Ok(RollbackAttributes {
            split_statements: rollback_split_statements,
            end_delimiter: rollback_end_delimiter,
        })
    }

    /// Close a changeset at its boundary: install the expanded body into
    /// the primary change and turn the rollback buffer into rollback
    /// changes. The end-delimiter heuristic applies only at EOF.
    #[allow(clippy::too_many_arguments)]
    fn finalize_change_set(
        &self,
        changelog: &mut ChangeLog,
        index: usize,
        parameters: &mut dyn ParameterExpander,
        body: &str,
        rollback_buffer: &str,
        rollback_attributes: RollbackAttributes,
        at_eof: bool,
        physical_path: &str,
    ) -> Result<(), ChangeLogParseError> {
        let Some(trimmed) = trim_to_none(body) else {
            return Err(ChangeLogParseError::MissingChangeSequence {
                sequence_type: self.dialect.sequence_type().to_string(),
                change_set: changelog.change_sets[index].to_string(),
            });
        };
        let sequence = parameters.expand(trimmed, changelog);
        let change = &mut changelog.change_sets[index].change;
        self.dialect.set_change_sequence(change, sequence);
        if at_eof && self.dialect.is_end_delimiter(change) {
            change.end_delimiter = Some("\n/$".to_string());
        }

        if trim_to_none(rollback_buffer).is_none() {
            return Ok(());
        }
        let trimmed_rollback = rollback_buffer.trim().to_lowercase();
        if self.grammar.not_required.is_match(&trimmed_rollback) {
            changelog.change_sets[index]
                .rollback_changes
                .push(RollbackChange::Empty);
        } else if trimmed_rollback.contains("changesetid") {
            let resolved = rollback::resolve_rollback_reference(
                &self.grammar,
                physical_path,
                changelog,
                rollback_buffer,
            )?;
            changelog.change_sets[index]
                .rollback_changes
                .extend(resolved.into_iter().map(RollbackChange::Sql));
        } else {
            let mut change = self.dialect.new_change();
            let expanded = parameters.expand(rollback_buffer, changelog);
            self.dialect.set_change_sequence(&mut change, expanded);
            if let Some(split) = rollback_attributes.split_statements {
                change.split_statements = split;
            }
            if let Some(delimiter) = rollback_attributes.end_delimiter {
                change.end_delimiter = Some(delimiter);
            }
            changelog.change_sets[index]
                .rollback_changes
                .push(RollbackChange::Sql(change));
        }
        Ok(())
    }

    /// Register a `property` directive: tokenize the remainder into
    /// key:value pairs and hand the known keys to the expander.
    fn handle_property(
        &self,
        line: &str,
        parameters: &mut dyn ParameterExpander,
        changelog: &ChangeLog,
    ) {
        let Some(remainder) = first_capture(&self.grammar.property_remainder, line) else {
            return;
        };
        let mut name = None;
        let mut value = None;
        let mut context = None;
        let mut labels = None;
        let mut dbms = None;
        let mut global = true;
        for token in remainder.split_whitespace() {
            let Some((key, item)) = token.split_once(':') else {
                continue;
            };
            match key.to_ascii_lowercase().as_str() {
                "name" => name = Some(item.to_string()),
                "value" => value = Some(item.to_string()),
                "context" => context = Some(item.to_string()),
                "labels" => labels = Some(item.to_string()),
                "dbms" => dbms = Some(item.to_string()),
                "global" => global = item.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        if let (Some(name), Some(value)) = (name, value) {
            parameters.register(
                Parameter {
                    name,
                    value,
                    context,
                    labels,
                    dbms,
                    global,
                },
                changelog,
            );
        }
    }

    /// Add a nested precondition. Only `sql-check` exists in the directive
    /// syntax; its body is parameter-expanded before the quoting patterns
    /// run.
    fn handle_precondition(
        &self,
        changelog: &mut ChangeLog,
        index: usize,
        parameters: &dyn ParameterExpander,
        name: &str,
        body: &str,
    ) -> Result<(), ChangeLogParseError> {
        if changelog.change_sets[index].preconditions.is_none() {
            changelog.change_sets[index].preconditions = Some(PreconditionContainer::default());
        }
        if name != "sql-check" {
            return Err(ChangeLogParseError::UnsupportedPreconditionType {
                name: name.to_string(),
            });
        }
        let expanded = match trim_to_none(body) {
            Some(text) => parameters.expand(text, changelog),
            None => String::new(),
        };
        let condition = self.parse_sql_check(&expanded)?;
        changelog.change_sets[index]
            .preconditions
            .get_or_insert_with(PreconditionContainer::default)
            .conditions
            .push(Precondition::SqlCheck(condition));
        Ok(())
    }

    fn parse_sql_check(&self, body: &str) -> Result<SqlCheckPrecondition, ChangeLogParseError> {
        for pattern in &self.grammar.sql_check {
            if let Some(caps) = pattern.captures(body) {
                return Ok(SqlCheckPrecondition {
                    expected_result: caps[1].to_string(),
                    sql: caps[2].to_string(),
                });
            }
        }
        Err(ChangeLogParseError::InvalidSqlCheckPrecondition {
            body: body.to_string(),
        })
    }

    fn formatting_error(&self, line: usize, example: &str) -> ChangeLogParseError {
        ChangeLogParseError::UnexpectedFormatting {
            line,
            sequence_type: self.dialect.sequence_type().to_string(),
            example: example.to_string(),
            documentation_link: self.dialect.documentation_link().to_string(),
        }
    }
}

fn io_error(path: &str, source: std::io::Error) -> ChangeLogParseError {
    ChangeLogParseError::Io {
        path: path.to_string(),
        source,
    }
}

/// Context values tolerate surrounding double quotes; strip them and
/// discard blank results.
fn context_capture(pattern: &Regex, line: &str) -> Option<String> {
    first_capture(pattern, line)
        .and_then(|value| trim_to_none(strip_quote_edges(value.trim())).map(str::to_string))
}
