//! Directive grammar
//!
//! The closed set of recognised directives, compiled into a fixed table of
//! case-insensitive, whole-line patterns. Comment tokens vary by dialect,
//! so the table is built from the dialect's tokens rather than shared
//! statically; everything else about a pattern is fixed.
//!
//! Alongside each real directive the table carries an "alt" family of
//! near-miss patterns (single dash instead of the comment token, plural or
//! incomplete spellings). Those exist only to raise a precise formatting
//! error at the offending line; they never recognise anything.
//!
//! Classification order matters and mirrors the precedence the directives
//! were defined with: `property`, header, `ignoreLines`, `changeset`, then
//! the changeset-scoped directives, then body. [`DirectiveGrammar::classify`]
//! is context-free; the parser decides what a classification means in its
//! current state.

use regex::Regex;

/// A classified line. Variants carry the captured payload the parser
/// needs; `Body` is everything the grammar does not recognise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// The `liquibase formatted` sentinel. May carry `logicalFilePath:`.
    Header,
    Property,
    AltProperty,
    /// `ignoreLines:<value>` with the raw value (`start`, `end` or a count).
    IgnoreLines(String),
    AltIgnoreLines,
    AltIgnore,
    /// A changeset directive with its raw author and id groups, enclosing
    /// quotes still attached.
    ChangeSet { author: String, id: String },
    AltChangeSet,
    Comment(String),
    AltComment,
    ValidCheckSum(String),
    AltValidCheckSum,
    Rollback(String),
    AltRollback,
    RollbackMultiLineStart,
    Preconditions(String),
    AltPreconditions,
    Precondition { name: String, body: String },
    AltPrecondition,
    Body,
}

/// Compiled pattern table for one dialect's comment tokens.
pub struct DirectiveGrammar {
    pub first_line: Regex,
    pub property: Regex,
    /// Everything after the `property` keyword, for key:value tokenizing.
    pub property_remainder: Regex,
    pub alt_property_one_dash: Regex,

    pub change_set: Regex,
    pub alt_change_set_one_dash: Regex,
    pub alt_change_set_no_other_info: Regex,

    pub rollback: Regex,
    pub alt_rollback_one_dash: Regex,
    pub rollback_multi_line_start: Regex,
    pub rollback_multi_line_end: Regex,

    pub preconditions: Regex,
    pub alt_preconditions_one_dash: Regex,
    pub precondition: Regex,
    pub alt_precondition_one_dash: Regex,

    pub comment: Regex,
    pub alt_comment_plural: Regex,
    pub alt_comment_one_dash: Regex,

    pub valid_check_sum: Regex,
    pub alt_valid_check_sum_one_dash: Regex,

    pub ignore_lines: Regex,
    pub alt_ignore_lines_one_dash: Regex,
    pub alt_ignore: Regex,

    // Attribute sub-directives, matched against the whole changeset line.
    pub strip_comments: Regex,
    pub split_statements: Regex,
    pub rollback_split_statements: Regex,
    pub end_delimiter: Regex,
    pub rollback_end_delimiter: Regex,
    pub run_with: Regex,
    pub run_with_spool_file: Regex,
    pub run_on_change: Regex,
    pub run_always: Regex,
    pub run_in_transaction: Regex,
    pub fail_on_error: Regex,
    pub context: Regex,
    pub context_filter: Regex,
    pub labels: Regex,
    pub logical_file_path: Regex,
    pub dbms: Regex,
    pub ignore: Regex,

    // Precondition header attributes.
    pub on_fail: Regex,
    pub on_error: Regex,
    pub on_update_sql: Regex,
    pub on_sql_output: Regex,

    // Rollback changeset references.
    pub rollback_change_set_id: Regex,
    pub rollback_change_set_author: Regex,
    pub rollback_change_set_path: Regex,

    /// "not required" rollback marker, matched against the trimmed
    /// lower-cased buffer.
    pub not_required: Regex,

    /// sql-check body shapes: bare word, single-quoted, double-quoted
    /// expected result. Tried in that order.
    pub sql_check: [Regex; 3],

    /// Escaped single-line comment token, for patterns built per line
    /// (the strict author:id confirmation).
    pub single_line_comment: String,

    /// Locates the multi-line close token at end of line, to split it off
    /// the captured rollback text.
    multi_line_end_split: Regex,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid directive pattern")
}

impl DirectiveGrammar {
    /// Build the table for a dialect's comment tokens. Tokens are taken
    /// literally and escaped here.
    pub fn new(
        single_line_comment: &str,
        start_multi_line_comment: &str,
        end_multi_line_comment: &str,
    ) -> Self {
        let c = regex::escape(single_line_comment);
        let ml_start = regex::escape(start_multi_line_comment);
        let ml_end = regex::escape(end_multi_line_comment);

        Self {
            first_line: compile(&format!(r"(?i)^{c}\s*liquibase formatted.*$")),

            property: compile(&format!(r"(?i)^\s*{c}\s*property\s+(.*:.*)\s+(.*:.*).*$")),
            property_remainder: compile(&format!(r"(?i)^\s*{c}\s*property\s+(.*)$")),
            alt_property_one_dash: compile(r"(?i)^\s*?-+\s*property\s.*$"),

            change_set: compile(&format!(
                r#"(?i)^\s*{c}\s*changeset\s+("[^"]+"|[^:]+):\s*("[^"]+"|\S+).*$"#
            )),
            alt_change_set_one_dash: compile(r"(?i)^-\s*changeset\s.*$"),
            alt_change_set_no_other_info: compile(&format!(r"(?i)^\s*{c}\s*changeset\s*.*$")),

            rollback: compile(&format!(r"(?i)^\s*{c}\s*rollback (.*)$")),
            alt_rollback_one_dash: compile(r"(?i)^\s*-\s*rollback\s.*$"),
            rollback_multi_line_start: compile(&format!(
                r"(?i)^\s*{ml_start}\s*liquibase\s*rollback\s*$"
            )),
            rollback_multi_line_end: compile(&format!(r"(?i)^.*\s*{ml_end}\s*$")),

            preconditions: compile(&format!(r"(?i)^\s*{c}\s*preconditions(.*)$")),
            alt_preconditions_one_dash: compile(r"(?i)^\s*-\s*preconditions\s.*$"),
            precondition: compile(&format!(r"(?i)^\s*{c}\s*precondition-([a-zA-Z0-9-]+) (.*)$")),
            alt_precondition_one_dash: compile(r"(?i)^\s*-\s*precondition(.*)$"),

            comment: compile(&format!(r"(?i)^{c}\s*comment:? (.*)$")),
            alt_comment_plural: compile(&format!(r"(?i)^{c}\s*comments:? (.*)$")),
            alt_comment_one_dash: compile(r"(?i)^-\s*comment:? (.*)$"),

            valid_check_sum: compile(&format!(r"(?i)^{c}\s*validCheckSum:? (.*)$")),
            alt_valid_check_sum_one_dash: compile(r"(?i)^-\s*validCheckSum(.*)$"),

            ignore_lines: compile(&format!(r"(?i)^{c}\s*ignoreLines:(\w+)$")),
            alt_ignore_lines_one_dash: compile(r"(?i)^-\s*?ignoreLines:(\w+).*$"),
            alt_ignore: compile(&format!(r"(?i)^{c}\s*ignore:(\w+)$")),

            strip_comments: compile(r"(?i)^.*stripComments:(\w+).*$"),
            split_statements: compile(r"(?i)^.*splitStatements:(\w+).*$"),
            rollback_split_statements: compile(r"(?i)^.*rollbackSplitStatements:(\w+).*$"),
            end_delimiter: compile(r"(?i)^.*endDelimiter:(\S*).*$"),
            rollback_end_delimiter: compile(r"(?i)^.*rollbackEndDelimiter:(\S*).*$"),
            run_with: compile(r"(?i)^.*runWith:([\w$\{\}]+).*$"),
            run_with_spool_file: compile(r"(?i)^.*runWithSpoolFile:(.*).*$"),
            run_on_change: compile(r"(?i)^.*runOnChange:(\w+).*$"),
            run_always: compile(r"(?i)^.*runAlways:(\w+).*$"),
            run_in_transaction: compile(r"(?i)^.*runInTransaction:(\w+).*$"),
            fail_on_error: compile(r"(?i)^.*failOnError:(\w+).*$"),
            context: compile(r#"(?i)^.*context:(".*"|\S*).*$"#),
            context_filter: compile(r#"(?i)^.*contextFilter:(".*"|\S*).*$"#),
            labels: compile(r"(?i)^.*labels:(\S*).*$"),
            logical_file_path: compile(r"(?i)^.*logicalFilePath:(\S*).*$"),
            dbms: compile(r"(?i)^.*dbms:([^,][\w!,]+).*$"),
            ignore: compile(r"(?i)^.*ignore:(\w*).*$"),

            on_fail: compile(r"(?i)^.*onFail:(\w+).*$"),
            on_error: compile(r"(?i)^.*onError:(\w+).*$"),
            on_update_sql: compile(r"(?i)^.*onUpdateSQL:(\w+).*$"),
            on_sql_output: compile(r"(?i)^.*onSqlOutput:(\w+).*$"),

            rollback_change_set_id: compile(r"(?i)^.*changeSetId:(\S+).*$"),
            rollback_change_set_author: compile(r"(?i)^.*changesetAuthor:(\S+).*$"),
            rollback_change_set_path: compile(r"(?i)^.*changesetPath:(\S+).*$"),

            not_required: compile(r"(?i)^not required.*$"),

            sql_check: [
                compile(r"(?i)^(?:expectedResult:)?(\w+) (.*)$"),
                compile(r"(?i)^(?:expectedResult:)?'([^']+)' (.*)$"),
                compile(r#"(?i)^(?:expectedResult:)?"([^"]+)" (.*)$"#),
            ],

            single_line_comment: c,
            multi_line_end_split: compile(&format!(r"(?i){ml_end}\s*$")),
        }
    }

    /// Classify one line. Ordering encodes directive precedence; the first
    /// matching pattern wins and everything else is `Body`.
    pub fn classify(&self, line: &str) -> Directive {
        if self.property.is_match(line) {
            return Directive::Property;
        }
        if self.alt_property_one_dash.is_match(line) {
            return Directive::AltProperty;
        }
        if self.first_line.is_match(line) {
            return Directive::Header;
        }
        if let Some(value) = first_capture(&self.ignore_lines, line) {
            return Directive::IgnoreLines(value);
        }
        if self.alt_ignore_lines_one_dash.is_match(line) {
            return Directive::AltIgnoreLines;
        }
        if self.alt_ignore.is_match(line) {
            return Directive::AltIgnore;
        }
        if let Some(caps) = self.change_set.captures(line) {
            return Directive::ChangeSet {
                author: caps[1].to_string(),
                id: caps[2].to_string(),
            };
        }
        if self.alt_change_set_one_dash.is_match(line)
            || self.alt_change_set_no_other_info.is_match(line)
        {
            return Directive::AltChangeSet;
        }
        if let Some(text) = first_capture(&self.comment, line) {
            return Directive::Comment(text);
        }
        if self.alt_comment_one_dash.is_match(line) || self.alt_comment_plural.is_match(line) {
            return Directive::AltComment;
        }
        if let Some(checksum) = first_capture(&self.valid_check_sum, line) {
            return Directive::ValidCheckSum(checksum);
        }
        if self.alt_valid_check_sum_one_dash.is_match(line) {
            return Directive::AltValidCheckSum;
        }
        if let Some(text) = first_capture(&self.rollback, line) {
            return Directive::Rollback(text);
        }
        if self.alt_rollback_one_dash.is_match(line) {
            return Directive::AltRollback;
        }
        if self.rollback_multi_line_start.is_match(line) {
            return Directive::RollbackMultiLineStart;
        }
        if let Some(body) = first_capture(&self.preconditions, line) {
            return Directive::Preconditions(body);
        }
        if self.alt_preconditions_one_dash.is_match(line) {
            return Directive::AltPreconditions;
        }
        if let Some(caps) = self.precondition.captures(line) {
            return Directive::Precondition {
                name: caps[1].to_string(),
                body: caps[2].trim().to_string(),
            };
        }
        if self.alt_precondition_one_dash.is_match(line) {
            return Directive::AltPrecondition;
        }
        Directive::Body
    }

    /// Detect the multi-line rollback close token at end of line. Returns
    /// the text preceding the token when the line closes the block: the
    /// content to keep, or an empty string when only whitespace precedes
    /// the token.
    pub fn multi_line_rollback_close(&self, line: &str) -> Option<String> {
        if !self.rollback_multi_line_end.is_match(line) {
            return None;
        }
        let prefix = match self.multi_line_end_split.find(line) {
            Some(found) => &line[..found.start()],
            None => "",
        };
        if prefix.trim().is_empty() {
            Some(String::new())
        } else {
            Some(prefix.to_string())
        }
    }
}

/// First capture group of an anchored pattern, when the line matches.
pub fn first_capture(pattern: &Regex, line: &str) -> Option<String> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|group| group.as_str().to_string())
}

/// Boolean attribute value: `true` (any case) is true, any other matched
/// value is false, no match is `None` so callers can apply the default.
pub fn boolean_capture(pattern: &Regex, line: &str) -> Option<bool> {
    first_capture(pattern, line).map(|value| value.eq_ignore_ascii_case("true"))
}

/// `None` for empty-after-trim text, the trimmed text otherwise.
pub fn trim_to_none(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Strip one pair of enclosing double quotes, if both ends carry one.
pub fn strip_enclosing_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Strip a leading and a trailing double quote independently, the way
/// context values are cleaned (`"foo` becomes `foo`).
pub fn strip_quote_edges(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}
