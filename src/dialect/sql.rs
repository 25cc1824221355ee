//! SQL dialect

use std::str::FromStr;

use strum::VariantNames;

use crate::changelog::{
    ChangeSet, ErrorOption, FailOption, PreconditionContainer, SqlChange, SqlOutputOption,
};
use crate::dialect::Dialect;
use crate::error::ChangeLogParseError;
use crate::grammar::{DirectiveGrammar, first_capture, trim_to_none};

/// The SQL rendition of the formatted changelog: `--` directives, `/* */`
/// multi-line rollback blocks, `.sql` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlDialect;

impl Dialect for SqlDialect {
    fn single_line_comment(&self) -> &str {
        "--"
    }

    fn start_multi_line_comment(&self) -> &str {
        "/*"
    }

    fn end_multi_line_comment(&self) -> &str {
        "*/"
    }

    fn supports_extension(&self, path: &str) -> bool {
        path.to_lowercase().ends_with(".sql")
    }

    fn sequence_type(&self) -> &str {
        "sql"
    }

    fn documentation_link(&self) -> &str {
        "https://docs.liquibase.com/concepts/changelogs/sql-format.html"
    }

    fn new_change(&self) -> SqlChange {
        SqlChange::default()
    }

    fn set_change_sequence(&self, change: &mut SqlChange, sequence: String) {
        change.sql = sequence;
    }

    /// Oracle-style scripts terminate PL/SQL blocks with a lone `/`; when
    /// the assembled SQL ends that way and no delimiter was declared, the
    /// parser forces the `\n/$` delimiter at EOF.
    fn is_end_delimiter(&self, change: &SqlChange) -> bool {
        change.end_delimiter.is_none() && change.sql.trim().ends_with("\n/")
    }

    /// Recognises `onFail:`, `onError:` and exactly one of `onSqlOutput:`
    /// / `onUpdateSql:`. A repeated header updates the policy fields it
    /// names; fields it omits and conditions already attached to the
    /// changeset are kept.
    fn handle_preconditions(
        &self,
        change_set: &mut ChangeSet,
        grammar: &DirectiveGrammar,
        body: &str,
    ) -> Result<(), ChangeLogParseError> {
        let mut container = change_set.preconditions.take().unwrap_or_default();

        if let Some(value) = captured_value(&grammar.on_fail, body) {
            container.on_fail = Some(FailOption::from_str(&value).map_err(|_| {
                invalid_attribute("onFail", value, FailOption::VARIANTS)
            })?);
        }
        if let Some(value) = captured_value(&grammar.on_error, body) {
            container.on_error = Some(ErrorOption::from_str(&value).map_err(|_| {
                invalid_attribute("onError", value, ErrorOption::VARIANTS)
            })?);
        }

        let on_sql_output = captured_value(&grammar.on_sql_output, body);
        let on_update_sql = captured_value(&grammar.on_update_sql, body);
        if on_sql_output.is_some() && on_update_sql.is_some() {
            return Err(ChangeLogParseError::ConflictingSqlOutputOptions);
        }
        if let Some(value) = on_sql_output.or(on_update_sql) {
            container.on_sql_output = Some(SqlOutputOption::from_str(&value).map_err(|_| {
                invalid_attribute("onSqlOutput", value, SqlOutputOption::VARIANTS)
            })?);
        }

        change_set.preconditions = Some(container);
        Ok(())
    }
}

fn captured_value(pattern: &regex::Regex, body: &str) -> Option<String> {
    first_capture(pattern, body).and_then(|v| trim_to_none(&v).map(str::to_string))
}

fn invalid_attribute(
    attribute: &'static str,
    value: String,
    possible: &[&str],
) -> ChangeLogParseError {
    ChangeLogParseError::InvalidPreconditionAttribute {
        attribute,
        value,
        possible_values: possible.join(", "),
    }
}
