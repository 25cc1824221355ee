//! Parameter registration and `${name}` expansion
//!
//! The parser calls into this interface at defined points: `property`
//! directives register parameters, and bodies, rollbacks and selected
//! changeset attributes are expanded against the registry. The default
//! implementation is a keyed mapping; callers with their own parameter
//! source implement [`ParameterExpander`] instead.

use indexmap::IndexMap;
use regex::{Captures, Regex};

use crate::changelog::ChangeLog;

/// One registered parameter. Context, labels and dbms scope the parameter
/// for callers that filter by deployment environment; the default registry
/// stores them but applies no filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    pub context: Option<String>,
    pub labels: Option<String>,
    pub dbms: Option<String>,
    pub global: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            context: None,
            labels: None,
            dbms: None,
            global: true,
        }
    }
}

/// The expansion contract the parser depends on.
///
/// `expand` substitutes `${name}` tokens and must leave unrecognised
/// tokens as they are, so that expansion of a text without tokens is the
/// identity. `register` records a parameter from a `property` directive;
/// the changelog is passed as scope for implementations that keep
/// per-changelog parameters.
pub trait ParameterExpander {
    fn expand(&self, text: &str, changelog: &ChangeLog) -> String;

    fn register(&mut self, parameter: Parameter, changelog: &ChangeLog);
}

/// Default registry: insertion-ordered, first registration of a name wins.
#[derive(Debug)]
pub struct ParameterRegistry {
    entries: IndexMap<String, Parameter>,
    expression: Regex,
}

/// Bound on re-expansion passes. Values may themselves contain `${...}`
/// tokens; expansion repeats until a fixed point, and the bound keeps
/// mutually referential parameters from looping forever.
const MAX_EXPANSION_PASSES: usize = 10;

impl ParameterRegistry {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            expression: Regex::new(r"\$\{([^}]+)\}").expect("valid expression pattern"),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|p| p.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn expand_once(&self, text: &str) -> String {
        self.expression
            .replace_all(text, |caps: &Captures| {
                let name = caps[1].trim();
                match self.entries.get(name) {
                    Some(parameter) => parameter.value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterExpander for ParameterRegistry {
    fn expand(&self, text: &str, _changelog: &ChangeLog) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_EXPANSION_PASSES {
            let next = self.expand_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn register(&mut self, parameter: Parameter, _changelog: &ChangeLog) {
        self.entries
            .entry(parameter.name.clone())
            .or_insert(parameter);
    }
}
