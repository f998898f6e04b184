//! Remakefile parsing and rule matching for remake
//!
//! This crate provides:
//! - `Rule`: a build rule with literal or `%`-pattern targets
//! - `RuleSet`: the loaded rule file, with matching and instantiation
//! - `words`: the shared word lexer (also used by the dependency database)
//!
//! ## Grammar
//!
//! ```text
//! rule := target_list ':' dep_list '\n' script
//! target_list := word (SP word)*
//! dep_list := (word (SP word)*)?
//! script := ( '\t' any_line_text '\n' )*
//! ```
//!
//! A word is a bare token (anything but space, tab, CR, LF, `:`) or a
//! double-quoted string in which `\` escapes the next character. A `%` in a
//! word makes its rule generic; generic rules match a family of targets by
//! stem substitution.

pub mod words;

mod matcher;
mod parse;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Errors that can occur while loading the rule file
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Failed to load rules: no Remakefile found")]
    MissingRuleFile,

    #[error("Failed to load rules: syntax error at line {line}")]
    Syntax { line: usize },

    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
}

/// A rule loaded from the rule file.
///
/// Targets and deps are patterns: at most one `%` per word is meaningful
/// (the first occurrence splits prefix and suffix). The script is kept as
/// literal bytes, one `\n`-terminated line per tab-prefixed source line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    /// Whether any target or dep contains a `%` placeholder.
    pub generic: bool,
    /// Files produced by this rule.
    pub targets: Vec<String>,
    /// Static dependencies, built before the script runs.
    pub deps: Vec<String>,
    /// Shell script that builds all the targets at once.
    pub script: String,
}

/// The loaded rule file. Immutable after load; source order is preserved
/// because it is the tie-breaker during matching.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Load and parse a rule file from disk.
    ///
    /// A missing file is `RulesError::MissingRuleFile`; any other read
    /// failure is reported with its path.
    pub fn load(path: &Utf8Path) -> Result<Self, RulesError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RulesError::MissingRuleFile);
            }
            Err(e) => {
                return Err(RulesError::Read {
                    path: path.to_owned(),
                    source: e,
                });
            }
        };
        Self::parse(&contents)
    }

    /// Parse rule file contents.
    pub fn parse(contents: &str) -> Result<Self, RulesError> {
        Ok(Self {
            rules: parse::parse(contents)?,
        })
    }

    /// All rules in source order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Find the rule for `target` and instantiate it:
    /// - an exact non-generic match wins immediately,
    /// - otherwise the generic match with the shortest stem, ties broken by
    ///   source order, with the stem substituted into targets and deps.
    pub fn find(&self, target: &str) -> Option<Rule> {
        matcher::find_rule(&self.rules, target)
    }
}
