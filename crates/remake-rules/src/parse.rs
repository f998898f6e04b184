//! The rule file parser.
//!
//! A character-level state machine rather than a line splitter: quoted
//! words may contain `:` and newlines are significant only in some states.

use crate::words::Scanner;
use crate::{Rule, RulesError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing read yet.
    Start,
    /// Inside a target list.
    Targets,
    /// After the `:`, inside the dep list.
    Deps,
    /// Inside the tab-prefixed script block.
    Script,
}

pub(crate) fn parse(contents: &str) -> Result<Vec<Rule>, RulesError> {
    let mut sc = Scanner::new(contents);
    let mut rules = Vec::new();
    let mut state = State::Start;
    let mut current = Rule::default();
    let mut script = String::new();
    let mut line = 1usize;

    while let Some(c) = sc.peek() {
        match (state, c) {
            (State::Script, b'\t') => {
                sc.bump();
                script.push_str(sc.take_line());
            }
            (State::Script, b'\r' | b'\n') => {
                sc.bump();
                script.push(c as char);
                if c == b'\n' {
                    line += 1;
                }
            }
            (State::Deps, b'\n') => {
                sc.bump();
                line += 1;
                state = State::Script;
            }
            (State::Targets, b':') => {
                sc.bump();
                state = State::Deps;
                sc.skip_spaces();
            }
            _ => {
                if state == State::Script {
                    current.script = std::mem::take(&mut script);
                    rules.push(std::mem::take(&mut current));
                }
                let word = sc.read_word();
                sc.skip_spaces();
                if word.is_empty() {
                    return Err(RulesError::Syntax { line });
                }
                if word.contains('%') {
                    // A placeholder may only join a rule that is already
                    // generic; the first word of a rule introduces it freely.
                    if matches!(state, State::Targets | State::Deps) && !current.generic {
                        return Err(RulesError::Syntax { line });
                    }
                    current.generic = true;
                } else if state == State::Targets && current.generic {
                    return Err(RulesError::Syntax { line });
                }
                if state == State::Deps {
                    current.deps.push(word);
                } else {
                    current.targets.push(word);
                    state = State::Targets;
                }
            }
        }
    }

    if state != State::Start {
        current.script = script;
        rules.push(current);
    }
    Ok(rules)
}
