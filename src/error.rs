//! Error taxonomy, per spec.md §7: grammar/DFA construction errors are
//! fatal at build time; syntactic errors terminate a parse; semantic
//! errors accumulate during the regex→NFA pass.

use crate::position::Position;
use std::fmt::{Display, Formatter};

/// Fatal error raised while building a `Dfa` or a `ParseTable`.
///
/// A broken grammar or lexical specification must be rejected before any
/// lexing or parsing is attempted; these errors are never recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// `from` in a transition descriptor is negative, or a `default_to`
    /// conflicts with one already recorded for the same `from` state.
    InvalidTransition(String),
    /// A state mentioned by a final-state descriptor is out of range, or
    /// the same state appears more than once.
    DuplicateFinalState(usize),
    /// A state is not reachable from the start state (state 0).
    UnreachableState(usize),
    /// Two productions both claim cell `(lhs, terminal)` of the parse table.
    Conflict {
        lhs: String,
        terminal: String,
        first: usize,
        second: usize,
    },
}

impl Display for GrammarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarError::InvalidTransition(msg) => write!(f, "invalid DFA transition: {}", msg),
            GrammarError::DuplicateFinalState(state) => {
                write!(f, "duplicate final-state entry for state {}", state)
            }
            GrammarError::UnreachableState(state) => {
                write!(f, "unreachable state in DFA: {}", state)
            }
            GrammarError::Conflict {
                lhs,
                terminal,
                first,
                second,
            } => write!(
                f,
                "LL(1) conflict in cell ({}, {}) between productions {} and {}",
                lhs, terminal, first, second
            ),
        }
    }
}

impl std::error::Error for GrammarError {}

/// Syntactic failure: terminal mismatch or a missing parse-table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub pointer: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(pointer: usize, message: String) -> Self {
        Self { pointer, message }
    }

    pub fn with_position(pointer: usize, message: String, position: Position) -> Self {
        Self {
            pointer,
            message: format!("{}\nFailed to parse at {}.", message, position),
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyntaxError: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Semantic failure accumulated while lowering a regex AST to an NFA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    pub message: String,
}

impl SemanticError {
    pub fn invalid_range(low: char, high: char) -> Self {
        Self {
            message: format!("Invalid range: {}-{}", low, high),
        }
    }
}

impl Display for SemanticError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SemanticError {}
