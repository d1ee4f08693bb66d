use crate::common::error::Error;
use thiserror::Error;

/// Faults inside the parser itself.
///
/// None of these describe user source. They mean a semantic action popped
/// the wrong thing or the tables disagree with the grammar, and they abort
/// the unit immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A pop found fewer entries than the production contributed
    #[error("{stack} stack underflow in production {production}")]
    StackUnderflow { stack: &'static str, production: usize },

    /// A group length on a stack disagrees with the production arity
    #[error("arity mismatch in production {production}: expected {expected}, found {found}")]
    ArityMismatch {
        production: usize,
        expected: usize,
        found: usize,
    },

    /// A stack entry is not the node kind the action requires
    #[error("production {production} expected {expected} on the {stack} stack")]
    WrongNode {
        stack: &'static str,
        expected: &'static str,
        production: usize,
    },

    /// Stacks still hold entries after the unit was accepted
    #[error("unbalanced stacks after accept: {detail}")]
    Unbalanced { detail: String },

    /// The automaton ran past its step budget
    #[error("parser exceeded {limit} steps")]
    OutOfGas { limit: usize },

    /// Table lookup produced a state or production that does not exist
    #[error("corrupt parse table: {detail}")]
    CorruptTable { detail: String },

    /// The grammar could not be turned into tables
    #[error("grammar: {0}")]
    Grammar(String),
}

impl ParseError {
    pub fn underflow(stack: &'static str, production: usize) -> Self {
        ParseError::StackUnderflow { stack, production }
    }

    pub fn wrong_node(stack: &'static str, expected: &'static str, production: usize) -> Self {
        ParseError::WrongNode { stack, expected, production }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Grammar(message) => Error::Grammar { message },
            other => Error::Internal { message: other.to_string() },
        }
    }
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
