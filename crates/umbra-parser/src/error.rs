//! Parse failures reported by the parser wrapper.

use thiserror::Error;

/// A source file that could not be turned into a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Unrecoverable syntax error at a 1-indexed line and column.
    #[error("{path}:{line}:{column}: {message}")]
    Syntax {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },
}
