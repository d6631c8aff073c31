//! Errors raised by reflection hosts.

use thiserror::Error;

/// A reflection operation was called in a way it cannot answer.
///
/// Recognition misses are not errors; they come back as `None` or an empty
/// collection. Only caller mistakes end up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReflectionError {
    /// A class-only operation received a node with no class shape at all.
    #[error("{operation}: attempted to reflect a node that is not a class: {text}")]
    NotAClass {
        operation: &'static str,
        text: String,
    },

    #[error("cannot match an unnamed declaration to typings: {text}")]
    UnnamedDeclaration { text: String },

    #[error("cannot match an unresolved declaration to typings: {text}")]
    UnresolvedDeclaration { text: String },
}
