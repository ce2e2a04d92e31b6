//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent rejected operations on the forest.
/// A rejected operation never leaves a partial mutation behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("connecting {source_id} under {target_id} would create a cycle")]
    Cycle {
        source_id: String,
        target_id: String,
    },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("nothing to undo")]
    UndoEmpty,

    #[error("corrupt forest: {0}")]
    CorruptForest(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
