//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Registry operations raise `Validation`, `DuplicateName` and `NotFound`
/// synchronously. `Execution` is produced at the sandbox boundary and
/// `Refusal` is a deliberate terminal decision by the agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("A tool named '{0}' already exists")]
    DuplicateName(String),

    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Request refused: {0}")]
    Refusal(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        DomainError::Execution(message.into())
    }

    /// Check if this error represents an intentional refusal
    pub fn is_refusal(&self) -> bool {
        matches!(self, DomainError::Refusal(_))
    }
}
