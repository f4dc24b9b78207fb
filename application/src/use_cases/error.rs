//! Errors surfaced by the control loops.

use crate::ports::ai_gateway::GatewayError;
use thiserror::Error;
use toolforge_domain::{AgentMode, DomainError};

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("AI gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Deliberate terminal refusal; never retried
    #[error("Request refused: {0}")]
    Refused(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("No proposal is pending")]
    NothingPending,

    #[error("Approval failed: {0}")]
    Approval(String),

    #[error("{0} loop is already running")]
    AlreadyRunning(AgentMode),

    #[error("{0} loop is not in a resumable state")]
    NotResumable(AgentMode),

    #[error("Scheduler is not running")]
    SchedulerClosed,

    #[error("Operation cancelled")]
    Cancelled,
}

impl LoopError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoopError::Cancelled)
    }
}
