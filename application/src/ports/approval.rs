//! Approval port for assist mode.
//!
//! Assist mode holds a proposed tool call until someone approves or rejects
//! it. The decision can come from an interactive prompt (presentation
//! layer) or from one of the fixed policies below.

use async_trait::async_trait;
use toolforge_domain::ToolCall;

/// A held proposal shown to the approver.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub request: String,
    pub tool_call: ToolCall,
    /// Critique suggestion applied before proposing, if any
    pub revised_with: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// Error type for approval operations.
///
/// These are failures of the approval process, not decisions.
#[derive(Debug, Clone)]
pub enum ApprovalError {
    Cancelled,
    IoError(String),
}

impl std::fmt::Display for ApprovalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalError::Cancelled => write!(f, "Approval cancelled"),
            ApprovalError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ApprovalError {}

#[async_trait]
pub trait ApprovalPort: Send + Sync {
    async fn decide(&self, proposal: &Proposal) -> Result<ApprovalDecision, ApprovalError>;
}

/// Approves every proposal.
pub struct AutoApprove;

#[async_trait]
impl ApprovalPort for AutoApprove {
    async fn decide(&self, _proposal: &Proposal) -> Result<ApprovalDecision, ApprovalError> {
        Ok(ApprovalDecision::Approve)
    }
}

/// Rejects every proposal.
pub struct AutoReject;

#[async_trait]
impl ApprovalPort for AutoReject {
    async fn decide(&self, _proposal: &Proposal) -> Result<ApprovalDecision, ApprovalError> {
        Ok(ApprovalDecision::Reject)
    }
}
