//! Assist mode: propose, then wait for a human decision.
//!
//! `Idle → Proposed → (Approved → Executing → Idle | Rejected → Idle)`.
//! The held call runs only on approve; reject drops it without side effects.

use super::context::{Decision, LoopContext};
use super::error::LoopError;
use crate::ports::approval::{ApprovalDecision, ApprovalPort, Proposal};
use serde_json::json;
use std::sync::{Mutex, PoisonError};
use toolforge_domain::{AgentMode, EnrichedResult, LoopPhase};

#[derive(Debug, Clone)]
pub enum AssistOutcome {
    Executed(EnrichedResult),
    Rejected(Proposal),
    Answered(Option<String>),
}

pub struct AssistLoop {
    ctx: LoopContext,
    pending: Mutex<Option<Proposal>>,
}

impl AssistLoop {
    pub fn new(ctx: LoopContext) -> Self {
        Self {
            ctx,
            pending: Mutex::new(None),
        }
    }

    /// Choose a call and hold it. Returns `None` when the model answered
    /// without a tool call. A new proposal replaces any pending one.
    pub async fn propose(&self, request: &str) -> Result<Option<Proposal>, LoopError> {
        let decision = match self.ctx.decide(AgentMode::Assist, request, request).await {
            Ok(decision) => decision,
            Err(e) => {
                self.ctx.set_phase(AgentMode::Assist, LoopPhase::Idle);
                return Err(e.into());
            }
        };
        match decision {
            Decision::Refused(reason) => {
                self.ctx.set_phase(AgentMode::Assist, LoopPhase::Idle);
                Err(LoopError::Refused(reason))
            }
            Decision::NoCall { .. } => {
                self.ctx.set_phase(AgentMode::Assist, LoopPhase::Idle);
                Ok(None)
            }
            Decision::Call { call, revised_with } => {
                let proposal = Proposal {
                    request: request.to_string(),
                    tool_call: call,
                    revised_with,
                };
                self.ctx.log("proposal", json!({"call": proposal.tool_call}));
                *self.lock_pending() = Some(proposal.clone());
                self.ctx.set_phase(AgentMode::Assist, LoopPhase::Proposed);
                Ok(Some(proposal))
            }
        }
    }

    pub fn pending(&self) -> Option<Proposal> {
        self.lock_pending().clone()
    }

    /// Execute the held call.
    pub async fn approve(&self) -> Result<EnrichedResult, LoopError> {
        let proposal = self.lock_pending().take().ok_or(LoopError::NothingPending)?;
        self.ctx.log("approved", json!({"call": proposal.tool_call}));
        let result = self.ctx.execute(AgentMode::Assist, &proposal.tool_call).await;
        self.ctx.set_phase(AgentMode::Assist, LoopPhase::Idle);
        Ok(result)
    }

    /// Discard the held call.
    pub fn reject(&self) -> Result<Proposal, LoopError> {
        let proposal = self.lock_pending().take().ok_or(LoopError::NothingPending)?;
        self.ctx.log("rejected", json!({"call": proposal.tool_call}));
        self.ctx.set_phase(AgentMode::Assist, LoopPhase::Idle);
        Ok(proposal)
    }

    /// Propose and let `approval` decide.
    pub async fn run(
        &self,
        request: &str,
        approval: &dyn ApprovalPort,
    ) -> Result<AssistOutcome, LoopError> {
        let Some(proposal) = self.propose(request).await? else {
            return Ok(AssistOutcome::Answered(None));
        };
        let decision = match approval.decide(&proposal).await {
            Ok(decision) => decision,
            Err(e) => {
                self.reject()?;
                return Err(LoopError::Approval(e.to_string()));
            }
        };
        match decision {
            ApprovalDecision::Approve => Ok(AssistOutcome::Executed(self.approve().await?)),
            ApprovalDecision::Reject => Ok(AssistOutcome::Rejected(self.reject()?)),
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<Proposal>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::approval::{AutoApprove, AutoReject};
    use crate::test_support::{MockGateway, ScriptedSandbox, mock_context};
    use serde_json::json;
    use toolforge_domain::ToolCall;
    use toolforge_domain::well_known::ECHO;

    fn echo_call() -> ToolCall {
        ToolCall::new(ECHO).with_arg("message", "hi")
    }

    #[tokio::test]
    async fn test_proposal_is_held_until_approved() {
        let (ctx, _gateway) = mock_context(
            ScriptedSandbox::echo(),
            MockGateway::new().with_call(echo_call()),
        );
        let assist = AssistLoop::new(ctx.clone());

        let proposal = assist.propose("say hi").await.unwrap().unwrap();
        assert_eq!(proposal.tool_call, echo_call());
        assert_eq!(ctx.events().phase(AgentMode::Assist), LoopPhase::Proposed);
        assert!(ctx.runtime().registry().activity().is_empty());

        let result = assist.approve().await.unwrap();
        assert_eq!(result.execution_result, Some(json!({"message": "hi"})));
        assert_eq!(ctx.events().phase(AgentMode::Assist), LoopPhase::Idle);
        assert!(assist.pending().is_none());
    }

    #[tokio::test]
    async fn test_reject_has_no_side_effects() {
        let (ctx, _gateway) = mock_context(
            ScriptedSandbox::echo(),
            MockGateway::new().with_call(echo_call()),
        );
        let assist = AssistLoop::new(ctx.clone());

        assist.propose("say hi").await.unwrap();
        let rejected = assist.reject().unwrap();

        assert_eq!(rejected.tool_call, echo_call());
        assert!(ctx.runtime().registry().activity().is_empty());
        assert!(matches!(assist.approve().await, Err(LoopError::NothingPending)));
    }

    #[tokio::test]
    async fn test_run_with_policies() {
        let (ctx, _gateway) = mock_context(
            ScriptedSandbox::echo(),
            MockGateway::new().repeating_call(echo_call()),
        );
        let assist = AssistLoop::new(ctx);

        let outcome = assist.run("say hi", &AutoApprove).await.unwrap();
        assert!(matches!(outcome, AssistOutcome::Executed(ref r) if r.is_success()));

        let outcome = assist.run("say hi", &AutoReject).await.unwrap();
        assert!(matches!(outcome, AssistOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn test_nothing_to_reject() {
        let (ctx, _gateway) = mock_context(ScriptedSandbox::echo(), MockGateway::new());
        assert!(matches!(
            AssistLoop::new(ctx).reject(),
            Err(LoopError::NothingPending)
        ));
    }
}
