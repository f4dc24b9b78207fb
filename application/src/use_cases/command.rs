//! Command mode: one request, one cycle.
//!
//! `Idle → Thinking → Executing → Idle`. No budget and no history carried
//! between requests.

use super::context::{Decision, LoopContext};
use super::error::LoopError;
use toolforge_domain::{AgentMode, EnrichedResult, LoopPhase};

#[derive(Debug, Clone)]
pub enum CommandOutcome {
    Executed(EnrichedResult),
    /// The model replied without choosing a tool
    Answered(Option<String>),
}

pub struct CommandLoop {
    ctx: LoopContext,
}

impl CommandLoop {
    pub fn new(ctx: LoopContext) -> Self {
        Self { ctx }
    }

    /// Handle one request.
    ///
    /// Unknown tool names come back as a failed [`EnrichedResult`]; gateway
    /// errors and refusals are returned as errors.
    pub async fn run(&self, request: &str) -> Result<CommandOutcome, LoopError> {
        let outcome = self.cycle(request).await;
        self.ctx.set_phase(AgentMode::Command, LoopPhase::Idle);
        outcome
    }

    async fn cycle(&self, request: &str) -> Result<CommandOutcome, LoopError> {
        match self.ctx.decide(AgentMode::Command, request, request).await? {
            Decision::Refused(reason) => Err(LoopError::Refused(reason)),
            Decision::NoCall { text } => Ok(CommandOutcome::Answered(text)),
            Decision::Call { call, .. } => Ok(CommandOutcome::Executed(
                self.ctx.execute(AgentMode::Command, &call).await,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ai_gateway::{GatewayError, GeneratedResponse};
    use crate::test_support::{MockGateway, ScriptedSandbox, mock_context};
    use toolforge_domain::{ExecutionErrorKind, ToolCall};

    #[tokio::test]
    async fn test_nonexistent_tool_yields_single_failed_result() {
        let (ctx, _gateway) = mock_context(
            ScriptedSandbox::echo(),
            MockGateway::new().with_call(ToolCall::new("Nonexistent")),
        );
        let events = ctx.events().clone();
        let command = CommandLoop::new(ctx);

        let outcome = command.run("do the impossible thing").await.unwrap();

        let CommandOutcome::Executed(result) = outcome else {
            panic!("expected an executed outcome");
        };
        assert!(result.tool.is_none());
        assert_eq!(
            result.execution_error.unwrap().kind,
            ExecutionErrorKind::NotFound
        );
        assert_eq!(events.snapshot(AgentMode::Command).actions, 1);
        assert_eq!(events.phase(AgentMode::Command), LoopPhase::Idle);
    }

    #[tokio::test]
    async fn test_gateway_error_halts_and_surfaces() {
        let sandbox = ScriptedSandbox::echo();
        let (ctx, _gateway) = mock_context(
            sandbox,
            MockGateway::new().with_response(Err(GatewayError::Timeout)),
        );
        let command = CommandLoop::new(ctx.clone());

        let err = command.run("hello").await.unwrap_err();

        assert!(matches!(err, LoopError::Gateway(GatewayError::Timeout)));
        assert_eq!(ctx.events().phase(AgentMode::Command), LoopPhase::Idle);
        assert!(ctx.runtime().registry().activity().is_empty());
    }

    #[tokio::test]
    async fn test_refusal_is_terminal() {
        let (ctx, gateway) = mock_context(
            ScriptedSandbox::echo(),
            MockGateway::new().with_response(Ok(GeneratedResponse::refused("nonsense"))),
        );
        let err = CommandLoop::new(ctx).run("colorless green ideas").await.unwrap_err();
        assert!(matches!(err, LoopError::Refused(ref r) if r == "nonsense"));
        assert_eq!(gateway.calls_to("generate_response"), 1);
    }

    #[tokio::test]
    async fn test_text_only_answer() {
        let (ctx, _gateway) = mock_context(
            ScriptedSandbox::echo(),
            MockGateway::new().with_response(Ok(GeneratedResponse::text_only("hi there"))),
        );
        let outcome = CommandLoop::new(ctx).run("hello").await.unwrap();
        assert!(matches!(outcome, CommandOutcome::Answered(Some(ref t)) if t == "hi there"));
    }
}
