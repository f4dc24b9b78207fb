//! Port doubles for adapter tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use toolforge_application::{
    AiGateway, Critique, ExecutionSandbox, GatewayError, GeneratedResponse, RegistryHandle,
    ToolRuntime, Verification,
};
use toolforge_domain::{EnrichedResult, NewTool, Tool, ToolCall, ToolRegistry, ToolSummary};

/// Gateway that answers `verify`/`critique` with fixed verdicts and
/// refuses to generate anything else.
pub(crate) struct StubGateway {
    verification: Mutex<Verification>,
}

impl StubGateway {
    pub(crate) fn new() -> Self {
        Self {
            verification: Mutex::new(Verification {
                is_correct: true,
                reasoning: "looks right".to_string(),
            }),
        }
    }

    pub(crate) fn with_verification(self, is_correct: bool, reasoning: &str) -> Self {
        *self.verification.lock().unwrap() = Verification {
            is_correct,
            reasoning: reasoning.to_string(),
        };
        self
    }
}

#[async_trait]
impl AiGateway for StubGateway {
    async fn select_tools(
        &self,
        _request: &str,
        _summaries: &[ToolSummary],
    ) -> Result<Vec<String>, GatewayError> {
        Err(GatewayError::Other("not scripted".to_string()))
    }

    async fn generate_response(
        &self,
        _request: &str,
        _system_instruction: &str,
        _tools: &[Tool],
    ) -> Result<GeneratedResponse, GatewayError> {
        Err(GatewayError::Other("not scripted".to_string()))
    }

    async fn generate_goal(
        &self,
        _history: &[EnrichedResult],
        _budget_remaining: Option<u32>,
    ) -> Result<String, GatewayError> {
        Err(GatewayError::Other("not scripted".to_string()))
    }

    async fn critique(&self, _goal: &str, _action: &ToolCall) -> Result<Critique, GatewayError> {
        Ok(Critique {
            is_optimal: true,
            suggestion: String::new(),
        })
    }

    async fn verify(&self, _tool: &Tool) -> Result<Verification, GatewayError> {
        Ok(self.verification.lock().unwrap().clone())
    }

    async fn generate_text(
        &self,
        _prompt: &str,
        _system_instruction: &str,
    ) -> Result<String, GatewayError> {
        Err(GatewayError::Other("not scripted".to_string()))
    }
}

/// Runtime over a registry holding `tools`.
pub(crate) fn runtime_with(
    sandbox: impl ExecutionSandbox + 'static,
    gateway: StubGateway,
    tools: Vec<NewTool>,
) -> ToolRuntime {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.add(tool).unwrap();
    }
    ToolRuntime::new(
        RegistryHandle::new(registry),
        Arc::new(sandbox),
        Arc::new(gateway),
    )
}
