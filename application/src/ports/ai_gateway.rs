//! AI Gateway port
//!
//! Abstract contract for the language-model operations the runtime depends
//! on. Provider adapters live in the infrastructure layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolforge_domain::{EnrichedResult, Tool, ToolCall, ToolSummary};

/// Errors that can occur during gateway operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unparseable response: {0}")]
    InvalidResponse(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result of asking the model to choose a tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub tool_call: Option<ToolCall>,
    /// Free text accompanying (or replacing) the call
    pub text: Option<String>,
    /// Set when the model deliberately refuses the request
    pub refusal: Option<String>,
}

impl GeneratedResponse {
    pub fn call(tool_call: ToolCall) -> Self {
        Self {
            tool_call: Some(tool_call),
            ..Default::default()
        }
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            refusal: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Critique {
    pub is_optimal: bool,
    #[serde(default)]
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub is_correct: bool,
    #[serde(default)]
    pub reasoning: String,
}

/// Gateway for model operations.
///
/// All operations are request/response. Adapters that stream must still
/// return the final parsed shape.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Pick relevant tool names for a request (asked for 3 to 5).
    async fn select_tools(
        &self,
        request: &str,
        summaries: &[ToolSummary],
    ) -> Result<Vec<String>, GatewayError>;

    /// Choose at most one tool call from `tools`.
    async fn generate_response(
        &self,
        request: &str,
        system_instruction: &str,
        tools: &[Tool],
    ) -> Result<GeneratedResponse, GatewayError>;

    /// Produce the next autonomous goal from recent history.
    async fn generate_goal(
        &self,
        history: &[EnrichedResult],
        budget_remaining: Option<u32>,
    ) -> Result<String, GatewayError>;

    async fn critique(&self, goal: &str, action: &ToolCall) -> Result<Critique, GatewayError>;

    /// Semantic check that an implementation matches its description.
    async fn verify(&self, tool: &Tool) -> Result<Verification, GatewayError>;

    async fn generate_text(
        &self,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<String, GatewayError>;
}
