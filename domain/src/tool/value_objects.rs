//! Tool domain value objects: outcomes of attempted tool calls
//!
//! Every attempted [`ToolCall`] resolves into an [`EnrichedResult`] carrying
//! exactly one of an execution result or an [`ExecutionError`].

use super::entities::{Tool, ToolCall};
use super::well_known;
use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification carried by an [`ExecutionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    Validation,
    DuplicateName,
    NotFound,
    /// The implementation itself raised
    Execution,
}

impl ExecutionErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionErrorKind::Validation => "validation",
            ExecutionErrorKind::DuplicateName => "duplicate_name",
            ExecutionErrorKind::NotFound => "not_found",
            ExecutionErrorKind::Execution => "execution",
        }
    }
}

/// A failure recorded in place of an execution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,
    pub message: String,
}

impl ExecutionError {
    pub fn new(kind: ExecutionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn raised(message: impl Into<String>) -> Self {
        Self::new(ExecutionErrorKind::Execution, message)
    }

    pub fn not_found(name: &str) -> Self {
        Self::new(
            ExecutionErrorKind::NotFound,
            format!("Tool not found: {}", name),
        )
    }

    /// True when the implementation raised, as opposed to a registry-level
    /// rejection.
    pub fn is_raised(&self) -> bool {
        self.kind == ExecutionErrorKind::Execution
    }
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

impl From<DomainError> for ExecutionError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(m) => Self::new(ExecutionErrorKind::Validation, m),
            DomainError::DuplicateName(name) => Self::new(
                ExecutionErrorKind::DuplicateName,
                format!("A tool named '{}' already exists", name),
            ),
            DomainError::NotFound(name) => Self::not_found(&name),
            DomainError::Execution(m) | DomainError::Refusal(m) => Self::raised(m),
        }
    }
}

/// The outcome of attempting one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResult {
    pub tool_call: ToolCall,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<ExecutionError>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl EnrichedResult {
    pub fn success(tool_call: ToolCall, tool: Tool, result: Value) -> Self {
        Self {
            tool_call,
            tool: Some(tool),
            execution_result: Some(result),
            execution_error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(tool_call: ToolCall, tool: Option<Tool>, error: ExecutionError) -> Self {
        Self {
            tool_call,
            tool,
            execution_result: None,
            execution_error: Some(error),
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.execution_error.is_none()
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_call.name
    }

    /// True when the result is the structured "awaiting human input" payload.
    pub fn is_awaiting_input(&self) -> bool {
        self.execution_result
            .as_ref()
            .is_some_and(well_known::is_awaiting_input)
    }

    /// One-line summary for prompts and logs.
    pub fn describe(&self) -> String {
        match (&self.execution_result, &self.execution_error) {
            (_, Some(err)) => format!("{} failed: {}", self.tool_call.name, err),
            (Some(value), None) => format!("{} succeeded: {}", self.tool_call.name, value),
            (None, None) => format!("{} pending", self.tool_call.name),
        }
    }
}
