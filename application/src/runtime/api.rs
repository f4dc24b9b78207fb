//! The capability-facing runtime surface.
//!
//! Tool implementations see this as the `runtime` global:
//!
//! | Lua | Method |
//! |-----|--------|
//! | `runtime.tools.get(name)` | [`RuntimeApi::tools_get`] |
//! | `runtime.tools.list()` | [`RuntimeApi::tools_list`] |
//! | `runtime.tools.run(name, args)` | [`RuntimeApi::tools_run`] |
//! | `runtime.tools.add(payload)` | [`RuntimeApi::tools_add`] |
//! | `runtime.tools.update(name, fields)` | [`RuntimeApi::tools_update`] |
//! | `runtime.tools.check_syntax(name)` | [`RuntimeApi::check_syntax`] |
//! | `runtime.ai.verify(tool)` | [`RuntimeApi::ai_verify`] |
//! | `runtime.ai.critique(goal, action)` | [`RuntimeApi::ai_critique`] |
//! | `runtime.call(ns, method, args)` | [`RuntimeApi::call`] |

use super::ToolRuntime;
use crate::ports::ai_gateway::{Critique, GatewayError, Verification};
use serde_json::Value;
use toolforge_domain::{
    DomainError, ExecutionError, NewTool, Tool, ToolCall, ToolSummary, ToolUpdate,
};
use tracing::debug;

#[derive(Clone)]
pub struct RuntimeApi {
    runtime: ToolRuntime,
    depth: usize,
}

impl RuntimeApi {
    pub(crate) fn root(runtime: ToolRuntime) -> Self {
        Self { runtime, depth: 0 }
    }

    /// Nesting level of the tool currently holding this handle.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn tools_get(&self, name: &str) -> Option<Tool> {
        self.runtime.registry.get(name)
    }

    pub fn tools_list(&self) -> Vec<ToolSummary> {
        self.runtime.registry.summaries()
    }

    pub fn tools_add(&self, payload: NewTool) -> Result<Tool, DomainError> {
        self.runtime.registry.add(payload)
    }

    pub fn tools_update(&self, name: &str, update: ToolUpdate) -> Result<Tool, DomainError> {
        self.runtime.registry.update(name, update)
    }

    /// Run another tool through the same sandbox, one level deeper.
    pub async fn tools_run(&self, name: &str, args: Value) -> Result<Value, ExecutionError> {
        let tool = self
            .tools_get(name)
            .ok_or_else(|| ExecutionError::not_found(name))?;
        self.run_tool(&tool, args).await
    }

    pub(crate) async fn run_tool(&self, tool: &Tool, args: Value) -> Result<Value, ExecutionError> {
        if self.depth >= self.runtime.max_call_depth {
            return Err(ExecutionError::raised(format!(
                "call depth limit {} exceeded running '{}'",
                self.runtime.max_call_depth, tool.name
            )));
        }
        let child = RuntimeApi {
            runtime: self.runtime.clone(),
            depth: self.depth + 1,
        };
        debug!(tool = %tool.name, version = tool.version, depth = child.depth, "Running tool");
        self.runtime.sandbox.run(tool, args, child).await
    }

    /// Syntax-only check of a registered tool's implementation.
    pub fn check_syntax(&self, name: &str) -> Result<(), ExecutionError> {
        let tool = self
            .tools_get(name)
            .ok_or_else(|| ExecutionError::not_found(name))?;
        self.runtime.sandbox.check_syntax(&tool.implementation)
    }

    pub async fn ai_verify(&self, tool: &Tool) -> Result<Verification, GatewayError> {
        self.runtime.gateway.verify(tool).await
    }

    pub async fn ai_critique(&self, goal: &str, action: &ToolCall) -> Result<Critique, GatewayError> {
        self.runtime.gateway.critique(goal, action).await
    }

    /// Invoke a domain namespace supplied by an external collaborator.
    pub async fn call(
        &self,
        namespace: &str,
        method: &str,
        args: Value,
    ) -> Result<Value, ExecutionError> {
        let ns = self.runtime.namespaces.get(namespace).ok_or_else(|| {
            ExecutionError::raised(format!("unknown runtime namespace '{}'", namespace))
        })?;
        ns.call(method, args)
            .await
            .map_err(|e| ExecutionError::raised(format!("{}.{}: {}", namespace, method, e)))
    }
}
