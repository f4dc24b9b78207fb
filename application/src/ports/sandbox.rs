//! Execution sandbox port
//!
//! Runs a tool implementation against arguments and a [`RuntimeApi`].
//! Whatever the implementation raises is converted into an
//! [`ExecutionError`] at this boundary; nothing escapes as a panic or a
//! foreign error type.

use crate::runtime::api::RuntimeApi;
use async_trait::async_trait;
use serde_json::Value;
use toolforge_domain::{ExecutionError, Tool};

#[async_trait]
pub trait ExecutionSandbox: Send + Sync {
    /// Execute `tool.implementation` with `args`.
    ///
    /// The implementation may re-enter the sandbox through
    /// `runtime.tools.run`. No retries are performed.
    async fn run(
        &self,
        tool: &Tool,
        args: Value,
        runtime: RuntimeApi,
    ) -> Result<Value, ExecutionError>;

    /// Compile `implementation` without running it.
    fn check_syntax(&self, implementation: &str) -> Result<(), ExecutionError>;
}
