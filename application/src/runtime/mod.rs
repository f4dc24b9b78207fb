//! Tool execution runtime.
//!
//! [`ToolRuntime`] bundles the registry, sandbox, gateway and domain
//! namespaces. Each top-level execution builds a fresh [`RuntimeApi`] at
//! depth 0; nested `tools.run` calls descend one level at a time.

pub mod api;

pub use api::RuntimeApi;

use crate::ports::ai_gateway::AiGateway;
use crate::ports::domain_namespace::DomainNamespace;
use crate::ports::sandbox::ExecutionSandbox;
use crate::registry::RegistryHandle;
use std::collections::HashMap;
use std::sync::Arc;
use toolforge_domain::{EnrichedResult, ExecutionError, ToolCall};
use tracing::debug;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 8;

#[derive(Clone)]
pub struct ToolRuntime {
    pub(crate) registry: RegistryHandle,
    pub(crate) sandbox: Arc<dyn ExecutionSandbox>,
    pub(crate) gateway: Arc<dyn AiGateway>,
    pub(crate) namespaces: Arc<HashMap<String, Arc<dyn DomainNamespace>>>,
    pub(crate) max_call_depth: usize,
}

impl ToolRuntime {
    pub fn new(
        registry: RegistryHandle,
        sandbox: Arc<dyn ExecutionSandbox>,
        gateway: Arc<dyn AiGateway>,
    ) -> Self {
        Self {
            registry,
            sandbox,
            gateway,
            namespaces: Arc::new(HashMap::new()),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Register a domain namespace reachable through `runtime.call`.
    pub fn with_namespace(mut self, namespace: Arc<dyn DomainNamespace>) -> Self {
        let mut namespaces = (*self.namespaces).clone();
        namespaces.insert(namespace.name().to_string(), namespace);
        self.namespaces = Arc::new(namespaces);
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn gateway(&self) -> &Arc<dyn AiGateway> {
        &self.gateway
    }

    pub fn sandbox(&self) -> &Arc<dyn ExecutionSandbox> {
        &self.sandbox
    }

    /// A top-level API handle.
    pub fn api(&self) -> RuntimeApi {
        RuntimeApi::root(self.clone())
    }

    /// Resolve and run one call, folding every failure into the result.
    pub async fn execute(&self, call: &ToolCall) -> EnrichedResult {
        let Some(tool) = self.registry.get(&call.name) else {
            debug!(tool = %call.name, "Tool call references an unknown tool");
            return EnrichedResult::failure(call.clone(), None, ExecutionError::not_found(&call.name));
        };

        match self.api().run_tool(&tool, call.arguments_value()).await {
            Ok(value) => EnrichedResult::success(call.clone(), tool, value),
            Err(error) => EnrichedResult::failure(call.clone(), Some(tool), error),
        }
    }
}
