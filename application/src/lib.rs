//! Application layer for toolforge
//!
//! Ports, the shared registry handle, the tool runtime, retrieval
//! strategies and the control loops. It depends only on the domain layer;
//! adapters are injected through the traits in [`ports`].

pub mod config;
pub mod ports;
pub mod registry;
pub mod retrieval;
pub mod runtime;
pub mod state_store;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{RetrievalKind, RuntimeConfig};
pub use ports::{
    ai_gateway::{AiGateway, Critique, GatewayError, GeneratedResponse, Verification},
    approval::{ApprovalDecision, ApprovalError, ApprovalPort, AutoApprove, AutoReject, Proposal},
    clock::{Clock, SystemClock},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    domain_namespace::DomainNamespace,
    embedding::EmbeddingPort,
    sandbox::ExecutionSandbox,
    tool_store::{StoreError, ToolStorePort},
};
pub use registry::RegistryHandle;
pub use retrieval::{Retrieval, RetrievalStrategy, build_strategy};
pub use runtime::{RuntimeApi, ToolRuntime};
pub use state_store::{LoopEvent, ModeSnapshot, StateStore};
pub use use_cases::{
    AssistLoop, AssistOutcome, AutonomousLoop, AutonomousStop, CommandLoop, CommandOutcome,
    ImprovementReport, ImprovementStage, LoopContext, LoopError, LoopScheduler, SchedulerHandle,
    SchedulerStatus, SelfImprovement, SwarmLoop, SwarmStop, TaskLoop, TaskReport, TaskStop,
};
