//! Domain layer for toolforge
//!
//! This crate contains the core entities and invariants of the agent
//! runtime. It has no dependencies on infrastructure or presentation
//! concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Tools as data
//!
//! A [`Tool`] is a named, versioned capability whose behavior is Lua source.
//! The [`ToolRegistry`] owns the tool lifecycle: unique names, derived ids,
//! monotonically increasing versions and non-clearable essential fields.
//!
//! ## Loop state
//!
//! Control loops own a [`ResourceBudget`] (autonomous), a
//! [`BoundedHistory`] for self-correction and a [`WorkerPool`] (swarm).

pub mod agent;
pub mod core;
pub mod persistence;
pub mod prompt;
pub mod retrieval;
pub mod tool;

// Re-export commonly used types
pub use agent::{
    AgentMode, AgentWorker, BoundedHistory, ConfigIssue, ConfigIssueCode,
    DEFAULT_HISTORY_CAPACITY, LoopPhase, ResourceBudget, Severity, WorkerPool, WorkerStatus,
};
pub use core::error::DomainError;
pub use persistence::{CURRENT_VERSION, MigrationError, RegistryDocument, migrate};
pub use prompt::AgentPromptTemplate;
pub use tool::{
    EnrichedResult, ExecutionError, ExecutionErrorKind, NewTool, Tool, ToolCall, ToolCategory,
    ToolParameter, ToolRegistry, ToolSummary, ToolUpdate, well_known,
};
