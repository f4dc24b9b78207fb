//! Tool domain module
//!
//! A [`Tool`] is a named, versioned capability whose behavior is Lua source
//! text. Tools are data: they can be created and improved while the runtime
//! is running, including by other tools.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌────────────────┐
//! │ ToolRegistry │───▶│ ToolCall     │───▶│ EnrichedResult │
//! │ (owner)      │    │ (invocation) │    │ (outcome)      │
//! └──────────────┘    └──────────────┘    └────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ToolRegistry`]: owns create/update/lookup invariants
//! - [`Tool`] / [`NewTool`] / [`ToolUpdate`]: entity, create payload, partial update
//! - [`ToolCall`]: an invocation request
//! - [`EnrichedResult`] / [`ExecutionError`]: the outcome of one attempt
//! - [`well_known`]: names the control loops treat specially

pub mod entities;
pub mod registry;
pub mod value_objects;
pub mod well_known;

pub use entities::{NewTool, Tool, ToolCall, ToolCategory, ToolParameter, ToolSummary, ToolUpdate};
pub use registry::ToolRegistry;
pub use value_objects::{EnrichedResult, ExecutionError, ExecutionErrorKind};
