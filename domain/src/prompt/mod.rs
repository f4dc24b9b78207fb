//! Prompt domain
//!
//! Templates for every gateway operation: tool choice, tool selection, goal
//! generation, critique and verification.

pub mod agent;

pub use agent::AgentPromptTemplate;
