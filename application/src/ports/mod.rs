//! Port definitions
//!
//! Interfaces the application layer needs from the outside world. Adapters
//! live in the infrastructure and presentation layers.

pub mod ai_gateway;
pub mod approval;
pub mod clock;
pub mod conversation_logger;
pub mod domain_namespace;
pub mod embedding;
pub mod sandbox;
pub mod tool_store;
