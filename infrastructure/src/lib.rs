//! Infrastructure layer for toolforge
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the Lua execution sandbox, the HTTP model
//! gateway, the hashing embedder, the JSON tool store, the JSONL
//! transcript and configuration file loading.

pub mod config;
pub mod embedding;
pub mod gateway;
pub mod logging;
pub mod sandbox;
pub mod storage;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig};
pub use embedding::HashingEmbedder;
pub use gateway::OpenAiGateway;
pub use logging::JsonlTranscript;
pub use sandbox::LuaSandbox;
pub use storage::{JsonToolStore, default_document, default_tools};
