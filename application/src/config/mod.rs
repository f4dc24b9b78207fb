//! Application-level configuration.
//!
//! - [`RuntimeConfig`]: parameters for retrieval, every control loop and the sandbox

pub mod loop_params;

pub use loop_params::{
    AutonomousParams, RetrievalKind, RetrievalParams, RuntimeConfig, SandboxParams, SwarmParams,
    TaskParams,
};
