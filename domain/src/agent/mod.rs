//! Agent domain module
//!
//! State owned by the control loops: operating modes and phases, the daily
//! [`ResourceBudget`], the [`BoundedHistory`] used for self-correction and
//! the swarm [`WorkerPool`]. None of it is shared across loop instances.

pub mod budget;
pub mod entities;
pub mod history;
pub mod validation;
pub mod worker;

pub use budget::ResourceBudget;
pub use entities::{AgentMode, LoopPhase};
pub use history::{BoundedHistory, DEFAULT_HISTORY_CAPACITY};
pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
pub use worker::{AgentWorker, WorkerPool, WorkerStatus};
