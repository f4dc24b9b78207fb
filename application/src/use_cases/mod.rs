//! Use cases
//!
//! The five control loops, the self-improvement protocol and the scheduler
//! that runs background loops. All of them share the cycle in [`context`].

pub mod assist;
pub mod autonomous;
pub mod command;
pub mod context;
pub mod error;
pub mod scheduler;
pub mod self_improve;
pub(crate) mod shared;
pub mod swarm;
pub mod task;

pub use assist::{AssistLoop, AssistOutcome};
pub use autonomous::{AutonomousLoop, AutonomousStop, CycleOutcome};
pub use command::{CommandLoop, CommandOutcome};
pub use context::{Decision, LoopContext};
pub use error::LoopError;
pub use scheduler::{LoopScheduler, SchedulerHandle, SchedulerStatus};
pub use self_improve::{ImprovementReport, ImprovementStage, SelfImprovement};
pub use swarm::{SwarmLoop, SwarmStop};
pub use task::{TaskLoop, TaskReport, TaskStop};
