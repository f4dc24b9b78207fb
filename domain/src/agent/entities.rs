//! Operating modes and control-loop phases

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The five operating modes of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// One request, one cycle
    Command,
    /// Propose, then wait for approval
    Assist,
    /// Self-directed cycles under a daily budget
    Autonomous,
    /// Repeated cycles against one fixed task
    Task,
    /// Worker pool sharing one goal
    Swarm,
}

impl AgentMode {
    pub const ALL: [AgentMode; 5] = [
        AgentMode::Command,
        AgentMode::Assist,
        AgentMode::Autonomous,
        AgentMode::Task,
        AgentMode::Swarm,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            AgentMode::Command => "command",
            AgentMode::Assist => "assist",
            AgentMode::Autonomous => "autonomous",
            AgentMode::Task => "task",
            AgentMode::Swarm => "swarm",
        }
    }
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown mode '{}'", s)))
    }
}

/// Phase of a control loop, published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Idle,
    /// Assist: a call is held waiting for approve/reject
    Proposed,
    CheckingBudget,
    GeneratingGoal,
    /// Retrieving tools and asking the gateway for a call
    Thinking,
    /// Critique gate for tool-mutating calls
    Critiquing,
    Executing,
    Cooldown,
    Completed,
    Cancelled,
    /// Swarm halted on an awaiting-input result
    Paused,
    /// Stopped by budget exhaustion or an iteration cap
    Halted,
}

impl LoopPhase {
    pub fn as_str(&self) -> &str {
        match self {
            LoopPhase::Idle => "idle",
            LoopPhase::Proposed => "proposed",
            LoopPhase::CheckingBudget => "checking_budget",
            LoopPhase::GeneratingGoal => "generating_goal",
            LoopPhase::Thinking => "thinking",
            LoopPhase::Critiquing => "critiquing",
            LoopPhase::Executing => "executing",
            LoopPhase::Cooldown => "cooldown",
            LoopPhase::Completed => "completed",
            LoopPhase::Cancelled => "cancelled",
            LoopPhase::Paused => "paused",
            LoopPhase::Halted => "halted",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            LoopPhase::Idle => "Idle",
            LoopPhase::Proposed => "Proposed",
            LoopPhase::CheckingBudget => "Checking Budget",
            LoopPhase::GeneratingGoal => "Generating Goal",
            LoopPhase::Thinking => "Thinking",
            LoopPhase::Critiquing => "Critiquing",
            LoopPhase::Executing => "Executing",
            LoopPhase::Cooldown => "Cooldown",
            LoopPhase::Completed => "Completed",
            LoopPhase::Cancelled => "Cancelled",
            LoopPhase::Paused => "Paused",
            LoopPhase::Halted => "Halted",
        }
    }

    /// Phases after which the loop does not advance without outside input.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoopPhase::Completed | LoopPhase::Cancelled | LoopPhase::Paused | LoopPhase::Halted
        )
    }
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip_names() {
        for mode in AgentMode::ALL {
            assert_eq!(mode.as_str().parse::<AgentMode>().unwrap(), mode);
        }
        assert_eq!("SWARM".parse::<AgentMode>().unwrap(), AgentMode::Swarm);
        assert!("chat".parse::<AgentMode>().is_err());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(LoopPhase::Paused.is_terminal());
        assert!(LoopPhase::Halted.is_terminal());
        assert!(!LoopPhase::Cooldown.is_terminal());
        assert!(!LoopPhase::Idle.is_terminal());
    }
}
