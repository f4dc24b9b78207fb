//! Observable loop state.
//!
//! Control loops publish [`LoopEvent`]s here. Observers (console reporter,
//! transcript, a future UI) subscribe to the broadcast stream or read the
//! latest [`ModeSnapshot`] per mode.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use toolforge_domain::{AgentMode, AgentWorker, EnrichedResult, LoopPhase, ToolCall};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEvent {
    PhaseChanged {
        mode: AgentMode,
        phase: LoopPhase,
    },
    ToolsRetrieved {
        mode: AgentMode,
        names: Vec<String>,
    },
    ToolCallChosen {
        mode: AgentMode,
        call: ToolCall,
    },
    CritiqueApplied {
        mode: AgentMode,
        suggestion: String,
    },
    GoalGenerated {
        mode: AgentMode,
        goal: String,
    },
    ActionCompleted {
        mode: AgentMode,
        result: Box<EnrichedResult>,
    },
    BudgetReset {
        date: NaiveDate,
    },
    WorkerChanged {
        worker: AgentWorker,
    },
    Paused {
        mode: AgentMode,
        payload: Value,
    },
    Refused {
        mode: AgentMode,
        reason: String,
    },
    Notice {
        mode: AgentMode,
        message: String,
    },
}

impl LoopEvent {
    pub fn mode(&self) -> Option<AgentMode> {
        match self {
            LoopEvent::PhaseChanged { mode, .. }
            | LoopEvent::ToolsRetrieved { mode, .. }
            | LoopEvent::ToolCallChosen { mode, .. }
            | LoopEvent::CritiqueApplied { mode, .. }
            | LoopEvent::GoalGenerated { mode, .. }
            | LoopEvent::ActionCompleted { mode, .. }
            | LoopEvent::Paused { mode, .. }
            | LoopEvent::Refused { mode, .. }
            | LoopEvent::Notice { mode, .. } => Some(*mode),
            LoopEvent::BudgetReset { .. } => Some(AgentMode::Autonomous),
            LoopEvent::WorkerChanged { .. } => Some(AgentMode::Swarm),
        }
    }
}

/// Latest known state of one mode.
#[derive(Debug, Clone, Serialize)]
pub struct ModeSnapshot {
    pub phase: LoopPhase,
    pub goal: Option<String>,
    pub last_result: Option<EnrichedResult>,
    pub actions: usize,
    pub workers: Vec<AgentWorker>,
}

impl Default for ModeSnapshot {
    fn default() -> Self {
        Self {
            phase: LoopPhase::Idle,
            goal: None,
            last_result: None,
            actions: 0,
            workers: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct StateStore {
    sender: broadcast::Sender<LoopEvent>,
    snapshots: Arc<RwLock<HashMap<AgentMode, ModeSnapshot>>>,
}

impl StateStore {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            sender,
            snapshots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoopEvent> {
        self.sender.subscribe()
    }

    /// Fold the event into the snapshot, then notify subscribers.
    pub fn publish(&self, event: LoopEvent) {
        if let Some(mode) = event.mode() {
            let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
            let snapshot = snapshots.entry(mode).or_default();
            match &event {
                LoopEvent::PhaseChanged { phase, .. } => snapshot.phase = *phase,
                LoopEvent::GoalGenerated { goal, .. } => snapshot.goal = Some(goal.clone()),
                LoopEvent::ActionCompleted { result, .. } => {
                    snapshot.last_result = Some((**result).clone());
                    snapshot.actions += 1;
                }
                LoopEvent::Paused { .. } => snapshot.phase = LoopPhase::Paused,
                LoopEvent::WorkerChanged { worker } => {
                    match snapshot.workers.iter_mut().find(|w| w.id == worker.id) {
                        Some(existing) => *existing = worker.clone(),
                        None => snapshot.workers.push(worker.clone()),
                    }
                }
                _ => {}
            }
        }
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn set_phase(&self, mode: AgentMode, phase: LoopPhase) {
        self.publish(LoopEvent::PhaseChanged { mode, phase });
    }

    pub fn snapshot(&self, mode: AgentMode) -> ModeSnapshot {
        let snapshots = self.snapshots.read().unwrap_or_else(PoisonError::into_inner);
        snapshots.get(&mode).cloned().unwrap_or_default()
    }

    pub fn phase(&self, mode: AgentMode) -> LoopPhase {
        self.snapshot(mode).phase
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolforge_domain::WorkerStatus;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let store = StateStore::new();
        let mut rx = store.subscribe();
        store.set_phase(AgentMode::Command, LoopPhase::Thinking);

        match rx.recv().await.unwrap() {
            LoopEvent::PhaseChanged { mode, phase } => {
                assert_eq!(mode, AgentMode::Command);
                assert_eq!(phase, LoopPhase::Thinking);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_tracks_phase_and_workers() {
        let store = StateStore::new();
        assert_eq!(store.phase(AgentMode::Swarm), LoopPhase::Idle);

        let mut worker = AgentWorker::new("worker-1");
        store.publish(LoopEvent::WorkerChanged {
            worker: worker.clone(),
        });
        worker.status = WorkerStatus::Working;
        store.publish(LoopEvent::WorkerChanged { worker });
        store.set_phase(AgentMode::Swarm, LoopPhase::Executing);

        let snapshot = store.snapshot(AgentMode::Swarm);
        assert_eq!(snapshot.phase, LoopPhase::Executing);
        assert_eq!(snapshot.workers.len(), 1);
        assert_eq!(snapshot.workers[0].status, WorkerStatus::Working);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let store = StateStore::new();
        store.publish(LoopEvent::Notice {
            mode: AgentMode::Task,
            message: "nobody listening".to_string(),
        });
        assert_eq!(store.phase(AgentMode::Task), LoopPhase::Idle);
    }
}
