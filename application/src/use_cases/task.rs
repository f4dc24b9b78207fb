//! Task mode: work a user goal until "Task Complete" succeeds.
//!
//! `Idle → Running → (Completed | Halted | Cancelled)`. Each run starts with
//! an empty history; there is no daily budget, only an iteration cap.

use super::context::{Decision, LoopContext};
use super::error::LoopError;
use super::shared::check_cancelled;
use crate::config::TaskParams;
use crate::state_store::LoopEvent;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use toolforge_domain::well_known::TASK_COMPLETE;
use toolforge_domain::{AgentMode, AgentPromptTemplate, BoundedHistory, EnrichedResult, LoopPhase};
use tracing::info;

const MODE: AgentMode = AgentMode::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStop {
    Completed,
    IterationCap,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct TaskReport {
    pub goal: String,
    pub stop: TaskStop,
    pub iterations: usize,
    /// Recent results, newest first
    pub history: Vec<EnrichedResult>,
}

impl TaskReport {
    pub fn is_completed(&self) -> bool {
        self.stop == TaskStop::Completed
    }

    /// The successful "Task Complete" result, when there is one.
    pub fn completion(&self) -> Option<&EnrichedResult> {
        if !self.is_completed() {
            return None;
        }
        self.history.first()
    }
}

pub struct TaskLoop {
    ctx: LoopContext,
    params: TaskParams,
    cancellation: Option<CancellationToken>,
}

impl TaskLoop {
    pub fn new(ctx: LoopContext) -> Self {
        let params = ctx.config.task.clone();
        Self {
            ctx,
            params,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.params.max_iterations = max;
        self
    }

    /// Run `goal` to completion, the iteration cap, or cancellation.
    ///
    /// Gateway errors and refusals stop the task and are returned.
    pub async fn run(&self, goal: &str) -> Result<TaskReport, LoopError> {
        let mut history = BoundedHistory::new(self.params.history_capacity);
        self.ctx.log("goal", json!({"mode": MODE, "goal": goal}));
        self.ctx.events.publish(LoopEvent::GoalGenerated {
            mode: MODE,
            goal: goal.to_string(),
        });

        let mut iterations = 0;
        let stop = loop {
            if check_cancelled(&self.cancellation).is_err() {
                break TaskStop::Cancelled;
            }
            if iterations >= self.params.max_iterations {
                break TaskStop::IterationCap;
            }
            iterations += 1;

            let request = AgentPromptTemplate::step_request(goal, &history.to_vec());
            let decision = match self.ctx.decide(MODE, &request, goal).await {
                Ok(decision) => decision,
                Err(e) => {
                    self.ctx.set_phase(MODE, LoopPhase::Halted);
                    return Err(e.into());
                }
            };
            let call = match decision {
                Decision::Call { call, .. } => call,
                Decision::NoCall { .. } => continue,
                Decision::Refused(reason) => {
                    self.ctx.set_phase(MODE, LoopPhase::Halted);
                    return Err(LoopError::Refused(reason));
                }
            };

            let result = self.ctx.execute(MODE, &call).await;
            let completed = call.name == TASK_COMPLETE && result.is_success();
            history.push(result);
            if completed {
                break TaskStop::Completed;
            }
        };

        let phase = match stop {
            TaskStop::Completed => LoopPhase::Completed,
            TaskStop::IterationCap => LoopPhase::Halted,
            TaskStop::Cancelled => LoopPhase::Cancelled,
        };
        info!(goal = %goal, ?stop, iterations, "Task finished");
        self.ctx.set_phase(MODE, phase);

        Ok(TaskReport {
            goal: goal.to_string(),
            stop,
            iterations,
            history: history.to_vec(),
        })
    }
}
