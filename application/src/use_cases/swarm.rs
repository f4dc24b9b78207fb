//! Swarm mode: a pool of workers sharing one goal and one history.
//!
//! One worker is serviced per cycle. A worker whose cycle raises (the tool
//! implementation raised, the gateway failed or the cycle panicked) is
//! terminated and an idle replacement is appended, so the goal is retried
//! by a fresh worker. A refusal ends the swarm; it is never retried.
//! A "Request Human Input" result pauses the swarm with
//! its payload; [`SwarmLoop::resume`] records the answer and the next
//! [`SwarmLoop::run`] continues from the retained state.

use super::context::{Decision, LoopContext};
use super::error::LoopError;
use super::shared::sleep_or_cancel;
use crate::config::SwarmParams;
use crate::ports::ai_gateway::GatewayError;
use crate::state_store::LoopEvent;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use toolforge_domain::well_known::{REQUEST_HUMAN_INPUT, TASK_COMPLETE};
use toolforge_domain::{
    AgentMode, AgentPromptTemplate, EnrichedResult, LoopPhase, ToolCall, WorkerPool,
};
use tracing::{debug, info, warn};

const MODE: AgentMode = AgentMode::Swarm;

/// Number of shared history entries shown to a worker.
const PROMPT_HISTORY: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum SwarmStop {
    /// "Task Complete" succeeded
    Completed(EnrichedResult),
    IterationCap,
    Cancelled,
    /// The model declined the goal
    Refused(String),
    /// Waiting for a human answer; carries the tool's payload
    Paused(Value),
}

/// How a single worker cycle ended.
enum WorkerOutcome {
    Executed(EnrichedResult),
    Idle,
    Refused(String),
    Gateway(GatewayError),
}

pub struct SwarmLoop {
    ctx: LoopContext,
    params: SwarmParams,
    goal: String,
    pool: WorkerPool,
    history: Vec<EnrichedResult>,
    iterations: usize,
    paused: Option<Value>,
    cancellation: Option<CancellationToken>,
}

impl SwarmLoop {
    pub fn new(ctx: LoopContext, goal: impl Into<String>) -> Self {
        let params = ctx.config.swarm.clone();
        let pool = WorkerPool::new(params.workers.max(1));
        Self {
            ctx,
            params,
            goal: goal.into(),
            pool,
            history: Vec::new(),
            iterations: 0,
            paused: None,
            cancellation: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.params.workers = workers.max(1);
        self.pool = WorkerPool::new(self.params.workers);
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.params.max_iterations = max;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Shared history, oldest first.
    pub fn history(&self) -> &[EnrichedResult] {
        &self.history
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn paused_payload(&self) -> Option<&Value> {
        self.paused.as_ref()
    }

    /// Record the human answer to a pause so the next run continues.
    pub fn resume(&mut self, input: &str) -> Result<(), LoopError> {
        let Some(payload) = self.paused.take() else {
            return Err(LoopError::NotResumable(MODE));
        };
        let call = ToolCall::new(REQUEST_HUMAN_INPUT).with_arg("response", input);
        let tool = self.ctx.runtime.registry.get(REQUEST_HUMAN_INPUT);
        let result = EnrichedResult {
            tool_call: call,
            tool,
            execution_result: Some(json!({"status": "answered", "prompt": payload.get("prompt"), "response": input})),
            execution_error: None,
            timestamp: chrono::Utc::now(),
        };
        info!(goal = %self.goal, "Swarm resumed with human input");
        self.ctx.log("human_input", json!({"mode": MODE, "response": input}));
        self.ctx.runtime.registry.record(&result);
        self.history.push(result);
        self.ctx.set_phase(MODE, LoopPhase::Idle);
        Ok(())
    }

    /// Service workers until the goal completes or is refused, the swarm
    /// pauses, the iteration cap is reached or the loop is cancelled.
    pub async fn run(&mut self) -> SwarmStop {
        if let Some(payload) = &self.paused {
            return SwarmStop::Paused(payload.clone());
        }
        let token = self.cancellation.clone().unwrap_or_default();
        for worker in self.pool.workers() {
            self.ctx.events.publish(LoopEvent::WorkerChanged {
                worker: worker.clone(),
            });
        }

        let stop = loop {
            if token.is_cancelled() {
                break SwarmStop::Cancelled;
            }
            if self.iterations >= self.params.max_iterations {
                break SwarmStop::IterationCap;
            }
            let Some(index) = self.pool.next_available() else {
                debug!("No worker available, deferring");
                if !sleep_or_cancel(self.params.poll_delay, &token).await {
                    break SwarmStop::Cancelled;
                }
                continue;
            };
            self.iterations += 1;
            if let Some(stop) = self.service(index).await {
                break stop;
            }
        };

        let phase = match &stop {
            SwarmStop::Completed(_) => LoopPhase::Completed,
            SwarmStop::IterationCap | SwarmStop::Refused(_) => LoopPhase::Halted,
            SwarmStop::Cancelled => LoopPhase::Cancelled,
            SwarmStop::Paused(payload) => {
                self.paused = Some(payload.clone());
                self.ctx.log("swarm_paused", json!({"payload": payload}));
                self.ctx.events.publish(LoopEvent::Paused {
                    mode: MODE,
                    payload: payload.clone(),
                });
                LoopPhase::Paused
            }
        };
        info!(goal = %self.goal, iterations = self.iterations, workers = self.pool.len(), "Swarm stopped");
        self.ctx.set_phase(MODE, phase);
        stop
    }

    /// Run one worker cycle and fold its outcome into the pool.
    async fn service(&mut self, index: usize) -> Option<SwarmStop> {
        self.pool.begin(index, self.goal.clone());
        self.publish_worker(index);

        let recent: Vec<EnrichedResult> = self
            .history
            .iter()
            .rev()
            .take(PROMPT_HISTORY)
            .cloned()
            .collect();
        let request = AgentPromptTemplate::step_request(&self.goal, &recent);
        let goal = self.goal.clone();
        let ctx = self.ctx.clone();

        // Spawned so a panicking cycle surfaces as a JoinError instead of
        // unwinding through the loop.
        let handle = tokio::spawn(async move {
            match ctx.decide(MODE, &request, &goal).await {
                Ok(Decision::Call { call, .. }) => {
                    WorkerOutcome::Executed(ctx.execute(MODE, &call).await)
                }
                Ok(Decision::NoCall { .. }) => WorkerOutcome::Idle,
                Ok(Decision::Refused(reason)) => WorkerOutcome::Refused(reason),
                Err(e) => WorkerOutcome::Gateway(e),
            }
        });

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.replace(index, format!("worker cycle aborted: {}", e));
                return None;
            }
        };

        match outcome {
            WorkerOutcome::Executed(result) => {
                self.history.push(result.clone());
                match result.execution_error.clone() {
                    None => {
                        self.pool.succeed(index, result.execution_result.clone());
                        self.publish_worker(index);
                        if result.is_awaiting_input() {
                            return result.execution_result.clone().map(SwarmStop::Paused);
                        }
                        if result.tool_name() == TASK_COMPLETE {
                            return Some(SwarmStop::Completed(result));
                        }
                    }
                    Some(err) if err.is_raised() => self.replace(index, err.to_string()),
                    Some(err) => {
                        self.pool.fail(index, err.to_string());
                        self.publish_worker(index);
                    }
                }
            }
            WorkerOutcome::Idle => {
                self.pool.succeed(index, None);
                self.publish_worker(index);
            }
            WorkerOutcome::Refused(reason) => {
                self.pool.fail(index, format!("refused: {}", reason));
                self.publish_worker(index);
                return Some(SwarmStop::Refused(reason));
            }
            WorkerOutcome::Gateway(e) => self.replace(index, e.to_string()),
        }
        None
    }

    fn replace(&mut self, index: usize, error: String) {
        warn!(worker = index, error = %error, "Worker terminated");
        let replacement = self.pool.terminate_and_replace(index, error.clone());
        self.ctx.log(
            "worker_replaced",
            json!({"terminated": self.pool.get(index).map(|w| &w.id), "replacement": self.pool.get(replacement).map(|w| &w.id), "error": error}),
        );
        self.publish_worker(index);
        self.publish_worker(replacement);
    }

    fn publish_worker(&self, index: usize) {
        if let Some(worker) = self.pool.get(index) {
            self.ctx.events.publish(LoopEvent::WorkerChanged {
                worker: worker.clone(),
            });
        }
    }
}
