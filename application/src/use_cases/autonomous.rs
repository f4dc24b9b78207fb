//! Autonomous mode: self-directed cycles under a daily budget.
//!
//! ```text
//! Idle ─▶ CheckingBudget ─▶ GeneratingGoal ─▶ Thinking ─▶ Executing ─▶ Cooldown ─┐
//!  ▲          │ exhausted                                                        │
//!  │          ▼                                                                  │
//!  │        Halted                                                               │
//!  └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The daily budget resets on the first cycle of a new calendar date, which
//! also clears the goal history. Gateway failures, refusals and panicking
//! cycles are logged and do not count against the budget.
//!
//! Budget and history belong to the loop, not to a single [`run`], so a
//! stopped loop resumed later keeps spending the same daily allowance.
//!
//! [`run`]: AutonomousLoop::run

use super::context::{Decision, LoopContext};
use super::error::LoopError;
use super::shared::{check_cancelled, sleep_or_cancel};
use crate::config::AutonomousParams;
use crate::state_store::LoopEvent;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use toolforge_domain::well_known::is_no_action;
use toolforge_domain::{
    AgentMode, AgentPromptTemplate, BoundedHistory, EnrichedResult, LoopPhase, ResourceBudget,
};
use tracing::{info, warn};

const MODE: AgentMode = AgentMode::Autonomous;

/// What one cycle did.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Acted(EnrichedResult),
    /// Sentinel goal or no tool chosen
    NoAction,
    BudgetExhausted,
    /// Gateway failure, refusal or panicking cycle
    Failed(String),
}

/// Why [`AutonomousLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomousStop {
    Cancelled,
    BudgetExhausted,
    /// The requested number of cycles ran
    CycleLimit,
    /// The loop task itself died
    Aborted,
}

pub struct AutonomousLoop {
    ctx: LoopContext,
    params: AutonomousParams,
    budget: ResourceBudget,
    history: BoundedHistory,
    cancellation: Option<CancellationToken>,
}

impl AutonomousLoop {
    pub fn new(ctx: LoopContext) -> Self {
        let params = ctx.config.autonomous.clone();
        let budget = ResourceBudget::new(params.daily_limit, ctx.clock.today());
        let history = BoundedHistory::new(params.history_capacity);
        Self {
            ctx,
            params,
            budget,
            history,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Continue from a budget and history carried over from an earlier loop.
    pub fn with_state(mut self, budget: ResourceBudget, history: BoundedHistory) -> Self {
        self.budget = budget;
        self.history = history;
        self
    }

    pub fn budget(&self) -> &ResourceBudget {
        &self.budget
    }

    pub fn history(&self) -> &BoundedHistory {
        &self.history
    }

    /// Run one cycle. Only cancellation is returned as an error.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, LoopError> {
        check_cancelled(&self.cancellation)?;

        self.ctx.set_phase(MODE, LoopPhase::CheckingBudget);
        let today = self.ctx.clock.today();
        if self.budget.roll_over(today) {
            self.history.clear();
            info!(date = %today, "Daily budget reset");
            self.ctx.log("budget_reset", json!({"date": today}));
            self.ctx.events.publish(LoopEvent::BudgetReset { date: today });
        }
        if self.budget.is_exhausted() {
            info!(count = self.budget.count, limit = self.budget.limit, "Daily budget exhausted");
            return Ok(CycleOutcome::BudgetExhausted);
        }

        self.ctx.set_phase(MODE, LoopPhase::GeneratingGoal);
        let history = self.history.to_vec();
        let goal = match self
            .ctx
            .runtime
            .gateway
            .generate_goal(&history, self.budget.remaining())
            .await
        {
            Ok(goal) => goal,
            Err(e) => {
                warn!(error = %e, "Goal generation failed");
                return Ok(CycleOutcome::Failed(e.to_string()));
            }
        };
        self.ctx.log("goal", json!({"mode": MODE, "goal": goal}));
        self.ctx.events.publish(LoopEvent::GoalGenerated {
            mode: MODE,
            goal: goal.clone(),
        });
        if is_no_action(&goal) {
            info!("Nothing to do this cycle");
            return Ok(CycleOutcome::NoAction);
        }

        let request = AgentPromptTemplate::step_request(&goal, &history);
        let ctx = self.ctx.clone();
        let cycle_goal = goal.clone();
        // Spawned so a panicking cycle surfaces as a JoinError
        let handle = tokio::spawn(async move {
            match ctx.decide(MODE, &request, &cycle_goal).await {
                Ok(Decision::Call { call, .. }) => {
                    CycleOutcome::Acted(ctx.execute(MODE, &call).await)
                }
                Ok(Decision::NoCall { .. }) => CycleOutcome::NoAction,
                Ok(Decision::Refused(reason)) => CycleOutcome::Failed(reason),
                Err(e) => {
                    warn!(error = %e, goal = %cycle_goal, "Cycle failed");
                    CycleOutcome::Failed(e.to_string())
                }
            }
        });

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, goal = %goal, "Cycle aborted");
                CycleOutcome::Failed(format!("cycle aborted: {}", e))
            }
        };
        if let CycleOutcome::Acted(result) = &outcome {
            self.history.push(result.clone());
            self.budget.record_action();
        }
        Ok(outcome)
    }

    /// Cycle with a cooldown between cycles until cancelled, out of budget
    /// or `max_cycles` cycles have run.
    pub async fn run(&mut self, max_cycles: Option<usize>) -> AutonomousStop {
        let token = self.cancellation.clone().unwrap_or_default();
        let mut cycles = 0;

        let stop = loop {
            if token.is_cancelled() {
                break AutonomousStop::Cancelled;
            }
            if max_cycles.is_some_and(|max| cycles >= max) {
                break AutonomousStop::CycleLimit;
            }
            match self.run_cycle().await {
                Err(_) => break AutonomousStop::Cancelled,
                Ok(CycleOutcome::BudgetExhausted) => break AutonomousStop::BudgetExhausted,
                Ok(_) => {}
            }
            cycles += 1;
            if max_cycles.is_some_and(|max| cycles >= max) {
                break AutonomousStop::CycleLimit;
            }

            self.ctx.set_phase(MODE, LoopPhase::Cooldown);
            if !sleep_or_cancel(self.params.cooldown, &token).await {
                break AutonomousStop::Cancelled;
            }
        };

        let phase = match stop {
            AutonomousStop::Cancelled => LoopPhase::Cancelled,
            AutonomousStop::BudgetExhausted | AutonomousStop::Aborted => LoopPhase::Halted,
            AutonomousStop::CycleLimit => LoopPhase::Idle,
        };
        info!(?stop, cycles, actions = self.budget.count, "Autonomous loop stopped");
        self.ctx.set_phase(MODE, phase);
        stop
    }
}
