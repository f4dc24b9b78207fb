//! Background loop scheduler.
//!
//! A single actor task owns the background Autonomous and Swarm loops.
//! Callers talk to it through a [`SchedulerHandle`]: every request is an
//! mpsc message carrying a oneshot reply. Stopping a loop cancels its
//! [`CancellationToken`]; the loop notices at its next check and reports
//! back through the completion channel.
//!
//! A paused swarm is parked inside the actor until it is resumed or
//! stopped. The autonomous loop is kept between runs so its daily budget
//! and history carry over a stop and restart. If its task dies, the loop
//! is rebuilt from the budget and history it started that run with.

use super::autonomous::{AutonomousLoop, AutonomousStop};
use super::context::LoopContext;
use super::error::LoopError;
use super::swarm::{SwarmLoop, SwarmStop};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toolforge_domain::{AgentMode, BoundedHistory, LoopPhase, ResourceBudget};
use tracing::{debug, info, warn};

const COMMAND_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SchedulerStatus {
    pub autonomous_running: bool,
    pub swarm_running: bool,
    pub swarm_paused: bool,
}

type Reply<T> = oneshot::Sender<T>;

enum SchedulerCommand {
    StartAutonomous {
        max_cycles: Option<usize>,
        reply: Reply<Result<(), LoopError>>,
    },
    StopAutonomous {
        reply: Reply<()>,
    },
    WaitAutonomous {
        reply: Reply<Option<AutonomousStop>>,
    },
    StartSwarm {
        goal: String,
        workers: Option<usize>,
        reply: Reply<Result<(), LoopError>>,
    },
    StopSwarm {
        reply: Reply<()>,
    },
    ResumeSwarm {
        input: String,
        reply: Reply<Result<(), LoopError>>,
    },
    WaitSwarm {
        reply: Reply<Option<SwarmStop>>,
    },
    Status {
        reply: Reply<SchedulerStatus>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

enum Completion {
    /// `None` when the loop task died and took the loop with it
    Autonomous(Option<Box<AutonomousLoop>>, AutonomousStop),
    Swarm(Box<SwarmLoop>, SwarmStop),
}

/// A loop running in the background.
struct Running<T> {
    token: CancellationToken,
    waiters: Vec<Reply<Option<T>>>,
}

impl<T> Running<T> {
    fn new(token: CancellationToken) -> Self {
        Self {
            token,
            waiters: Vec::new(),
        }
    }
}

/// Cloneable client for the scheduler actor.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Start the autonomous loop. `max_cycles` of `None` runs until stopped
    /// or out of budget.
    pub async fn start_autonomous(&self, max_cycles: Option<usize>) -> Result<(), LoopError> {
        self.request(|reply| SchedulerCommand::StartAutonomous { max_cycles, reply })
            .await?
    }

    pub async fn stop_autonomous(&self) -> Result<(), LoopError> {
        self.request(|reply| SchedulerCommand::StopAutonomous { reply }).await
    }

    /// Wait for the autonomous loop to stop. Returns the last stop reason
    /// immediately when it is not running.
    pub async fn wait_autonomous(&self) -> Result<Option<AutonomousStop>, LoopError> {
        self.request(|reply| SchedulerCommand::WaitAutonomous { reply }).await
    }

    pub async fn start_swarm(
        &self,
        goal: impl Into<String>,
        workers: Option<usize>,
    ) -> Result<(), LoopError> {
        let goal = goal.into();
        self.request(|reply| SchedulerCommand::StartSwarm {
            goal,
            workers,
            reply,
        })
        .await?
    }

    /// Stop a running swarm, or discard a paused one.
    pub async fn stop_swarm(&self) -> Result<(), LoopError> {
        self.request(|reply| SchedulerCommand::StopSwarm { reply }).await
    }

    /// Answer a paused swarm and continue it in the background.
    pub async fn resume_swarm(&self, input: impl Into<String>) -> Result<(), LoopError> {
        let input = input.into();
        self.request(|reply| SchedulerCommand::ResumeSwarm { input, reply })
            .await?
    }

    pub async fn wait_swarm(&self) -> Result<Option<SwarmStop>, LoopError> {
        self.request(|reply| SchedulerCommand::WaitSwarm { reply }).await
    }

    pub async fn status(&self) -> Result<SchedulerStatus, LoopError> {
        self.request(|reply| SchedulerCommand::Status { reply }).await
    }

    /// Cancel every loop and stop the actor.
    pub async fn shutdown(&self) -> Result<(), LoopError> {
        self.request(|reply| SchedulerCommand::Shutdown { reply }).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SchedulerCommand,
    ) -> Result<T, LoopError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| LoopError::SchedulerClosed)?;
        response.await.map_err(|_| LoopError::SchedulerClosed)
    }
}

pub struct LoopScheduler {
    ctx: LoopContext,
    commands: mpsc::Receiver<SchedulerCommand>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    autonomous: Option<Running<AutonomousStop>>,
    idle_autonomous: Option<Box<AutonomousLoop>>,
    /// Budget and history at the start of the current autonomous run
    autonomous_checkpoint: Option<(ResourceBudget, BoundedHistory)>,
    last_autonomous: Option<AutonomousStop>,
    swarm: Option<Running<SwarmStop>>,
    paused_swarm: Option<Box<SwarmLoop>>,
    last_swarm: Option<SwarmStop>,
}

impl LoopScheduler {
    /// Spawn the actor and return a handle to it.
    pub fn spawn(ctx: LoopContext) -> (SchedulerHandle, JoinHandle<()>) {
        let (sender, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let scheduler = Self {
            ctx,
            commands,
            completions_tx,
            completions,
            autonomous: None,
            idle_autonomous: None,
            autonomous_checkpoint: None,
            last_autonomous: None,
            swarm: None,
            paused_swarm: None,
            last_swarm: None,
        };
        let join = tokio::spawn(scheduler.run());
        (SchedulerHandle { sender }, join)
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        self.cancel_all();
                        break;
                    };
                    if !self.handle(command) {
                        break;
                    }
                }
                Some(completion) = self.completions.recv() => self.complete(completion),
            }
        }
        debug!("Loop scheduler stopped");
    }

    /// Returns `false` when the actor should exit.
    fn handle(&mut self, command: SchedulerCommand) -> bool {
        match command {
            SchedulerCommand::StartAutonomous { max_cycles, reply } => {
                let _ = reply.send(self.start_autonomous(max_cycles));
            }
            SchedulerCommand::StopAutonomous { reply } => {
                if let Some(running) = &self.autonomous {
                    running.token.cancel();
                }
                let _ = reply.send(());
            }
            SchedulerCommand::WaitAutonomous { reply } => match &mut self.autonomous {
                Some(running) => running.waiters.push(reply),
                None => {
                    let _ = reply.send(self.last_autonomous);
                }
            },
            SchedulerCommand::StartSwarm {
                goal,
                workers,
                reply,
            } => {
                let _ = reply.send(self.start_swarm(goal, workers));
            }
            SchedulerCommand::StopSwarm { reply } => {
                if let Some(running) = &self.swarm {
                    running.token.cancel();
                }
                if self.paused_swarm.take().is_some() {
                    self.last_swarm = Some(SwarmStop::Cancelled);
                }
                let _ = reply.send(());
            }
            SchedulerCommand::ResumeSwarm { input, reply } => {
                let _ = reply.send(self.resume_swarm(&input));
            }
            SchedulerCommand::WaitSwarm { reply } => match &mut self.swarm {
                Some(running) => running.waiters.push(reply),
                None => {
                    let _ = reply.send(self.last_swarm.clone());
                }
            },
            SchedulerCommand::Status { reply } => {
                let _ = reply.send(SchedulerStatus {
                    autonomous_running: self.autonomous.is_some(),
                    swarm_running: self.swarm.is_some(),
                    swarm_paused: self.paused_swarm.is_some(),
                });
            }
            SchedulerCommand::Shutdown { reply } => {
                self.cancel_all();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn start_autonomous(&mut self, max_cycles: Option<usize>) -> Result<(), LoopError> {
        if self.autonomous.is_some() {
            return Err(LoopError::AlreadyRunning(AgentMode::Autonomous));
        }
        let token = CancellationToken::new();
        let autonomous = match self.idle_autonomous.take() {
            Some(autonomous) => *autonomous,
            None => AutonomousLoop::new(self.ctx.clone()),
        };
        self.autonomous_checkpoint =
            Some((autonomous.budget().clone(), autonomous.history().clone()));
        let mut autonomous = Box::new(autonomous.with_cancellation(token.clone()));
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let task = tokio::spawn(async move {
                let stop = autonomous.run(max_cycles).await;
                (autonomous, stop)
            });
            let completion = match task.await {
                Ok((autonomous, stop)) => Completion::Autonomous(Some(autonomous), stop),
                Err(e) => {
                    warn!(error = %e, "Autonomous loop task died");
                    Completion::Autonomous(None, AutonomousStop::Aborted)
                }
            };
            let _ = completions.send(completion);
        });
        info!(?max_cycles, "Autonomous loop started");
        self.autonomous = Some(Running::new(token));
        Ok(())
    }

    fn start_swarm(&mut self, goal: String, workers: Option<usize>) -> Result<(), LoopError> {
        if self.swarm.is_some() || self.paused_swarm.is_some() {
            return Err(LoopError::AlreadyRunning(AgentMode::Swarm));
        }
        let mut swarm = SwarmLoop::new(self.ctx.clone(), goal);
        if let Some(workers) = workers {
            swarm = swarm.with_workers(workers);
        }
        info!(goal = %swarm.goal(), workers = swarm.pool().len(), "Swarm started");
        self.launch_swarm(Box::new(swarm));
        Ok(())
    }

    fn resume_swarm(&mut self, input: &str) -> Result<(), LoopError> {
        let Some(mut swarm) = self.paused_swarm.take() else {
            return Err(LoopError::NotResumable(AgentMode::Swarm));
        };
        swarm.resume(input)?;
        self.launch_swarm(swarm);
        Ok(())
    }

    fn launch_swarm(&mut self, swarm: Box<SwarmLoop>) {
        let token = CancellationToken::new();
        let mut swarm = Box::new((*swarm).with_cancellation(token.clone()));
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let stop = swarm.run().await;
            let _ = completions.send(Completion::Swarm(swarm, stop));
        });
        self.swarm = Some(Running::new(token));
    }

    fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::Autonomous(autonomous, stop) => {
                debug!(?stop, "Autonomous loop finished");
                let checkpoint = self.autonomous_checkpoint.take();
                self.idle_autonomous = match (autonomous, checkpoint) {
                    (Some(autonomous), _) => Some(autonomous),
                    (None, Some((budget, history))) => {
                        self.ctx.set_phase(AgentMode::Autonomous, LoopPhase::Halted);
                        Some(Box::new(
                            AutonomousLoop::new(self.ctx.clone()).with_state(budget, history),
                        ))
                    }
                    (None, None) => None,
                };
                self.last_autonomous = Some(stop);
                if let Some(running) = self.autonomous.take() {
                    for waiter in running.waiters {
                        let _ = waiter.send(Some(stop));
                    }
                }
            }
            Completion::Swarm(swarm, stop) => {
                debug!(?stop, "Swarm finished");
                if matches!(stop, SwarmStop::Paused(_)) {
                    self.paused_swarm = Some(swarm);
                }
                self.last_swarm = Some(stop.clone());
                if let Some(running) = self.swarm.take() {
                    for waiter in running.waiters {
                        let _ = waiter.send(Some(stop.clone()));
                    }
                }
            }
        }
    }

    fn cancel_all(&mut self) {
        if let Some(running) = &self.autonomous {
            running.token.cancel();
        }
        if let Some(running) = &self.swarm {
            running.token.cancel();
        }
        self.paused_swarm = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AutonomousParams, RuntimeConfig};
    use crate::test_support::{FixedClock, MockGateway, Script, ScriptedSandbox, mock_context};
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use toolforge_domain::ToolCall;
    use toolforge_domain::well_known::{ECHO, REQUEST_HUMAN_INPUT, TASK_COMPLETE};

    #[tokio::test(start_paused = true)]
    async fn test_autonomous_runs_in_background() {
        let (ctx, _gateway) = mock_context(
            ScriptedSandbox::echo(),
            MockGateway::new()
                .repeating_goal("say hello")
                .repeating_call(ToolCall::new(ECHO)),
        );
        let registry = ctx.runtime().registry().clone();
        let (scheduler, _join) = LoopScheduler::spawn(ctx);

        scheduler.start_autonomous(Some(2)).await.unwrap();
        assert!(matches!(
            scheduler.start_autonomous(None).await,
            Err(LoopError::AlreadyRunning(AgentMode::Autonomous))
        ));

        let stop = scheduler.wait_autonomous().await.unwrap();
        assert_eq!(stop, Some(AutonomousStop::CycleLimit));
        assert_eq!(registry.activity().len(), 2);
        assert!(!scheduler.status().await.unwrap().autonomous_running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_autonomous() {
        let (ctx, _gateway) = mock_context(
            ScriptedSandbox::echo(),
            MockGateway::new()
                .repeating_goal("say hello")
                .repeating_call(ToolCall::new(ECHO)),
        );
        let (scheduler, _join) = LoopScheduler::spawn(ctx);

        scheduler.start_autonomous(None).await.unwrap();
        assert!(scheduler.status().await.unwrap().autonomous_running);
        scheduler.stop_autonomous().await.unwrap();

        assert_eq!(
            scheduler.wait_autonomous().await.unwrap(),
            Some(AutonomousStop::Cancelled)
        );
    }

    fn limited_context(sandbox: ScriptedSandbox, daily_limit: i64) -> (LoopContext, Arc<MockGateway>) {
        let (ctx, gateway) = mock_context(
            sandbox,
            MockGateway::new()
                .repeating_goal("say hello")
                .repeating_call(ToolCall::new(ECHO)),
        );
        let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        let config = RuntimeConfig::default().with_autonomous(
            AutonomousParams::default()
                .with_daily_limit(daily_limit)
                .with_cooldown(Duration::from_secs(30)),
        );
        (ctx.with_clock(clock).with_config(config), gateway)
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_daily_budget() {
        let (ctx, gateway) = limited_context(ScriptedSandbox::echo(), 2);
        let registry = ctx.runtime().registry().clone();
        let (scheduler, _join) = LoopScheduler::spawn(ctx);

        scheduler.start_autonomous(None).await.unwrap();
        assert_eq!(
            scheduler.wait_autonomous().await.unwrap(),
            Some(AutonomousStop::BudgetExhausted)
        );

        scheduler.start_autonomous(None).await.unwrap();
        assert_eq!(
            scheduler.wait_autonomous().await.unwrap(),
            Some(AutonomousStop::BudgetExhausted)
        );
        assert_eq!(gateway.calls_to("generate_response"), 2);
        assert_eq!(registry.activity().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_and_restart_continues_counting() {
        let (ctx, gateway) = limited_context(ScriptedSandbox::echo(), 3);
        let (scheduler, _join) = LoopScheduler::spawn(ctx);

        scheduler.start_autonomous(Some(2)).await.unwrap();
        assert_eq!(
            scheduler.wait_autonomous().await.unwrap(),
            Some(AutonomousStop::CycleLimit)
        );

        scheduler.start_autonomous(None).await.unwrap();
        assert_eq!(
            scheduler.wait_autonomous().await.unwrap(),
            Some(AutonomousStop::BudgetExhausted)
        );
        assert_eq!(gateway.calls_to("generate_response"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_autonomous_cycle_does_not_wedge_scheduler() {
        let (ctx, _gateway) = limited_context(ScriptedSandbox::with_fallback(Script::Panic), 5);
        let (scheduler, _join) = LoopScheduler::spawn(ctx);

        scheduler.start_autonomous(Some(1)).await.unwrap();
        let stop = tokio::time::timeout(Duration::from_secs(3600), scheduler.wait_autonomous())
            .await
            .expect("wait_autonomous hung")
            .unwrap();

        assert_eq!(stop, Some(AutonomousStop::CycleLimit));
        assert!(!scheduler.status().await.unwrap().autonomous_running);
        scheduler.start_autonomous(Some(1)).await.unwrap();
        assert_eq!(
            scheduler.wait_autonomous().await.unwrap(),
            Some(AutonomousStop::CycleLimit)
        );
    }

    #[tokio::test]
    async fn test_swarm_pause_resume_through_scheduler() {
        let payload = json!({"status": "awaiting_input", "prompt": "Which color?"});
        let (ctx, _gateway) = mock_context(
            ScriptedSandbox::echo().script(REQUEST_HUMAN_INPUT, Script::Return(payload.clone())),
            MockGateway::new()
                .with_call(ToolCall::new(REQUEST_HUMAN_INPUT))
                .repeating_call(ToolCall::new(TASK_COMPLETE)),
        );
        let (scheduler, _join) = LoopScheduler::spawn(ctx);

        assert!(matches!(
            scheduler.resume_swarm("too early").await,
            Err(LoopError::NotResumable(AgentMode::Swarm))
        ));

        scheduler.start_swarm("paint the shed", Some(2)).await.unwrap();
        assert_eq!(
            scheduler.wait_swarm().await.unwrap(),
            Some(SwarmStop::Paused(payload))
        );
        let status = scheduler.status().await.unwrap();
        assert!(status.swarm_paused);
        assert!(!status.swarm_running);

        scheduler.resume_swarm("blue").await.unwrap();
        let stop = scheduler.wait_swarm().await.unwrap();
        assert!(matches!(stop, Some(SwarmStop::Completed(_))));
        assert!(!scheduler.status().await.unwrap().swarm_paused);
    }

    #[tokio::test]
    async fn test_shutdown_closes_handle() {
        let (ctx, _gateway) = mock_context(ScriptedSandbox::echo(), MockGateway::new());
        let (scheduler, join) = LoopScheduler::spawn(ctx);
        scheduler.shutdown().await.unwrap();
        join.await.unwrap();
        assert!(matches!(
            scheduler.status().await,
            Err(LoopError::SchedulerClosed)
        ));
    }
}
