//! Console progress for the control loops
//!
//! [`ConsoleReporter`] subscribes to the [`StateStore`] broadcast and
//! renders each [`LoopEvent`] as it arrives: a spinner carries the current
//! phase, everything else is printed above it.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toolforge_application::{LoopEvent, StateStore};
use toolforge_domain::core::string::truncate;
use toolforge_domain::{LoopPhase, WorkerStatus};

/// Renders loop events to the terminal
pub struct ConsoleReporter {
    spinner: Option<ProgressBar>,
}

impl ConsoleReporter {
    /// Without a spinner only the event lines are printed, which keeps
    /// stdin prompts readable.
    pub fn new(with_spinner: bool) -> Self {
        let spinner = with_spinner.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });
        Self { spinner }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    /// Consume events from `store` on a background task until `shutdown`
    /// is cancelled. Events already queued at that point are still shown.
    pub fn spawn(self, store: &StateStore, shutdown: CancellationToken) -> JoinHandle<()> {
        let mut rx = store.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(event) => self.render(&event),
                        Err(RecvError::Lagged(skipped)) => {
                            self.print(format!("{} skipped {} events", "…".dimmed(), skipped));
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = shutdown.cancelled() => {
                        while let Ok(event) = rx.try_recv() {
                            self.render(&event);
                        }
                        break;
                    }
                }
            }
            self.finish();
        })
    }

    pub fn render(&self, event: &LoopEvent) {
        if let LoopEvent::PhaseChanged { mode, phase } = event {
            if let Some(pb) = &self.spinner {
                pb.set_prefix(mode.to_string());
                pb.set_message(phase.display_name().to_string());
            }
            if !phase.is_terminal() {
                return;
            }
        }
        if let Some(line) = describe_event(event) {
            self.print(line);
        }
    }

    fn print(&self, line: String) {
        match &self.spinner {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.spinner {
            pb.finish_and_clear();
        }
    }
}

/// One display line for `event`, or `None` when it has nothing to show.
pub fn describe_event(event: &LoopEvent) -> Option<String> {
    let line = match event {
        LoopEvent::PhaseChanged { mode, phase } => match phase {
            LoopPhase::Completed => format!("{} {} completed", "✓".green(), mode),
            LoopPhase::Cancelled => format!("{} {} cancelled", "✗".yellow(), mode),
            LoopPhase::Halted => format!("{} {} halted", "■".red(), mode),
            LoopPhase::Paused => format!("{} {} paused", "‖".yellow(), mode),
            _ => return None,
        },
        LoopEvent::ToolsRetrieved { names, .. } => {
            format!("{} tools: {}", "·".dimmed(), names.join(", ").dimmed())
        }
        LoopEvent::ToolCallChosen { call, .. } => {
            let args = serde_json::to_string(&call.arguments).unwrap_or_default();
            format!("{} {} {}", "→".cyan(), call.name.bold(), truncate(&args, 80).dimmed())
        }
        LoopEvent::CritiqueApplied { suggestion, .. } => {
            format!("{} revised: {}", "↺".yellow(), truncate(suggestion, 100))
        }
        LoopEvent::GoalGenerated { goal, .. } => {
            format!("{} {}", "Goal:".magenta().bold(), goal)
        }
        LoopEvent::ActionCompleted { result, .. } => match &result.execution_error {
            Some(err) => format!("  {} {}: {}", "x".red(), result.tool_name(), err),
            None => {
                let value = result
                    .execution_result
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                format!("  {} {} {}", "v".green(), result.tool_name(), truncate(&value, 100))
            }
        },
        LoopEvent::BudgetReset { date } => {
            format!("{} budget reset for {}", "↻".cyan(), date)
        }
        LoopEvent::WorkerChanged { worker } => {
            let status = match worker.status {
                WorkerStatus::Failed | WorkerStatus::Terminated => worker.status.to_string().red(),
                WorkerStatus::Succeeded => worker.status.to_string().green(),
                _ => worker.status.to_string().normal(),
            };
            match &worker.error {
                Some(err) => format!("  [{}] {} ({})", worker.id, status, truncate(err, 80)),
                None => format!("  [{}] {}", worker.id, status),
            }
        }
        LoopEvent::Paused { payload, .. } => {
            let prompt = payload
                .get("prompt")
                .and_then(|p| p.as_str())
                .unwrap_or("input needed");
            format!("{} {}", "?".yellow().bold(), prompt)
        }
        LoopEvent::Refused { reason, .. } => format!("{} refused: {}", "✗".red(), reason),
        LoopEvent::Notice { message, .. } => format!("{} {}", "!".yellow(), message),
    };
    Some(line)
}
