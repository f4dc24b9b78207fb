//! Console output formatter for loop results

use colored::Colorize;
use serde_json::Value;
use toolforge_application::{
    AutonomousStop, CommandOutcome, ImprovementReport, SwarmStop, TaskReport, TaskStop,
};
use toolforge_domain::core::string::truncate;
use toolforge_domain::{ConfigIssue, EnrichedResult, Severity, Tool};

/// Formats loop results and registry views for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a single tool call outcome
    pub fn format_result(result: &EnrichedResult) -> String {
        let mut output = String::new();
        let title = format!("{} (v{})", result.tool_name(), Self::tool_version(result));
        match &result.execution_error {
            None => {
                output.push_str(&format!("{} {}\n", "✓".green().bold(), title.bold()));
                if let Some(value) = &result.execution_result {
                    output.push_str(&Self::indent(&Self::render_value(value), "  "));
                    output.push('\n');
                }
            }
            Some(err) => {
                output.push_str(&format!("{} {}\n", "✗".red().bold(), title.bold()));
                output.push_str(&format!("  {} {}\n", err.kind.as_str().red(), err.message));
            }
        }
        output
    }

    pub fn format_command(outcome: &CommandOutcome) -> String {
        match outcome {
            CommandOutcome::Executed(result) => Self::format_result(result),
            CommandOutcome::Answered(Some(text)) => format!("{}\n", text),
            CommandOutcome::Answered(None) => format!("{}\n", "No tool call was chosen.".dimmed()),
        }
    }

    /// Format the registry as a table of names, versions and categories
    pub fn format_tool_list(tools: &[Tool]) -> String {
        let mut output = Self::header(&format!("Tools ({})", tools.len()));
        output.push('\n');
        let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(4);
        for tool in tools {
            output.push_str(&format!(
                "  {:<width$}  {:>4}  {:<10}  {}\n",
                tool.name.bold(),
                format!("v{}", tool.version),
                tool.category.to_string().cyan(),
                truncate(&tool.description, 60).dimmed(),
                width = width
            ));
        }
        output
    }

    /// Format one tool with its parameters and implementation
    pub fn format_tool(tool: &Tool) -> String {
        let mut output = Self::header(&tool.name);
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Id:".cyan().bold(), tool.id));
        output.push_str(&format!("{} {}\n", "Version:".cyan().bold(), tool.version));
        output.push_str(&format!("{} {}\n", "Category:".cyan().bold(), tool.category));
        output.push_str(&format!(
            "{} {}\n",
            "Updated:".cyan().bold(),
            tool.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!("\n{}\n", tool.description));

        if !tool.parameters.is_empty() {
            output.push_str(&Self::section_header("Parameters"));
            for param in &tool.parameters {
                let required = if param.required { "required" } else { "optional" };
                output.push_str(&format!(
                    "  {} ({}, {}) {}\n",
                    param.name.bold(),
                    param.param_type,
                    required.dimmed(),
                    param.description
                ));
            }
        }

        output.push_str(&Self::section_header("Implementation"));
        output.push_str(&Self::indent(&tool.implementation, "  "));
        output.push('\n');
        output
    }

    pub fn format_task(report: &TaskReport) -> String {
        let mut output = Self::header("Task");
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Task:".cyan().bold(), report.goal));
        let stop = match report.stop {
            TaskStop::Completed => "completed".green(),
            TaskStop::IterationCap => "iteration cap reached".yellow(),
            TaskStop::Cancelled => "cancelled".yellow(),
        };
        output.push_str(&format!(
            "{} {} after {} iterations\n",
            "Result:".cyan().bold(),
            stop,
            report.iterations
        ));
        if let Some(summary) = report
            .completion()
            .and_then(|r| r.execution_result.as_ref())
            .and_then(|v| v.get("summary"))
            .and_then(Value::as_str)
        {
            output.push_str(&format!("{} {}\n", "Summary:".cyan().bold(), summary));
        }

        if !report.history.is_empty() {
            output.push_str(&Self::section_header("Recent actions"));
            for result in report.history.iter().rev() {
                output.push_str(&format!("  {}\n", truncate(&result.describe(), 120)));
            }
        }
        output
    }

    pub fn format_improvement(report: &ImprovementReport) -> String {
        let mut output = Self::header(&format!("Improve {}", report.tool_name));
        output.push('\n');
        for (stage, result) in &report.stages {
            let mark = if result.is_success() {
                "✓".green().bold()
            } else {
                "✗".red().bold()
            };
            output.push_str(&format!("{} {:?}\n", mark, stage));
            if let Some(err) = &result.execution_error {
                output.push_str(&format!("  {}\n", err.message));
            }
        }
        match report.failed_stage() {
            None if report.is_success() => {
                output.push_str(&format!("\n{}\n", "Improved, tested and verified.".green()))
            }
            Some(stage) => {
                output.push_str(&format!("\n{} {:?}\n", "Stopped at".red(), stage))
            }
            None => {}
        }
        output
    }

    pub fn format_autonomous_stop(stop: AutonomousStop) -> String {
        let text = match stop {
            AutonomousStop::Cancelled => "Autonomous mode stopped.".yellow(),
            AutonomousStop::BudgetExhausted => "Daily action budget exhausted.".yellow(),
            AutonomousStop::CycleLimit => "Requested number of cycles finished.".green(),
            AutonomousStop::Aborted => "Autonomous loop aborted unexpectedly.".red(),
        };
        format!("{}\n", text)
    }

    pub fn format_swarm_stop(stop: &SwarmStop) -> String {
        match stop {
            SwarmStop::Completed(result) => {
                format!("{}\n{}", "Swarm goal completed.".green().bold(), Self::format_result(result))
            }
            SwarmStop::IterationCap => format!("{}\n", "Swarm reached its iteration cap.".yellow()),
            SwarmStop::Cancelled => format!("{}\n", "Swarm stopped.".yellow()),
            SwarmStop::Refused(reason) => {
                format!("{} {}\n", "Swarm goal refused:".red().bold(), reason)
            }
            SwarmStop::Paused(payload) => format!(
                "{} {}\n",
                "Swarm paused:".yellow().bold(),
                Self::render_value(payload)
            ),
        }
    }

    /// Format configuration issues, errors first
    pub fn format_config_issues(issues: &[ConfigIssue]) -> String {
        let mut sorted: Vec<_> = issues.iter().collect();
        sorted.sort_by_key(|issue| issue.severity != Severity::Error);
        sorted
            .into_iter()
            .map(|issue| match issue.severity {
                Severity::Error => format!("{} {}\n", "error:".red().bold(), issue.message),
                Severity::Warning => format!("{} {}\n", "warning:".yellow().bold(), issue.message),
            })
            .collect()
    }

    fn tool_version(result: &EnrichedResult) -> String {
        result
            .tool
            .as_ref()
            .map(|t| t.version.to_string())
            .unwrap_or_else(|| "?".to_string())
    }

    /// Strings print bare; everything else as pretty JSON.
    fn render_value(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
