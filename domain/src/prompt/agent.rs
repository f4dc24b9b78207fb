//! Prompt templates for the control loops and the reference gateway

use crate::agent::entities::AgentMode;
use crate::tool::entities::{Tool, ToolCall, ToolSummary};
use crate::tool::value_objects::EnrichedResult;
use crate::tool::well_known::{NO_ACTION_NEEDED, TASK_COMPLETE};

/// Templates for generating agent prompts
pub struct AgentPromptTemplate;

impl AgentPromptTemplate {
    /// System instruction for choosing one tool call.
    pub fn system_instruction(mode: AgentMode) -> String {
        let mode_rules = match mode {
            AgentMode::Command => "Answer the request with exactly one tool call.",
            AgentMode::Assist => {
                "Propose exactly one tool call. A human will approve or reject it before it runs."
            }
            AgentMode::Autonomous => {
                "You are acting on your own goal. Prefer improving or creating tools that make future goals easier."
            }
            AgentMode::Task => {
                "You are working through one task over several steps. Call \"Task Complete\" once the task is done."
            }
            AgentMode::Swarm => {
                "You are one worker in a swarm sharing a goal and a history. Build on what other workers did and avoid repeating their failures."
            }
        };
        format!(
            r#"You are an agent runtime that acts only through tools.

{mode_rules}

## Rules

- Choose a tool from the provided list. Do not invent tool names.
- If no existing tool fits, use "Create Tool" to write one, or "Improve Existing Tool" to fix one.
- Tool implementations are Lua 5.4. A tool receives `args` and a `runtime` with `runtime.tools` and `runtime.ai`.
- If the request is nonsensical or impossible, refuse it and explain why instead of calling a tool."#
        )
    }

    /// Prompt for LLM-based tool selection.
    pub fn tool_selection(request: &str, summaries: &[ToolSummary]) -> String {
        let list = summaries
            .iter()
            .map(|s| format!("- {}: {}", s.name, s.description))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            r#"Select the 3 to 5 tools most relevant to the request below.

## Request

{request}

## Tools

{list}

Respond with JSON: {{"names": ["Tool Name", ...]}}"#
        )
    }

    /// Prompt for autonomous goal generation.
    pub fn goal_generation(history: &[EnrichedResult], budget_remaining: Option<u32>) -> String {
        let budget = match budget_remaining {
            Some(n) => format!("{} actions remain in today's budget.", n),
            None => "The action budget is unlimited.".to_string(),
        };
        format!(
            r#"Decide the next goal for yourself.

{budget}

## Recent actions (newest first)

{history}

Avoid repeating actions that failed. If nothing is worth doing, answer exactly "{NO_ACTION_NEEDED}".
Respond with JSON: {{"goal": "..."}}"#,
            history = Self::render_history(history),
        )
    }

    /// Prompt for the critique gate.
    pub fn critique(goal: &str, action: &ToolCall) -> String {
        let arguments = serde_json::to_string_pretty(&action.arguments).unwrap_or_default();
        format!(
            r#"Evaluate whether this proposed action is the best way to reach the goal.

## Goal

{goal}

## Proposed action

Tool: {name}
Arguments:
{arguments}

Respond with JSON: {{"isOptimal": true|false, "suggestion": "how to improve it, or empty"}}"#,
            name = action.name,
        )
    }

    /// Prompt for semantic verification of a tool.
    pub fn verify(tool: &Tool) -> String {
        format!(
            r#"Check whether this Lua implementation does what its description says.

## Tool

Name: {name}
Description: {description}

## Implementation

```lua
{implementation}
```

Respond with JSON: {{"isCorrect": true|false, "reasoning": "..."}}"#,
            name = tool.name,
            description = tool.description,
            implementation = tool.implementation,
        )
    }

    /// Request text for the single revision pass after a negative critique.
    pub fn revision(request: &str, rejected: &ToolCall, suggestion: &str) -> String {
        format!(
            "{request}\n\nA reviewer rejected the previous proposal ({name}) with this suggestion:\n{suggestion}\n\nPropose a revised tool call.",
            name = rejected.name,
        )
    }

    /// Request text for one step of a multi-step task or swarm goal.
    pub fn step_request(goal: &str, history: &[EnrichedResult]) -> String {
        if history.is_empty() {
            return format!("{goal}\n\nWhen the goal is fully achieved, call \"{TASK_COMPLETE}\".");
        }
        format!(
            "{goal}\n\n## Progress so far (newest first)\n\n{}\n\nChoose the next step. When the goal is fully achieved, call \"{TASK_COMPLETE}\".",
            Self::render_history(history)
        )
    }

    fn render_history(history: &[EnrichedResult]) -> String {
        if history.is_empty() {
            return "(none)".to_string();
        }
        history
            .iter()
            .map(|r| format!("- {}", crate::core::string::truncate(&r.describe(), 300)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::ExecutionError;

    #[test]
    fn test_goal_prompt_mentions_budget_and_sentinel() {
        let prompt = AgentPromptTemplate::goal_generation(&[], Some(3));
        assert!(prompt.contains("3 actions remain"));
        assert!(prompt.contains(NO_ACTION_NEEDED));
        assert!(prompt.contains("(none)"));
    }

    #[test]
    fn test_goal_prompt_renders_failures() {
        let failed = EnrichedResult::failure(
            ToolCall::new("Echo"),
            None,
            ExecutionError::raised("boom"),
        );
        let prompt = AgentPromptTemplate::goal_generation(&[failed], None);
        assert!(prompt.contains("Echo failed: [execution] boom"));
        assert!(prompt.contains("unlimited"));
    }

    #[test]
    fn test_revision_carries_suggestion() {
        let text = AgentPromptTemplate::revision(
            "make a timer",
            &ToolCall::new("Create Tool"),
            "add a duration parameter",
        );
        assert!(text.starts_with("make a timer"));
        assert!(text.contains("add a duration parameter"));
    }
}
