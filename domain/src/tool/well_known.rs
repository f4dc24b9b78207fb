//! Names and payload markers the runtime treats specially.

use serde_json::Value;

pub const CREATE_TOOL: &str = "Create Tool";
pub const IMPROVE_TOOL: &str = "Improve Existing Tool";
pub const SELF_TEST_TOOL: &str = "Self Test Tool";
pub const VERIFY_TOOL: &str = "Verify Tool";
pub const TASK_COMPLETE: &str = "Task Complete";
pub const REQUEST_HUMAN_INPUT: &str = "Request Human Input";
pub const ECHO: &str = "Echo";

/// Tools every retrieval result must contain so a loop can always act or
/// evolve.
pub const MANDATORY_TOOLS: [&str; 2] = [CREATE_TOOL, IMPROVE_TOOL];

/// Goal text that turns an autonomous cycle into a no-op.
pub const NO_ACTION_NEEDED: &str = "no action needed";

/// `status` value of the structured pause payload.
pub const AWAITING_INPUT_STATUS: &str = "awaiting_input";

/// Calls that create or modify tools pass through the critique gate.
pub fn is_mutating(tool_name: &str) -> bool {
    tool_name == CREATE_TOOL || tool_name == IMPROVE_TOOL
}

pub fn is_no_action(goal: &str) -> bool {
    goal.trim()
        .trim_end_matches('.')
        .eq_ignore_ascii_case(NO_ACTION_NEEDED)
}

pub fn is_awaiting_input(value: &Value) -> bool {
    value.get("status").and_then(Value::as_str) == Some(AWAITING_INPUT_STATUS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_mutating() {
        assert!(is_mutating(CREATE_TOOL));
        assert!(is_mutating(IMPROVE_TOOL));
        assert!(!is_mutating(ECHO));
        assert!(!is_mutating(VERIFY_TOOL));
    }

    #[test]
    fn test_no_action_sentinel() {
        assert!(is_no_action("no action needed"));
        assert!(is_no_action("  No Action Needed. "));
        assert!(!is_no_action("no action needed yet, improve Echo"));
    }

    #[test]
    fn test_awaiting_input_marker() {
        assert!(is_awaiting_input(&json!({"status": "awaiting_input"})));
        assert!(!is_awaiting_input(&json!({"status": "ok"})));
        assert!(!is_awaiting_input(&json!("awaiting_input")));
    }
}
