//! Wire types for the OpenAI-compatible chat-completions API.
//!
//! Only the fields the gateway reads or writes are modelled; unknown
//! response fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use toolforge_domain::Tool;

/// Name of the synthetic function the model calls to decline a request.
pub const REFUSE_FUNCTION: &str = "refuse_request";

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
}

impl Message {
    /// Creates a system message (instructions for the model).
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    pub arguments: String,
}

/// `tools[]` entry of a request
#[derive(Debug, Clone, Serialize)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionTool {
    /// Function definition for a registered tool, keyed by its id.
    pub fn from_tool(tool: &Tool) -> Self {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &tool.parameters {
            properties.insert(
                param.name.clone(),
                json!({"type": json_type(&param.param_type), "description": param.description}),
            );
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }
        Self {
            kind: "function",
            function: FunctionDefinition {
                name: tool.id.clone(),
                description: format!("{}: {}", tool.name, tool.description),
                parameters: json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }),
            },
        }
    }

    pub fn refusal() -> Self {
        Self {
            kind: "function",
            function: FunctionDefinition {
                name: REFUSE_FUNCTION.to_string(),
                description: "Decline a nonsensical or impossible request and explain why."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {"reason": {"type": "string"}},
                    "required": ["reason"],
                }),
            },
        }
    }
}

/// Map free-form parameter type hints onto JSON Schema types.
fn json_type(hint: &str) -> &'static str {
    match hint.trim().to_ascii_lowercase().as_str() {
        "number" | "float" | "double" => "number",
        "integer" | "int" => "integer",
        "boolean" | "bool" => "boolean",
        "object" | "table" | "map" => "object",
        "array" | "list" => "array",
        _ => "string",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<FunctionTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            response_format: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<FunctionTool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn json_object(mut self) -> Self {
        self.response_format = Some(ResponseFormat {
            kind: "json_object",
        });
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Message,
}

impl ChatResponse {
    pub fn first_message(&self) -> Option<&Message> {
        self.choices.first().map(|c| &c.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use toolforge_domain::{ToolCategory, ToolParameter};

    #[test]
    fn test_function_tool_uses_id_and_parameters() {
        let now = Utc::now();
        let tool = Tool {
            id: "create_tool".to_string(),
            name: "Create Tool".to_string(),
            description: "Registers a tool".to_string(),
            category: ToolCategory::Automation,
            version: 1,
            parameters: vec![
                ToolParameter::new("name", "tool name", true),
                ToolParameter::new("parameters", "declared parameters", false).with_type("array"),
            ],
            implementation: "return args".to_string(),
            created_at: now,
            updated_at: now,
        };

        let def = serde_json::to_value(FunctionTool::from_tool(&tool)).unwrap();
        assert_eq!(def["type"], "function");
        assert_eq!(def["function"]["name"], "create_tool");
        assert_eq!(
            def["function"]["parameters"]["properties"]["parameters"]["type"],
            "array"
        );
        assert_eq!(def["function"]["parameters"]["required"], json!(["name"]));
    }

    #[test]
    fn test_request_omits_empty_fields() {
        let request = ChatRequest::new("m", vec![Message::user("hi")]);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("response_format").is_none());
        assert!(value["messages"][0].get("tool_calls").is_none());

        let value = serde_json::to_value(request.json_object()).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_response_with_tool_call_and_null_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":null,
            "tool_calls":[{"id":"c1","type":"function","function":{"name":"echo","arguments":"{\"message\":\"hi\"}"}}]}}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        let message = response.first_message().unwrap();
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls[0].function.name, "echo");
    }
}
