//! OpenAI-compatible chat-completions gateway
//!
//! `generate_response` uses function calling: every tool in the subset is
//! offered as a function named by its id, plus [`REFUSE_FUNCTION`]. All
//! other operations request a JSON object and parse it.

use super::protocol::{
    ChatRequest, ChatResponse, FunctionTool, Message, REFUSE_FUNCTION, WireToolCall,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use toolforge_application::ports::ai_gateway::{
    AiGateway, Critique, GatewayError, GeneratedResponse, Verification,
};
use toolforge_domain::core::string::truncate;
use toolforge_domain::{AgentPromptTemplate, EnrichedResult, Tool, ToolCall, ToolSummary};
use tracing::{debug, warn};

const JSON_ONLY: &str = "You answer with a single JSON object and nothing else.";

pub struct OpenAiGateway {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiGateway {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, GatewayError> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!(url = %url, model = %self.model, tools = request.tools.len(), "Sending chat request");

        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(GatewayError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&body, 500)
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            GatewayError::InvalidResponse(format!("{} in {}", e, truncate(&body, 200)))
        })
    }

    /// Run a JSON-object completion and decode it as `T`.
    async fn ask_json<T: DeserializeOwned>(&self, prompt: String) -> Result<T, GatewayError> {
        let request = ChatRequest::new(
            self.model.clone(),
            vec![Message::system(JSON_ONLY), Message::user(prompt)],
        )
        .json_object();
        let response = self.send(&request).await?;
        let content = message_text(&response)?;
        parse_json_object(&content)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_connect() {
        GatewayError::ConnectionError(err.to_string())
    } else {
        GatewayError::RequestFailed(err.to_string())
    }
}

fn message_text(response: &ChatResponse) -> Result<String, GatewayError> {
    response
        .first_message()
        .and_then(|m| m.content.clone())
        .ok_or_else(|| GatewayError::InvalidResponse("response has no message content".into()))
}

/// Decode the first JSON object in `content`, tolerating code fences and
/// surrounding prose.
fn parse_json_object<T: DeserializeOwned>(content: &str) -> Result<T, GatewayError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let slice = match (start, end) {
        (Some(s), Some(e)) if e > s => &content[s..=e],
        _ => {
            return Err(GatewayError::InvalidResponse(format!(
                "no JSON object in: {}",
                truncate(content, 200)
            )));
        }
    };
    serde_json::from_str(slice).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

/// Turn the model's reply into at most one tool call.
fn parse_generated(
    response: &ChatResponse,
    tools: &[Tool],
) -> Result<GeneratedResponse, GatewayError> {
    let Some(message) = response.first_message() else {
        return Err(GatewayError::InvalidResponse("response has no choices".into()));
    };
    let text = message.content.clone().filter(|t| !t.trim().is_empty());

    let Some(call) = message.tool_calls.first() else {
        return Ok(GeneratedResponse {
            text,
            ..Default::default()
        });
    };
    if message.tool_calls.len() > 1 {
        warn!(count = message.tool_calls.len(), "Model returned several tool calls, using the first");
    }

    let arguments = parse_arguments(call)?;
    if call.function.name == REFUSE_FUNCTION {
        let reason = arguments
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("request refused")
            .to_string();
        return Ok(GeneratedResponse::refused(reason));
    }

    // Functions are keyed by id; fall back to the raw name so an unknown
    // function still surfaces as a not-found call downstream.
    let name = tools
        .iter()
        .find(|t| t.id == call.function.name || t.name == call.function.name)
        .map(|t| t.name.clone())
        .unwrap_or_else(|| call.function.name.clone());

    Ok(GeneratedResponse {
        tool_call: Some(ToolCall { name, arguments }),
        text,
        refusal: None,
    })
}

fn parse_arguments(call: &WireToolCall) -> Result<Map<String, Value>, GatewayError> {
    let raw = call.function.arguments.trim();
    if raw.is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(GatewayError::InvalidResponse(format!(
            "arguments for {} are not an object: {}",
            call.function.name, other
        ))),
        Err(e) => Err(GatewayError::InvalidResponse(format!(
            "arguments for {} are not valid JSON: {}",
            call.function.name, e
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct SelectionReply {
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GoalReply {
    goal: String,
}

#[async_trait]
impl AiGateway for OpenAiGateway {
    async fn select_tools(
        &self,
        request: &str,
        summaries: &[ToolSummary],
    ) -> Result<Vec<String>, GatewayError> {
        let reply: SelectionReply = self
            .ask_json(AgentPromptTemplate::tool_selection(request, summaries))
            .await?;
        Ok(reply.names)
    }

    async fn generate_response(
        &self,
        request: &str,
        system_instruction: &str,
        tools: &[Tool],
    ) -> Result<GeneratedResponse, GatewayError> {
        let mut functions: Vec<FunctionTool> = tools.iter().map(FunctionTool::from_tool).collect();
        functions.push(FunctionTool::refusal());

        let chat = ChatRequest::new(
            self.model.clone(),
            vec![Message::system(system_instruction), Message::user(request)],
        )
        .with_tools(functions);
        let response = self.send(&chat).await?;
        parse_generated(&response, tools)
    }

    async fn generate_goal(
        &self,
        history: &[EnrichedResult],
        budget_remaining: Option<u32>,
    ) -> Result<String, GatewayError> {
        let reply: GoalReply = self
            .ask_json(AgentPromptTemplate::goal_generation(history, budget_remaining))
            .await?;
        Ok(reply.goal)
    }

    async fn critique(&self, goal: &str, action: &ToolCall) -> Result<Critique, GatewayError> {
        self.ask_json(AgentPromptTemplate::critique(goal, action)).await
    }

    async fn verify(&self, tool: &Tool) -> Result<Verification, GatewayError> {
        self.ask_json(AgentPromptTemplate::verify(tool)).await
    }

    async fn generate_text(
        &self,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<String, GatewayError> {
        let request = ChatRequest::new(
            self.model.clone(),
            vec![Message::system(system_instruction), Message::user(prompt)],
        );
        let response = self.send(&request).await?;
        message_text(&response)
    }
}
