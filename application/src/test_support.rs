//! Hand-written port doubles shared by the application tests.

use crate::config::RuntimeConfig;
use crate::ports::ai_gateway::{AiGateway, Critique, GatewayError, GeneratedResponse, Verification};
use crate::ports::clock::Clock;
use crate::ports::embedding::EmbeddingPort;
use crate::ports::sandbox::ExecutionSandbox;
use crate::registry::RegistryHandle;
use crate::retrieval::DirectRetrieval;
use crate::runtime::{RuntimeApi, ToolRuntime};
use crate::use_cases::context::LoopContext;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use toolforge_domain::core::string::slugify;
use toolforge_domain::well_known::{
    CREATE_TOOL, ECHO, IMPROVE_TOOL, REQUEST_HUMAN_INPUT, SELF_TEST_TOOL, TASK_COMPLETE,
    VERIFY_TOOL,
};
use toolforge_domain::{
    EnrichedResult, ExecutionError, Tool, ToolCall, ToolCategory, ToolRegistry, ToolSummary,
};

pub(crate) fn tool_with(name: &str, description: &str, version: u32) -> Tool {
    let now = Utc::now();
    Tool {
        id: slugify(name),
        name: name.to_string(),
        description: description.to_string(),
        category: ToolCategory::Functional,
        version,
        parameters: Vec::new(),
        implementation: "return args".to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn tools_named(names: &[&str]) -> Vec<Tool> {
    names
        .iter()
        .map(|n| tool_with(n, &format!("{} tool", n), 1))
        .collect()
}

/// Registry holding every well-known tool.
pub(crate) fn standard_registry() -> RegistryHandle {
    let tools = tools_named(&[
        ECHO,
        CREATE_TOOL,
        IMPROVE_TOOL,
        SELF_TEST_TOOL,
        VERIFY_TOOL,
        TASK_COMPLETE,
        REQUEST_HUMAN_INPUT,
    ]);
    RegistryHandle::new(ToolRegistry::from_tools(tools))
}

pub(crate) fn mock_runtime(sandbox: ScriptedSandbox) -> (ToolRuntime, Arc<MockGateway>) {
    let gateway = Arc::new(MockGateway::new());
    let runtime = ToolRuntime::new(standard_registry(), Arc::new(sandbox), gateway.clone());
    (runtime, gateway)
}

/// Loop context over the standard registry with direct retrieval.
pub(crate) fn mock_context(sandbox: ScriptedSandbox, gateway: MockGateway) -> (LoopContext, Arc<MockGateway>) {
    let gateway = Arc::new(gateway);
    let runtime = ToolRuntime::new(standard_registry(), Arc::new(sandbox), gateway.clone());
    let ctx = LoopContext::new(runtime, Arc::new(DirectRetrieval))
        .with_config(RuntimeConfig::default());
    (ctx, gateway)
}

// ==================== Gateway ====================

/// Scripted gateway. Queued responses are consumed first; when a queue is
/// empty the repeating default is used.
#[derive(Default)]
pub(crate) struct MockGateway {
    responses: Mutex<VecDeque<Result<GeneratedResponse, GatewayError>>>,
    default_response: Mutex<Option<GeneratedResponse>>,
    goals: Mutex<VecDeque<Result<String, GatewayError>>>,
    default_goal: Mutex<Option<String>>,
    critiques: Mutex<VecDeque<Critique>>,
    selection: Mutex<Option<Result<Vec<String>, GatewayError>>>,
    verification: Mutex<Option<Verification>>,
    requests: Mutex<Vec<String>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_call(self, call: ToolCall) -> Self {
        self.with_response(Ok(GeneratedResponse::call(call)))
    }

    pub(crate) fn with_response(self, response: Result<GeneratedResponse, GatewayError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn repeating_call(self, call: ToolCall) -> Self {
        *self.default_response.lock().unwrap() = Some(GeneratedResponse::call(call));
        self
    }

    pub(crate) fn with_goal(self, goal: Result<String, GatewayError>) -> Self {
        self.goals.lock().unwrap().push_back(goal);
        self
    }

    pub(crate) fn repeating_goal(self, goal: &str) -> Self {
        *self.default_goal.lock().unwrap() = Some(goal.to_string());
        self
    }

    pub(crate) fn with_critique(self, is_optimal: bool, suggestion: &str) -> Self {
        self.critiques.lock().unwrap().push_back(Critique {
            is_optimal,
            suggestion: suggestion.to_string(),
        });
        self
    }

    pub(crate) fn with_selection(self, names: &[&str]) -> Self {
        *self.selection.lock().unwrap() = Some(Ok(names.iter().map(|n| n.to_string()).collect()));
        self
    }

    pub(crate) fn failing_selection(self) -> Self {
        *self.selection.lock().unwrap() = Some(Err(GatewayError::Timeout));
        self
    }

    pub(crate) fn with_verification(self, is_correct: bool, reasoning: &str) -> Self {
        *self.verification.lock().unwrap() = Some(Verification {
            is_correct,
            reasoning: reasoning.to_string(),
        });
        self
    }

    pub(crate) fn calls_to(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == operation).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Requests passed to `generate_response`, in order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }
}

#[async_trait]
impl AiGateway for MockGateway {
    async fn select_tools(
        &self,
        _request: &str,
        summaries: &[ToolSummary],
    ) -> Result<Vec<String>, GatewayError> {
        self.record("select_tools");
        match self.selection.lock().unwrap().clone() {
            Some(selection) => selection,
            None => Ok(summaries.iter().map(|s| s.name.clone()).collect()),
        }
    }

    async fn generate_response(
        &self,
        request: &str,
        _system_instruction: &str,
        _tools: &[Tool],
    ) -> Result<GeneratedResponse, GatewayError> {
        self.record("generate_response");
        self.requests.lock().unwrap().push(request.to_string());
        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }
        Ok(self.default_response.lock().unwrap().clone().unwrap_or_default())
    }

    async fn generate_goal(
        &self,
        _history: &[EnrichedResult],
        _budget_remaining: Option<u32>,
    ) -> Result<String, GatewayError> {
        self.record("generate_goal");
        if let Some(goal) = self.goals.lock().unwrap().pop_front() {
            return goal;
        }
        Ok(self
            .default_goal
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "no action needed".to_string()))
    }

    async fn critique(&self, _goal: &str, _action: &ToolCall) -> Result<Critique, GatewayError> {
        self.record("critique");
        Ok(self.critiques.lock().unwrap().pop_front().unwrap_or(Critique {
            is_optimal: true,
            suggestion: String::new(),
        }))
    }

    async fn verify(&self, _tool: &Tool) -> Result<Verification, GatewayError> {
        self.record("verify");
        Ok(self.verification.lock().unwrap().clone().unwrap_or(Verification {
            is_correct: true,
            reasoning: "looks right".to_string(),
        }))
    }

    async fn generate_text(
        &self,
        prompt: &str,
        _system_instruction: &str,
    ) -> Result<String, GatewayError> {
        self.record("generate_text");
        Ok(prompt.to_string())
    }
}

// ==================== Sandbox ====================

#[derive(Clone)]
pub(crate) enum Script {
    /// Return the arguments unchanged
    Echo,
    Return(Value),
    Raise(String),
    /// Run another tool with the same arguments
    Recurse(String),
    Panic,
}

/// Sandbox that behaves per tool name instead of interpreting source.
pub(crate) struct ScriptedSandbox {
    scripts: HashMap<String, Script>,
    fallback: Script,
    runs: AtomicUsize,
}

impl ScriptedSandbox {
    pub(crate) fn echo() -> Self {
        Self::with_fallback(Script::Echo)
    }

    pub(crate) fn recursive(name: &str) -> Self {
        Self::with_fallback(Script::Recurse(name.to_string()))
    }

    pub(crate) fn with_fallback(fallback: Script) -> Self {
        Self {
            scripts: HashMap::new(),
            fallback,
            runs: AtomicUsize::new(0),
        }
    }

    pub(crate) fn script(mut self, tool: &str, script: Script) -> Self {
        self.scripts.insert(tool.to_string(), script);
        self
    }

    pub(crate) fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionSandbox for ScriptedSandbox {
    async fn run(
        &self,
        tool: &Tool,
        args: Value,
        runtime: RuntimeApi,
    ) -> Result<Value, ExecutionError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.get(&tool.name).unwrap_or(&self.fallback).clone();
        match script {
            Script::Echo => Ok(args),
            Script::Return(value) => Ok(value),
            Script::Raise(message) => Err(ExecutionError::raised(message)),
            Script::Recurse(name) => runtime.tools_run(&name, args).await,
            Script::Panic => panic!("scripted sandbox panic in {}", tool.name),
        }
    }

    fn check_syntax(&self, implementation: &str) -> Result<(), ExecutionError> {
        if implementation.contains("SYNTAX ERROR") {
            Err(ExecutionError::raised("unexpected symbol near 'ERROR'"))
        } else {
            Ok(())
        }
    }
}

// ==================== Embedding ====================

/// Bag-of-words embedder with an exact vocabulary, so scores are easy to
/// compute by hand.
pub(crate) struct KeywordEmbedder {
    vocabulary: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    const DIM: usize = 64;

    pub(crate) fn new() -> Self {
        Self {
            vocabulary: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingPort for KeywordEmbedder {
    fn dimension(&self) -> usize {
        Self::DIM
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vocabulary = self.vocabulary.lock().unwrap();
        let mut vector = vec![0.0; Self::DIM];
        for word in toolforge_domain::core::string::words(text) {
            let next = vocabulary.len();
            let index = *vocabulary.entry(word).or_insert(next);
            vector[index % Self::DIM] += 1.0;
        }
        Ok(vector)
    }
}

// ==================== Clock ====================

pub(crate) struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub(crate) fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub(crate) fn set(&self, today: NaiveDate) {
        *self.today.lock().unwrap() = today;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap()
    }
}
