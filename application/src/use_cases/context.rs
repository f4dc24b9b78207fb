//! The common cycle shared by every mode.
//!
//! ```text
//! retrieve ──▶ choose one call ──▶ critique gate ──▶ execute ──▶ fold back
//!                                  (mutating only,
//!                                   one revision)
//! ```
//!
//! [`LoopContext`] owns the collaborators a cycle needs and is cheap to
//! clone into spawned loop tasks.

use crate::config::RuntimeConfig;
use crate::ports::ai_gateway::GatewayError;
use crate::ports::clock::{Clock, SystemClock};
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger};
use crate::retrieval::RetrievalStrategy;
use crate::runtime::ToolRuntime;
use crate::state_store::{LoopEvent, StateStore};
use serde_json::json;
use std::sync::Arc;
use toolforge_domain::well_known::is_mutating;
use toolforge_domain::{AgentMode, AgentPromptTemplate, EnrichedResult, LoopPhase, ToolCall};
use tracing::{debug, info};

/// What the gateway decided for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Call {
        call: ToolCall,
        /// Critique suggestion the call was revised with
        revised_with: Option<String>,
    },
    /// The model answered without choosing a tool
    NoCall { text: Option<String> },
    Refused(String),
}

#[derive(Clone)]
pub struct LoopContext {
    pub(crate) runtime: ToolRuntime,
    pub(crate) retrieval: Arc<dyn RetrievalStrategy>,
    pub(crate) logger: Arc<dyn ConversationLogger>,
    pub(crate) events: StateStore,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: RuntimeConfig,
}

impl LoopContext {
    pub fn new(runtime: ToolRuntime, retrieval: Arc<dyn RetrievalStrategy>) -> Self {
        Self {
            runtime,
            retrieval,
            logger: Arc::new(NoConversationLogger),
            events: StateStore::new(),
            clock: Arc::new(SystemClock),
            config: RuntimeConfig::default(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_events(mut self, events: StateStore) -> Self {
        self.events = events;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn runtime(&self) -> &ToolRuntime {
        &self.runtime
    }

    pub fn events(&self) -> &StateStore {
        &self.events
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn set_phase(&self, mode: AgentMode, phase: LoopPhase) {
        self.events.set_phase(mode, phase);
    }

    pub(crate) fn log(&self, event_type: &'static str, payload: serde_json::Value) {
        self.logger.log(ConversationEvent::new(event_type, payload));
    }

    /// Retrieve tools, ask for one call and pass mutating calls through the
    /// critique gate.
    ///
    /// `goal` is what the critique measures the call against; for one-shot
    /// modes it is the request itself.
    pub async fn decide(
        &self,
        mode: AgentMode,
        request: &str,
        goal: &str,
    ) -> Result<Decision, GatewayError> {
        self.set_phase(mode, LoopPhase::Thinking);

        let tools = self.runtime.registry.list();
        let retrieval = self.retrieval.retrieve(request, &tools).await?;
        let subset = retrieval.select(&tools);
        let names: Vec<String> = subset.iter().map(|t| t.name.clone()).collect();
        debug!(mode = %mode, strategy = %self.retrieval.kind(), tools = ?names, "Retrieved tools");
        self.log("tools_retrieved", json!({"mode": mode, "strategy": self.retrieval.kind(), "names": names}));
        self.events.publish(LoopEvent::ToolsRetrieved {
            mode,
            names: names.clone(),
        });

        let instruction = AgentPromptTemplate::system_instruction(mode);
        let response = self
            .runtime
            .gateway
            .generate_response(request, &instruction, &subset)
            .await?;

        if let Some(reason) = response.refusal {
            info!(mode = %mode, reason = %reason, "Request refused");
            self.log("refusal", json!({"mode": mode, "reason": reason}));
            self.events.publish(LoopEvent::Refused {
                mode,
                reason: reason.clone(),
            });
            return Ok(Decision::Refused(reason));
        }
        let Some(mut call) = response.tool_call else {
            return Ok(Decision::NoCall {
                text: response.text,
            });
        };
        self.log("tool_call", json!({"mode": mode, "call": call}));

        let mut revised_with = None;
        if is_mutating(&call.name) {
            self.set_phase(mode, LoopPhase::Critiquing);
            let critique = self.runtime.gateway.critique(goal, &call).await?;
            self.log(
                "critique",
                json!({"mode": mode, "tool": call.name, "isOptimal": critique.is_optimal, "suggestion": critique.suggestion}),
            );

            if !critique.is_optimal {
                info!(mode = %mode, tool = %call.name, "Critique requested a revision");
                let revision = AgentPromptTemplate::revision(request, &call, &critique.suggestion);
                let revised = self
                    .runtime
                    .gateway
                    .generate_response(&revision, &instruction, &subset)
                    .await?;
                if let Some(reason) = revised.refusal {
                    self.events.publish(LoopEvent::Refused {
                        mode,
                        reason: reason.clone(),
                    });
                    return Ok(Decision::Refused(reason));
                }
                if let Some(revised_call) = revised.tool_call {
                    call = revised_call;
                    self.log("tool_call", json!({"mode": mode, "call": call, "revision": true}));
                }
                self.events.publish(LoopEvent::CritiqueApplied {
                    mode,
                    suggestion: critique.suggestion.clone(),
                });
                revised_with = Some(critique.suggestion);
            }
        }

        self.events.publish(LoopEvent::ToolCallChosen {
            mode,
            call: call.clone(),
        });
        Ok(Decision::Call { call, revised_with })
    }

    /// Execute a call and fold the result into shared state.
    pub async fn execute(&self, mode: AgentMode, call: &ToolCall) -> EnrichedResult {
        self.set_phase(mode, LoopPhase::Executing);
        let result = self.runtime.execute(call).await;

        match &result.execution_error {
            Some(err) => info!(mode = %mode, tool = %call.name, error = %err, "Tool call failed"),
            None => info!(mode = %mode, tool = %call.name, "Tool call succeeded"),
        }
        self.log("tool_result", json!({"mode": mode, "result": result}));
        self.runtime.registry.record(&result);
        self.events.publish(LoopEvent::ActionCompleted {
            mode,
            result: Box::new(result.clone()),
        });
        result
    }
}
