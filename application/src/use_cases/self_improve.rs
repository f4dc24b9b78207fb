//! Improve → Self-Test → Verify.
//!
//! Each stage is an ordinary call to the corresponding built-in tool, so it
//! shows up in the activity log like any other action. The first failing
//! stage ends the protocol.

use super::context::LoopContext;
use serde::Serialize;
use serde_json::{Map, Value};
use toolforge_domain::well_known::{IMPROVE_TOOL, SELF_TEST_TOOL, VERIFY_TOOL};
use toolforge_domain::{AgentMode, EnrichedResult, LoopPhase, ToolCall};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementStage {
    Improve,
    SelfTest,
    Verify,
}

impl ImprovementStage {
    pub const ALL: [ImprovementStage; 3] = [Self::Improve, Self::SelfTest, Self::Verify];

    pub fn tool_name(&self) -> &'static str {
        match self {
            ImprovementStage::Improve => IMPROVE_TOOL,
            ImprovementStage::SelfTest => SELF_TEST_TOOL,
            ImprovementStage::Verify => VERIFY_TOOL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImprovementReport {
    pub tool_name: String,
    /// Results of the stages that ran, in order
    pub stages: Vec<(ImprovementStage, EnrichedResult)>,
}

impl ImprovementReport {
    pub fn is_success(&self) -> bool {
        self.stages.len() == ImprovementStage::ALL.len()
            && self.stages.iter().all(|(_, r)| r.is_success())
    }

    pub fn failed_stage(&self) -> Option<ImprovementStage> {
        self.stages
            .iter()
            .find(|(_, r)| !r.is_success())
            .map(|(stage, _)| *stage)
    }
}

pub struct SelfImprovement {
    ctx: LoopContext,
    mode: AgentMode,
}

impl SelfImprovement {
    pub fn new(ctx: LoopContext) -> Self {
        Self {
            ctx,
            mode: AgentMode::Command,
        }
    }

    /// Mode the stage results are attributed to.
    pub fn with_mode(mut self, mode: AgentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Apply `fields` to `tool_name`, then syntax-check and verify it.
    pub async fn run(&self, tool_name: &str, fields: Map<String, Value>) -> ImprovementReport {
        let mut report = ImprovementReport {
            tool_name: tool_name.to_string(),
            stages: Vec::with_capacity(ImprovementStage::ALL.len()),
        };

        for stage in ImprovementStage::ALL {
            let mut call = ToolCall::new(stage.tool_name()).with_arg("name", tool_name);
            if stage == ImprovementStage::Improve {
                call.arguments.extend(fields.clone());
                call.arguments
                    .insert("name".to_string(), Value::String(tool_name.to_string()));
            }

            let result = self.ctx.execute(self.mode, &call).await;
            let ok = result.is_success();
            report.stages.push((stage, result));
            if !ok {
                info!(tool = %tool_name, ?stage, "Self-improvement stopped");
                break;
            }
        }

        self.ctx.set_phase(self.mode, LoopPhase::Idle);
        report
    }
}
