//! LLM retrieval: the model picks 3-5 names from lightweight summaries.

use super::{Retrieval, RetrievalStrategy};
use crate::config::RetrievalKind;
use crate::ports::ai_gateway::{AiGateway, GatewayError};
use async_trait::async_trait;
use std::sync::Arc;
use toolforge_domain::Tool;
use tracing::debug;

pub struct LlmRetrieval {
    gateway: Arc<dyn AiGateway>,
}

impl LlmRetrieval {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl RetrievalStrategy for LlmRetrieval {
    fn kind(&self) -> RetrievalKind {
        RetrievalKind::Llm
    }

    async fn retrieve(&self, request: &str, tools: &[Tool]) -> Result<Retrieval, GatewayError> {
        let summaries: Vec<_> = tools.iter().map(Tool::summary).collect();
        let selected = self.gateway.select_tools(request, &summaries).await?;

        let mut names: Vec<String> = Vec::with_capacity(selected.len());
        for name in selected {
            if !tools.iter().any(|t| t.name == name) {
                debug!(tool = %name, "Discarding unknown tool name from selection");
                continue;
            }
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(Retrieval::new(names, tools))
    }
}
