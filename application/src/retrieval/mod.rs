//! Tool retrieval strategies
//!
//! Each strategy narrows the registry to the tools worth showing the model
//! for one request. All three return candidates in a meaningful order plus
//! the mandatory set, so a loop can always create or improve a tool.
//!
//! | Strategy | Gateway call | Filtering |
//! |----------|--------------|-----------|
//! | [`DirectRetrieval`] | none | none |
//! | [`LlmRetrieval`] | `select_tools` | names validated against the registry |
//! | [`EmbeddingRetrieval`] | embedder only | name hits, then threshold + top-K |

pub mod direct;
pub mod embedding;
pub mod llm;

pub use direct::DirectRetrieval;
pub use embedding::EmbeddingRetrieval;
pub use llm::LlmRetrieval;

use crate::config::{RetrievalKind, RetrievalParams};
use crate::ports::ai_gateway::{AiGateway, GatewayError};
use crate::ports::embedding::EmbeddingPort;
use async_trait::async_trait;
use std::sync::Arc;
use toolforge_domain::retrieval::union_in_order;
use toolforge_domain::well_known::MANDATORY_TOOLS;
use toolforge_domain::Tool;

/// Outcome of one retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrieval {
    pub candidates: Vec<String>,
    /// Mandatory tools present in the registry
    pub mandatory: Vec<String>,
}

impl Retrieval {
    pub fn new(candidates: Vec<String>, tools: &[Tool]) -> Self {
        let mandatory = MANDATORY_TOOLS
            .iter()
            .filter(|name| tools.iter().any(|t| t.name == **name))
            .map(|name| name.to_string())
            .collect();
        Self {
            candidates,
            mandatory,
        }
    }

    /// Candidates with the mandatory set unioned in last.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.candidates.clone();
        union_in_order(&mut names, self.mandatory.iter().map(String::as_str));
        names
    }

    /// The tools named by [`names`](Self::names), in that order.
    pub fn select(&self, tools: &[Tool]) -> Vec<Tool> {
        self.names()
            .iter()
            .filter_map(|name| tools.iter().find(|t| &t.name == name).cloned())
            .collect()
    }
}

#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    fn kind(&self) -> RetrievalKind;

    /// Select tools relevant to `request` from a registry snapshot.
    async fn retrieve(&self, request: &str, tools: &[Tool]) -> Result<Retrieval, GatewayError>;
}

/// Build the configured strategy.
pub fn build_strategy(
    params: &RetrievalParams,
    gateway: Arc<dyn AiGateway>,
    embedder: Arc<dyn EmbeddingPort>,
) -> Arc<dyn RetrievalStrategy> {
    match params.kind {
        RetrievalKind::Direct => Arc::new(DirectRetrieval),
        RetrievalKind::Llm => Arc::new(LlmRetrieval::new(gateway)),
        RetrievalKind::Embedding => Arc::new(
            EmbeddingRetrieval::new(embedder)
                .with_threshold(params.similarity_threshold)
                .with_top_k(params.top_k),
        ),
    }
}
