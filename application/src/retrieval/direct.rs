//! Direct retrieval: every registered tool, unfiltered.

use super::{Retrieval, RetrievalStrategy};
use crate::config::RetrievalKind;
use crate::ports::ai_gateway::GatewayError;
use async_trait::async_trait;
use toolforge_domain::Tool;

pub struct DirectRetrieval;

#[async_trait]
impl RetrievalStrategy for DirectRetrieval {
    fn kind(&self) -> RetrievalKind {
        RetrievalKind::Direct
    }

    async fn retrieve(&self, _request: &str, tools: &[Tool]) -> Result<Retrieval, GatewayError> {
        let names = tools.iter().map(|t| t.name.clone()).collect();
        Ok(Retrieval::new(names, tools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockGateway, tools_named};

    #[tokio::test]
    async fn test_returns_all_tools_without_gateway_calls() {
        let gateway = MockGateway::new();
        let tools = tools_named(&["A", "B", "C", "D", "E"]);

        let retrieval = DirectRetrieval.retrieve("anything", &tools).await.unwrap();

        assert_eq!(retrieval.names(), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(gateway.total_calls(), 0);
    }
}
