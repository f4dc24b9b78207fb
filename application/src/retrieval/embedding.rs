//! Embedding retrieval.
//!
//! 1. Tools whose name appears as whole words in the request are always kept.
//! 2. The request and each tool's `{name, description}` are embedded. Tool
//!    vectors are cached per `(id, version)`, so an unchanged tool is never
//!    re-embedded.
//! 3. Tools scoring at or above the threshold are sorted by cosine
//!    similarity and truncated to top-K. Ties keep registry order.
//! 4. The mandatory set is unioned in last.

use super::{Retrieval, RetrievalStrategy};
use crate::config::RetrievalKind;
use crate::ports::ai_gateway::GatewayError;
use crate::ports::embedding::EmbeddingPort;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use toolforge_domain::Tool;
use toolforge_domain::retrieval::{ScoredCandidate, cosine_similarity, mentions_name, rank};
use tracing::trace;

type CacheKey = (String, u32);

pub struct EmbeddingRetrieval {
    embedder: Arc<dyn EmbeddingPort>,
    threshold: f32,
    top_k: usize,
    cache: Mutex<HashMap<CacheKey, Arc<Vec<f32>>>>,
}

impl EmbeddingRetrieval {
    pub fn new(embedder: Arc<dyn EmbeddingPort>) -> Self {
        Self {
            embedder,
            threshold: 0.25,
            top_k: 5,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn cached_vectors(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn tool_vector(&self, tool: &Tool) -> Result<Arc<Vec<f32>>, GatewayError> {
        let key = (tool.id.clone(), tool.version);
        if let Some(vector) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(vector.clone());
        }

        trace!(tool = %tool.name, version = tool.version, "Embedding tool summary");
        let vector = Arc::new(self.embedder.embed(&tool.summary().embedding_text()).await?);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        // Older versions of this tool will never be asked for again
        cache.retain(|(id, _), _| id != &tool.id);
        cache.insert(key, vector.clone());
        Ok(vector)
    }
}

#[async_trait]
impl RetrievalStrategy for EmbeddingRetrieval {
    fn kind(&self) -> RetrievalKind {
        RetrievalKind::Embedding
    }

    async fn retrieve(&self, request: &str, tools: &[Tool]) -> Result<Retrieval, GatewayError> {
        let mut names: Vec<String> = tools
            .iter()
            .filter(|t| mentions_name(request, &t.name))
            .map(|t| t.name.clone())
            .collect();

        let request_vector = self.embedder.embed(request).await?;
        let mut scored = Vec::with_capacity(tools.len());
        for tool in tools {
            let vector = self.tool_vector(tool).await?;
            scored.push(ScoredCandidate {
                name: tool.name.clone(),
                score: cosine_similarity(&request_vector, &vector),
            });
        }

        for candidate in rank(scored, self.threshold, self.top_k) {
            if !names.contains(&candidate.name) {
                names.push(candidate.name);
            }
        }
        Ok(Retrieval::new(names, tools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{KeywordEmbedder, tools_named, tool_with};

    fn strategy(embedder: Arc<KeywordEmbedder>) -> EmbeddingRetrieval {
        EmbeddingRetrieval::new(embedder).with_threshold(0.5).with_top_k(2)
    }

    #[tokio::test]
    async fn test_mandatory_set_survives_no_matches() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let tools = tools_named(&["Clock", "Create Tool", "Improve Existing Tool"]);

        let retrieval = strategy(embedder)
            .retrieve("zzz qqq", &tools)
            .await
            .unwrap();

        assert!(retrieval.candidates.is_empty());
        assert_eq!(retrieval.names(), vec!["Create Tool", "Improve Existing Tool"]);
    }

    #[tokio::test]
    async fn test_name_matches_always_included() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let tools = vec![
            tool_with("Clock", "unrelated words", 1),
            tool_with("Weather", "weather forecast", 1),
        ];

        let retrieval = strategy(embedder)
            .retrieve("check the clock then the weather forecast", &tools)
            .await
            .unwrap();

        assert_eq!(retrieval.candidates, vec!["Clock", "Weather"]);
    }

    #[tokio::test]
    async fn test_ranked_by_score_and_truncated() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let tools = vec![
            tool_with("A", "alpha", 1),
            tool_with("B", "alpha beta gamma", 1),
            tool_with("C", "alpha beta", 1),
        ];

        let retrieval = strategy(embedder)
            .retrieve("alpha beta", &tools)
            .await
            .unwrap();

        // C is identical to the request, B shares two of three words, A is below 0.5 after B/C
        assert_eq!(retrieval.candidates, vec!["C", "B"]);
    }

    #[tokio::test]
    async fn test_vectors_cached_per_version() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let retrieval = strategy(embedder.clone());
        let v1 = vec![tool_with("Clock", "tells time", 1)];

        retrieval.retrieve("time", &v1).await.unwrap();
        retrieval.retrieve("time please", &v1).await.unwrap();
        // two request embeddings + one tool embedding
        assert_eq!(embedder.calls(), 3);

        let v2 = vec![tool_with("Clock", "tells the time", 2)];
        retrieval.retrieve("time", &v2).await.unwrap();
        assert_eq!(embedder.calls(), 5);
        assert_eq!(retrieval.cached_vectors(), 1);
    }
}
