//! Embedding port
//!
//! Turns text into fixed-length vectors for embedding retrieval.

use super::ai_gateway::GatewayError;
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError>;
}
