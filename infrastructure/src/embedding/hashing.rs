//! Feature-hashing embedder
//!
//! Each lowercase word is hashed into one of `dimension` buckets and the
//! resulting count vector is L2-normalized. No model, no network; texts
//! sharing words score higher under cosine similarity.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use toolforge_application::ports::ai_gateway::GatewayError;
use toolforge_application::ports::embedding::EmbeddingPort;
use toolforge_domain::core::string::words;
use toolforge_domain::retrieval::normalize;

const DEFAULT_DIMENSION: usize = 64;

pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for word in words(text) {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let index = (hasher.finish() as usize) % self.dimension;
            vector[index] += 1.0;
        }
        normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingPort for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        Ok(self.embed_sync(text))
    }
}
