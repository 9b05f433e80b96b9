//! Deterministic hash-projection embedding provider.
//!
//! Projects text onto a unit vector derived from SHA-256 of its tokens. Not
//! semantically meaningful, but stable, dependency-free and dimension-exact,
//! which is what tests and lexical-leaning deployments need.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use mgr_domain::constants::search::LOCAL_EMBEDDING_DIMENSIONS;
use mgr_domain::error::Result;
use mgr_domain::ports::providers::EmbeddingProvider;

/// Hash-projection [`EmbeddingProvider`].
pub struct NullEmbeddingProvider {
    dimensions: usize,
}

impl NullEmbeddingProvider {
    /// Provider with an explicit dimension.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for token in text.to_lowercase().split_whitespace() {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_le_bytes(
                digest[..8].try_into().unwrap_or([0; 8]),
            ) as usize
                % self.dimensions;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for NullEmbeddingProvider {
    fn default() -> Self {
        Self::new(LOCAL_EMBEDDING_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "null"
    }
}

// ============================================================================
// Auto-registration via linkme distributed slice
// ============================================================================

use std::sync::Arc;

use mgr_domain::registry::embedding::{
    EMBEDDING_PROVIDERS, EmbeddingProviderConfig, EmbeddingProviderEntry,
};

fn null_factory(
    config: &EmbeddingProviderConfig,
) -> std::result::Result<Arc<dyn EmbeddingProvider>, String> {
    let dimensions = config.dimensions.unwrap_or(LOCAL_EMBEDDING_DIMENSIONS);
    Ok(Arc::new(NullEmbeddingProvider::new(dimensions)))
}

#[linkme::distributed_slice(EMBEDDING_PROVIDERS)]
static NULL_PROVIDER: EmbeddingProviderEntry = EmbeddingProviderEntry {
    name: "null",
    description: "Deterministic hash-projection embeddings (no ML runtime)",
    build: null_factory,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn vectors_are_deterministic_and_unit_norm() {
        let provider = NullEmbeddingProvider::default();
        let a = provider.embed("cloudflare docs search").await.expect("embed");
        let b = provider.embed("cloudflare docs search").await.expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), LOCAL_EMBEDDING_DIMENSIONS);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn different_texts_differ() {
        let provider = NullEmbeddingProvider::default();
        let a = provider.embed("weather forecast").await.expect("embed");
        let b = provider.embed("stock aggregates").await.expect("embed");
        assert_ne!(a, b);
    }
}
