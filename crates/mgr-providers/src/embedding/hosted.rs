//! Hosted embedding API provider.
//!
//! Speaks a minimal JSON contract: POST `{base_url}` with
//! `{"model": ..., "texts": [...]}` and a bearer key, answered by
//! `{"embeddings": [[f32; D]]}`. Default dimension is 1024.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use mgr_domain::constants::search::HOSTED_EMBEDDING_DIMENSIONS;
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::EmbeddingProvider;

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP-backed [`EmbeddingProvider`].
pub struct HostedEmbeddingProvider {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

impl HostedEmbeddingProvider {
    /// Create a provider against an embedding endpoint.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        dimensions: usize,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::config_with_source("failed to build embedding HTTP client", e))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HostedEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.http.post(&self.base_url).json(&serde_json::json!({
            "model": self.model,
            "texts": texts,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::embedding(format!("embedding request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::embedding(format!(
                "embedding API returned {}",
                response.status()
            )));
        }

        let payload: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("malformed embedding response: {e}")))?;

        for vector in &payload.embeddings {
            if vector.len() != self.dimensions {
                return Err(Error::embedding(format!(
                    "embedding API returned dimension {}, expected {}",
                    vector.len(),
                    self.dimensions
                )));
            }
        }
        Ok(payload.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "hosted"
    }
}

// ============================================================================
// Auto-registration via linkme distributed slice
// ============================================================================

use std::sync::Arc;

use mgr_domain::registry::embedding::{
    EMBEDDING_PROVIDERS, EmbeddingProviderConfig, EmbeddingProviderEntry,
};

fn hosted_factory(
    config: &EmbeddingProviderConfig,
) -> std::result::Result<Arc<dyn EmbeddingProvider>, String> {
    let base_url = config
        .base_url
        .clone()
        .ok_or_else(|| "hosted embedding provider requires base_url".to_owned())?;
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| "embed-v3".to_owned());
    let dimensions = config.dimensions.unwrap_or(HOSTED_EMBEDDING_DIMENSIONS);
    let provider =
        HostedEmbeddingProvider::new(base_url, model, config.api_key.clone(), dimensions)
            .map_err(|e| e.to_string())?;
    Ok(Arc::new(provider))
}

#[linkme::distributed_slice(EMBEDDING_PROVIDERS)]
static HOSTED_PROVIDER: EmbeddingProviderEntry = EmbeddingProviderEntry {
    name: "hosted",
    description: "Hosted embedding API (1024-dim)",
    build: hosted_factory,
};
