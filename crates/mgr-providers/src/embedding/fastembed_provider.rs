//! FastEmbed local embedding provider (384-dim dense model).
//!
//! The model runs synchronously; batches go through `spawn_blocking` so the
//! async runtime never stalls on inference.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use mgr_domain::constants::search::LOCAL_EMBEDDING_DIMENSIONS;
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::EmbeddingProvider;

/// Local dense-model [`EmbeddingProvider`].
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    dimensions: usize,
}

impl FastEmbedProvider {
    /// Initialize the bundled all-MiniLM model.
    ///
    /// # Errors
    ///
    /// Returns an embedding error when model initialization fails (missing
    /// model files, unsupported platform).
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false),
        )
        .map_err(|e| Error::embedding(format!("failed to initialize fastembed: {e}")))?;
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimensions: LOCAL_EMBEDDING_DIMENSIONS,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let embeddings = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| "embedding model mutex poisoned".to_owned())?;
            model
                .embed(texts, None)
                .map_err(|e| format!("fastembed inference failed: {e}"))
        })
        .await
        .map_err(|e| Error::embedding(format!("embedding task panicked: {e}")))?
        .map_err(Error::embedding)?;
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}

// ============================================================================
// Auto-registration via linkme distributed slice
// ============================================================================

use mgr_domain::registry::embedding::{
    EMBEDDING_PROVIDERS, EmbeddingProviderConfig, EmbeddingProviderEntry,
};

fn fastembed_factory(
    _config: &EmbeddingProviderConfig,
) -> std::result::Result<Arc<dyn EmbeddingProvider>, String> {
    let provider = FastEmbedProvider::new().map_err(|e| e.to_string())?;
    Ok(Arc::new(provider))
}

#[linkme::distributed_slice(EMBEDDING_PROVIDERS)]
static FASTEMBED_PROVIDER: EmbeddingProviderEntry = EmbeddingProviderEntry {
    name: "fastembed",
    description: "Local all-MiniLM dense model (384-dim)",
    build: fastembed_factory,
};
