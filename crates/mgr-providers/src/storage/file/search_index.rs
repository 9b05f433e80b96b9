//! File-backed search index with an in-memory vector sidecar.
//!
//! Embedding documents live as JSON files; the sidecar cache is rebuilt
//! lazily from the embeddings directory and answers both sub-queries:
//! term-frequency scoring for the lexical pass and exact cosine similarity
//! for the k-NN pass. Good enough for single-node development; the
//! distributed backend owns production retrieval.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use mgr_domain::entities::EmbeddingDocument;
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::repositories::{ScoredDocument, SearchIndexRepository};
use mgr_domain::value_objects::{EntityType, Namespace, ServerPath};

use super::store::JsonStore;

fn cache_key(entity_type: EntityType, path: &ServerPath) -> String {
    format!("{entity_type}:{path}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
struct IndexMeta {
    dimensions: usize,
}

/// File-backed [`SearchIndexRepository`].
pub struct FileSearchIndex {
    store: JsonStore,
    meta: JsonStore,
    /// Sidecar cache, one map per namespace.
    cache: RwLock<HashMap<String, HashMap<String, EmbeddingDocument>>>,
}

impl FileSearchIndex {
    /// Create an index rooted at the storage directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            store: JsonStore::new(root.clone(), "embeddings"),
            meta: JsonStore::new(root, "embeddings_meta"),
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn dimensions(&self, ns: &Namespace) -> Result<Option<usize>> {
        let meta: Option<IndexMeta> = self.meta.read(ns, "index").await?;
        Ok(meta.map(|m| m.dimensions))
    }

    async fn load_cache(&self, ns: &Namespace) -> Result<HashMap<String, EmbeddingDocument>> {
        {
            let cache = self.cache.read().await;
            if let Some(cache) = cache.get(ns.as_str()) {
                return Ok(cache.clone());
            }
        }

        let docs: Vec<EmbeddingDocument> = self.store.list(ns).await?;
        let map: HashMap<String, EmbeddingDocument> = docs
            .into_iter()
            .map(|d| (cache_key(d.entity_type, &d.path), d))
            .collect();
        self.cache
            .write()
            .await
            .insert(ns.as_str().to_owned(), map.clone());
        Ok(map)
    }

    fn term_frequency(doc: &EmbeddingDocument, terms: &[String]) -> f32 {
        let mut score = 0.0_f32;
        let fields = [
            (doc.name.to_lowercase(), 3.0),
            (doc.description.to_lowercase(), 2.0),
            (doc.text_for_embedding.to_lowercase(), 1.0),
        ];
        for term in terms {
            for (field, weight) in &fields {
                score += field.matches(term.as_str()).count() as f32 * weight;
            }
            for item in doc.tools.iter().chain(&doc.skills) {
                if item.name.to_lowercase().contains(term.as_str())
                    || item.description.to_lowercase().contains(term.as_str())
                {
                    score += 1.0;
                }
            }
        }
        score
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }

    fn top(mut scored: Vec<ScoredDocument>, limit: usize) -> Vec<ScoredDocument> {
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.path.cmp(&b.document.path))
        });
        scored.truncate(limit);
        scored
    }
}

#[async_trait]
impl SearchIndexRepository for FileSearchIndex {
    async fn ensure_indices(
        &self,
        ns: &Namespace,
        dimensions: usize,
        recreate: bool,
    ) -> Result<()> {
        if recreate {
            let docs = self.load_cache(ns).await?;
            for doc in docs.values() {
                self.store
                    .remove(ns, &format!("{}__{}", doc.entity_type, doc.path.as_str()))
                    .await?;
            }
            self.cache
                .write()
                .await
                .insert(ns.as_str().to_owned(), HashMap::new());
        } else if let Some(existing) = self.dimensions(ns).await? {
            if existing != dimensions {
                return Err(Error::backend_data(format!(
                    "embedding index of namespace '{ns}' is dimension {existing}, requested {dimensions}; reindex required"
                )));
            }
            return Ok(());
        }
        self.meta.write(ns, "index", &IndexMeta { dimensions }).await
    }

    async fn upsert(&self, ns: &Namespace, doc: &EmbeddingDocument) -> Result<()> {
        if let Some(dimensions) = self.dimensions(ns).await? {
            if !doc.embedding.is_empty() && doc.embedding.len() != dimensions {
                return Err(Error::backend_data(format!(
                    "embedding dimension {} does not match index dimension {dimensions}",
                    doc.embedding.len()
                )));
            }
        }

        let _guard = self.store.write_lock.lock().await;
        self.store
            .write(ns, &format!("{}__{}", doc.entity_type, doc.path.as_str()), doc)
            .await?;

        let mut cache = self.cache.write().await;
        if let Some(cache) = cache.get_mut(ns.as_str()) {
            cache.insert(cache_key(doc.entity_type, &doc.path), doc.clone());
        }
        Ok(())
    }

    async fn delete(
        &self,
        ns: &Namespace,
        entity_type: EntityType,
        path: &ServerPath,
    ) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        self.store
            .remove(ns, &format!("{entity_type}__{}", path.as_str()))
            .await?;

        let mut cache = self.cache.write().await;
        if let Some(cache) = cache.get_mut(ns.as_str()) {
            cache.remove(&cache_key(entity_type, path));
        }
        Ok(())
    }

    async fn lexical(
        &self,
        ns: &Namespace,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        let docs = self.load_cache(ns).await?;

        let scored: Vec<ScoredDocument> = docs
            .into_values()
            .filter_map(|doc| {
                let score = Self::term_frequency(&doc, &terms);
                (score > 0.0).then_some(ScoredDocument {
                    document: doc,
                    score,
                })
            })
            .collect();
        Ok(Self::top(scored, limit))
    }

    async fn knn(
        &self,
        ns: &Namespace,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let docs = self.load_cache(ns).await?;
        let scored: Vec<ScoredDocument> = docs
            .into_values()
            .filter(|doc| !doc.embedding.is_empty())
            .map(|doc| {
                let score = Self::cosine(vector, &doc.embedding);
                ScoredDocument {
                    document: doc,
                    score,
                }
            })
            .collect();
        Ok(Self::top(scored, limit))
    }
}
