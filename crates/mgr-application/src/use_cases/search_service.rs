//! Hybrid Search Use Case
//!
//! # Overview
//! Ranks servers, agents and tools against a free-form query. In hybrid mode
//! the score is a weighted fusion of a BM25 sub-query and a k-NN sub-query,
//! both min–max normalized, followed by a field-weighted text-boost pass. If
//! embedding generation fails once, the process latches into lexical-only
//! mode: the error is cached, the embedder is never called again, and scores
//! come from the text boost alone. Recovery is restart-scoped.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use mgr_domain::constants::search::{
    BOOST_DESCRIPTION, BOOST_NAME, BOOST_PATH, BOOST_TAG, BOOST_TOOL_OR_SKILL, MAX_LEXICAL_BOOST,
    SEARCH_TIMEOUT_SECS,
};
use mgr_domain::entities::{Agent, EmbeddingDocument, McpServer};
use mgr_domain::error::Result;
use mgr_domain::ports::repositories::{ScoredDocument, SearchIndexRepository};
use mgr_domain::ports::providers::EmbeddingProvider;
use mgr_domain::ports::services::SearchServiceInterface;
use mgr_domain::value_objects::{
    EntityType, GroupedSearchResults, HybridSearchSettings, Namespace, SearchHit, SearchMode,
    SearchRequest, ServerPath, ToolHit,
};

use crate::support::retry::with_backoff;

/// Candidate pool fetched from each sub-query before fusion.
const CANDIDATE_POOL: usize = 50;

/// Implementation of the `SearchServiceInterface`.
pub struct SearchServiceImpl {
    index: Arc<dyn SearchIndexRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    weights: HybridSearchSettings,
    /// First embedding failure, cached for the life of the process.
    embedding_failure: OnceLock<String>,
}

impl SearchServiceImpl {
    /// Create the service with injected dependencies.
    pub fn new(
        index: Arc<dyn SearchIndexRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        weights: HybridSearchSettings,
    ) -> Self {
        Self {
            index,
            embedder,
            weights,
            embedding_failure: OnceLock::new(),
        }
    }

    /// Whether the process has latched into lexical-only mode.
    #[must_use]
    pub fn embeddings_unavailable(&self) -> bool {
        self.embedding_failure.get().is_some()
    }

    fn current_mode(&self) -> SearchMode {
        if self.embeddings_unavailable() {
            SearchMode::LexicalOnly
        } else {
            SearchMode::Hybrid
        }
    }

    fn latch_embedding_failure(&self, err: &mgr_domain::error::Error) {
        let message = err.to_string();
        mgr_domain::warn!(
            "search",
            "embedding generation failed; latching lexical-only mode",
            &message
        );
        let _ = self.embedding_failure.set(message);
    }

    async fn embed_or_latch(&self, text: &str) -> Option<Vec<f32>> {
        if self.embeddings_unavailable() {
            return None;
        }
        match self.embedder.embed(text).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                self.latch_embedding_failure(&err);
                None
            }
        }
    }

    fn query_terms(query: &str) -> Vec<String> {
        query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.len() >= 2)
            .map(str::to_owned)
            .collect()
    }

    /// Field-weighted boost: each term contributes once per scalar field it
    /// hits and once per matching tool/skill.
    fn text_boost(doc: &EmbeddingDocument, terms: &[String]) -> f32 {
        let path = doc.path.as_str().to_lowercase();
        let name = doc.name.to_lowercase();
        let description = doc.description.to_lowercase();

        let mut boost = 0.0_f32;
        for term in terms {
            if path.contains(term.as_str()) {
                boost += BOOST_PATH;
            }
            if name.contains(term.as_str()) {
                boost += BOOST_NAME;
            }
            if description.contains(term.as_str()) {
                boost += BOOST_DESCRIPTION;
            }
            if doc.tags.iter().any(|t| t.to_lowercase().contains(term.as_str())) {
                boost += BOOST_TAG;
            }
            for item in doc.tools.iter().chain(&doc.skills) {
                if item.name.to_lowercase().contains(term.as_str())
                    || item.description.to_lowercase().contains(term.as_str())
                {
                    boost += BOOST_TOOL_OR_SKILL;
                }
            }
        }
        boost
    }

    fn min_max_scores(hits: &[ScoredDocument]) -> HashMap<String, f32> {
        let min = hits.iter().map(|h| h.score).fold(f32::INFINITY, f32::min);
        let max = hits
            .iter()
            .map(|h| h.score)
            .fold(f32::NEG_INFINITY, f32::max);
        let range = max - min;

        hits.iter()
            .map(|h| {
                let normalized = if range > f32::EPSILON {
                    (h.score - min) / range
                } else if h.score > 0.0 {
                    1.0
                } else {
                    0.0
                };
                (doc_key(&h.document), normalized)
            })
            .collect()
    }

    fn snippet(doc: &EmbeddingDocument, terms: &[String]) -> Option<String> {
        let text = &doc.text_for_embedding;
        let haystack = text.to_lowercase();
        let position = terms
            .iter()
            .find_map(|t| haystack.find(t.as_str()))?
            .min(text.len());

        // Lowercasing can shift byte offsets for non-ASCII text; clamp the
        // window to char boundaries of the original.
        let mut start = position.saturating_sub(60);
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }
        let mut end = (position + 120).min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end += 1;
        }
        (start < end).then(|| text[start..end].to_owned())
    }

    fn assemble(
        request: &SearchRequest,
        mode: SearchMode,
        mut ranked: Vec<(EmbeddingDocument, f32, f32)>,
        terms: &[String],
    ) -> GroupedSearchResults {
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| a.0.path.cmp(&b.0.path))
        });

        let mut results = GroupedSearchResults {
            search_mode: mode,
            ..GroupedSearchResults::default()
        };

        for (doc, score, _) in &ranked {
            if !doc.is_enabled && !request.include_disabled {
                continue;
            }
            if !request.wants(doc.entity_type) {
                continue;
            }

            let bucket = match doc.entity_type {
                EntityType::Server => &mut results.servers,
                EntityType::Agent => &mut results.agents,
            };
            if bucket.len() >= request.per_type_limit {
                continue;
            }
            bucket.push(SearchHit {
                entity_type: doc.entity_type,
                path: doc.path.clone(),
                name: doc.name.clone(),
                description: doc.description.clone(),
                relevance_score: *score,
                match_context: Self::snippet(doc, terms),
                metadata: doc.metadata.clone(),
            });
        }

        // Matching tools are raised into their own group, carrying the full
        // input schema from the stored server document.
        for (doc, score, _) in &ranked {
            if results.tools.len() >= request.max_results {
                break;
            }
            if doc.entity_type != EntityType::Server
                || (!doc.is_enabled && !request.include_disabled)
            {
                continue;
            }
            let Ok(server) = serde_json::from_value::<McpServer>(doc.metadata.clone()) else {
                continue;
            };
            for tool in &server.tool_list {
                let matched = terms.iter().any(|t| {
                    tool.name.to_lowercase().contains(t.as_str())
                        || tool.description.to_lowercase().contains(t.as_str())
                });
                if matched && results.tools.len() < request.max_results {
                    results.tools.push(ToolHit {
                        server_path: server.path.clone(),
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        input_schema: tool.input_schema.clone(),
                        relevance_score: *score,
                    });
                }
            }
        }

        results
    }

    fn rank_lexical_only(
        candidates: Vec<ScoredDocument>,
        terms: &[String],
    ) -> Vec<(EmbeddingDocument, f32, f32)> {
        candidates
            .into_iter()
            .filter_map(|hit| {
                let boost = Self::text_boost(&hit.document, terms);
                if boost <= 0.0 {
                    return None;
                }
                let score = (boost / MAX_LEXICAL_BOOST).min(1.0);
                Some((hit.document, score, boost))
            })
            .collect()
    }

    fn rank_hybrid(
        &self,
        lexical: Vec<ScoredDocument>,
        knn: Vec<ScoredDocument>,
        terms: &[String],
    ) -> Vec<(EmbeddingDocument, f32, f32)> {
        let lexical_norm = Self::min_max_scores(&lexical);
        let knn_norm = Self::min_max_scores(&knn);

        let mut docs: HashMap<String, EmbeddingDocument> = HashMap::new();
        for hit in lexical.into_iter().chain(knn) {
            docs.entry(doc_key(&hit.document)).or_insert(hit.document);
        }

        docs.into_iter()
            .map(|(key, doc)| {
                let bm25 = lexical_norm.get(&key).copied().unwrap_or(0.0);
                let semantic = knn_norm.get(&key).copied().unwrap_or(0.0);
                let fused =
                    self.weights.bm25_weight * bm25 + self.weights.knn_weight * semantic;
                let boost = Self::text_boost(&doc, terms);
                let score = (fused + boost / MAX_LEXICAL_BOOST).min(1.0);
                (doc, score, boost)
            })
            .collect()
    }
}

fn doc_key(doc: &EmbeddingDocument) -> String {
    format!("{}:{}", doc.entity_type, doc.path)
}

#[async_trait]
impl SearchServiceInterface for SearchServiceImpl {
    async fn search(
        &self,
        ns: &Namespace,
        request: &SearchRequest,
    ) -> Result<GroupedSearchResults> {
        let query = request.query.trim();
        if query.is_empty() {
            return Ok(GroupedSearchResults {
                search_mode: self.current_mode(),
                ..GroupedSearchResults::default()
            });
        }

        let terms = Self::query_terms(query);
        let ranked = tokio::time::timeout(
            std::time::Duration::from_secs(SEARCH_TIMEOUT_SECS),
            async {
                let lexical = with_backoff("search.lexical", || {
                    self.index.lexical(ns, query, CANDIDATE_POOL)
                })
                .await?;

                match self.embed_or_latch(query).await {
                    Some(vector) => {
                        let knn = with_backoff("search.knn", || {
                            self.index.knn(ns, &vector, CANDIDATE_POOL)
                        })
                        .await?;
                        Ok::<Vec<(EmbeddingDocument, f32, f32)>, mgr_domain::error::Error>(
                            self.rank_hybrid(lexical, knn, &terms),
                        )
                    }
                    None => Ok(Self::rank_lexical_only(lexical, &terms)),
                }
            },
        )
        .await
        .map_err(|_| {
            mgr_domain::error::Error::transient(format!(
                "search exceeded {SEARCH_TIMEOUT_SECS}s deadline"
            ))
        })??;

        Ok(Self::assemble(request, self.current_mode(), ranked, &terms))
    }

    async fn index_server(&self, ns: &Namespace, server: &McpServer) -> Result<()> {
        let text = mgr_domain::entities::embedding::server_embedding_text(server);
        let vector = self.embed_or_latch(&text).await.unwrap_or_default();
        let doc = EmbeddingDocument::for_server(server, vector);
        with_backoff("search.index_server", || self.index.upsert(ns, &doc)).await
    }

    async fn index_agent(&self, ns: &Namespace, agent: &Agent) -> Result<()> {
        let text = mgr_domain::entities::embedding::agent_embedding_text(agent);
        let vector = self.embed_or_latch(&text).await.unwrap_or_default();
        let doc = EmbeddingDocument::for_agent(agent, vector);
        with_backoff("search.index_agent", || self.index.upsert(ns, &doc)).await
    }

    async fn remove(
        &self,
        ns: &Namespace,
        entity_type: EntityType,
        path: &ServerPath,
    ) -> Result<()> {
        with_backoff("search.remove", || self.index.delete(ns, entity_type, path)).await
    }
}
