//! Index-backed embedding store and search sub-queries.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use mgr_domain::constants::search::KNN_EF_SEARCH;
use mgr_domain::constants::storage::{ALL_INDEX_BASES, INDEX_EMBEDDINGS};
use mgr_domain::entities::EmbeddingDocument;
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::repositories::{ScoredDocument, SearchIndexRepository};
use mgr_domain::value_objects::{EntityType, Namespace, ServerPath};

use crate::storage::doc_id;

use super::client::{OpenSearchClient, parse_hit};
use super::mappings::mapping_for;

/// Index-backed [`SearchIndexRepository`]; also owns namespace index
/// initialization for the whole backend.
pub struct OsSearchIndex {
    client: Arc<OpenSearchClient>,
}

impl OsSearchIndex {
    /// Create the index facade over a shared client.
    #[must_use]
    pub fn new(client: Arc<OpenSearchClient>) -> Self {
        Self { client }
    }

    fn index(ns: &Namespace) -> String {
        ns.index_name(INDEX_EMBEDDINGS)
    }

    fn embedding_id(entity_type: EntityType, path: &ServerPath) -> String {
        format!("{entity_type}__{}", doc_id(path.as_str()))
    }

    /// Dimension declared in an existing embeddings index mapping.
    async fn mapped_dimensions(&self, ns: &Namespace) -> Result<Option<usize>> {
        let index = Self::index(ns);
        let Some(mapping) = self.client.get_mapping(&index).await? else {
            return Ok(None);
        };
        Ok(mapping
            .pointer(&format!("/{index}/mappings/properties/embedding/dimension"))
            .and_then(Value::as_u64)
            .map(|d| d as usize))
    }
}

#[async_trait]
impl SearchIndexRepository for OsSearchIndex {
    async fn ensure_indices(
        &self,
        ns: &Namespace,
        dimensions: usize,
        recreate: bool,
    ) -> Result<()> {
        for base in ALL_INDEX_BASES {
            let index = ns.index_name(base);
            if recreate {
                self.client.delete_index(&index).await?;
            }
            if self.client.index_exists(&index).await? {
                if *base == INDEX_EMBEDDINGS {
                    if let Some(existing) = self.mapped_dimensions(ns).await? {
                        if existing != dimensions {
                            return Err(Error::backend_data(format!(
                                "embeddings index of namespace '{ns}' is dimension {existing}, requested {dimensions}; reindex required"
                            )));
                        }
                    }
                }
                continue;
            }
            self.client
                .create_index(&index, &mapping_for(base, dimensions))
                .await?;
            mgr_domain::info!("storage", "created index", &index);
        }
        Ok(())
    }

    async fn upsert(&self, ns: &Namespace, doc: &EmbeddingDocument) -> Result<()> {
        let body = serde_json::to_value(doc)?;
        self.client
            .put_doc(
                &Self::index(ns),
                &Self::embedding_id(doc.entity_type, &doc.path),
                &body,
                false,
            )
            .await
    }

    async fn delete(
        &self,
        ns: &Namespace,
        entity_type: EntityType,
        path: &ServerPath,
    ) -> Result<()> {
        self.client
            .delete_doc(&Self::index(ns), &Self::embedding_id(entity_type, path))
            .await
    }

    async fn lexical(
        &self,
        ns: &Namespace,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let body = json!({
            "size": limit,
            "query": {
                "bool": {
                    "should": [
                        {
                            "multi_match": {
                                "query": query,
                                "fields": ["name^3", "description^2", "text_for_embedding"]
                            }
                        },
                        {
                            "nested": {
                                "path": "tools",
                                "query": {
                                    "multi_match": {
                                        "query": query,
                                        "fields": ["tools.name", "tools.description"]
                                    }
                                }
                            }
                        },
                        {
                            "nested": {
                                "path": "skills",
                                "query": {
                                    "multi_match": {
                                        "query": query,
                                        "fields": ["skills.name", "skills.description"]
                                    }
                                }
                            }
                        }
                    ]
                }
            }
        });

        let hits = self.client.search(&Self::index(ns), &body).await?;
        hits.iter()
            .map(|h| {
                parse_hit::<EmbeddingDocument>(h).map(|(document, score)| ScoredDocument {
                    document,
                    score,
                })
            })
            .collect()
    }

    async fn knn(
        &self,
        ns: &Namespace,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let body = json!({
            "size": limit,
            "query": {
                "knn": {
                    "embedding": {
                        "vector": vector,
                        "k": limit,
                        "method_parameters": {"ef_search": KNN_EF_SEARCH}
                    }
                }
            }
        });

        let hits = self.client.search(&Self::index(ns), &body).await?;
        hits.iter()
            .map(|h| {
                parse_hit::<EmbeddingDocument>(h).map(|(document, score)| ScoredDocument {
                    document,
                    score,
                })
            })
            .collect()
    }
}
