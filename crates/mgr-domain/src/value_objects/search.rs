//! Search request and result shapes.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::constants::search::{DEFAULT_MAX_RESULTS, DEFAULT_PER_TYPE_LIMIT};
use crate::value_objects::ids::ServerPath;

/// Kind of entity behind an embedding document or search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// MCP server (including virtual servers)
    #[display("server")]
    Server,
    /// A2A agent
    #[display("agent")]
    Agent,
}

/// Mode the search engine answered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// BM25 + k-NN fusion
    #[display("hybrid")]
    Hybrid,
    /// Text-boost scoring only; embeddings unavailable this process
    #[display("lexical-only")]
    LexicalOnly,
}

/// A free-form relevance query against the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The query text; empty yields an empty grouped result
    pub query: String,
    /// Restrict to these entity types; `None` searches all
    #[serde(default)]
    pub entity_types: Option<Vec<EntityType>>,
    /// Overall result cap
    #[serde(default = "SearchRequest::default_max_results")]
    pub max_results: usize,
    /// Per-entity-type cap
    #[serde(default = "SearchRequest::default_per_type_limit")]
    pub per_type_limit: usize,
    /// Include disabled entities (admin callers only)
    #[serde(default)]
    pub include_disabled: bool,
}

impl SearchRequest {
    /// Build a request with defaults for everything but the query.
    #[must_use]
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            entity_types: None,
            max_results: DEFAULT_MAX_RESULTS,
            per_type_limit: DEFAULT_PER_TYPE_LIMIT,
            include_disabled: false,
        }
    }

    /// Whether the given entity type is in scope for this request.
    #[must_use]
    pub fn wants(&self, entity_type: EntityType) -> bool {
        self.entity_types
            .as_ref()
            .is_none_or(|ts| ts.contains(&entity_type))
    }

    fn default_max_results() -> usize {
        DEFAULT_MAX_RESULTS
    }

    fn default_per_type_limit() -> usize {
        DEFAULT_PER_TYPE_LIMIT
    }
}

/// One ranked server or agent hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Entity kind
    pub entity_type: EntityType,
    /// Routing path of the entity
    pub path: ServerPath,
    /// Display name
    pub name: String,
    /// Description indexed for the entity
    pub description: String,
    /// Fused relevance score in `[0, 1]`
    pub relevance_score: f32,
    /// Snippet around the strongest lexical match, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_context: Option<String>,
    /// Original entity metadata carried through the index
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// One ranked tool hit, raised out of its owning server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolHit {
    /// Path of the server exposing the tool
    pub server_path: ServerPath,
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Full JSON schema of the tool input
    pub input_schema: serde_json::Value,
    /// Relevance score inherited from the owning hit
    pub relevance_score: f32,
}

/// Grouped search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupedSearchResults {
    /// Ranked server hits
    pub servers: Vec<SearchHit>,
    /// Ranked agent hits
    pub agents: Vec<SearchHit>,
    /// Tools extracted from matching servers
    pub tools: Vec<ToolHit>,
    /// Mode the engine answered in
    pub search_mode: SearchMode,
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::Hybrid
    }
}
