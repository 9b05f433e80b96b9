//! Repository port traits.
//!
//! Each backend (file, distributed index) implements the full set. The
//! contracts every implementation honors:
//!
//! - `get` returns the canonical document or `NotFound`, never partial state.
//! - `create` fails with `Conflict` when the uniqueness key already exists.
//! - `update` replaces the document atomically; when an expected
//!   `updated_at` is supplied, a mismatch fails with `Conflict` (optimistic
//!   concurrency).
//! - `delete` is unconditional; a later `get` returns `NotFound`.
//! - `list_all` is snapshot-consistent for a single call.
//! - Transient I/O surfaces as `TransientBackend` (retried by the service
//!   layer); malformed stored documents surface as `BackendData`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    Agent, EmbeddingDocument, FederationConfig, McpServer, PeerRegistry, PeerSyncStatus,
    ScopeDocument, ScopeFile, SecurityScanResult, Skill,
};
use crate::entities::scope::{GroupMapping, ServerScope};
use crate::error::Result;
use crate::value_objects::{EntityType, Namespace, PeerId, ServerPath};

/// Server (and virtual server) storage.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Fetch one server by path.
    async fn get(&self, ns: &Namespace, path: &ServerPath) -> Result<McpServer>;

    /// Store a new server; `Conflict` when the path exists.
    async fn create(&self, ns: &Namespace, server: &McpServer) -> Result<()>;

    /// Replace an existing server. When `expected_updated_at` is given, the
    /// stored `updated_at` must match or the call fails with `Conflict`.
    async fn update(
        &self,
        ns: &Namespace,
        server: &McpServer,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Create-or-replace without conflict checking (federation refresh).
    async fn upsert(&self, ns: &Namespace, server: &McpServer) -> Result<()>;

    /// Remove a server.
    async fn delete(&self, ns: &Namespace, path: &ServerPath) -> Result<()>;

    /// All servers in the namespace.
    async fn list_all(&self, ns: &Namespace) -> Result<Vec<McpServer>>;

    /// Servers federated from one origin peer (or external source id).
    /// Orphan reclamation walks this list comparing generations, so embedding
    /// documents can be cascaded per item.
    async fn list_by_origin(&self, ns: &Namespace, origin: &PeerId) -> Result<Vec<McpServer>>;
}

/// Agent storage; mirrors [`ServerRepository`].
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Fetch one agent by path.
    async fn get(&self, ns: &Namespace, path: &ServerPath) -> Result<Agent>;

    /// Store a new agent; `Conflict` when the path exists.
    async fn create(&self, ns: &Namespace, agent: &Agent) -> Result<()>;

    /// Replace an existing agent, optionally with optimistic checking.
    async fn update(
        &self,
        ns: &Namespace,
        agent: &Agent,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Create-or-replace without conflict checking (federation refresh).
    async fn upsert(&self, ns: &Namespace, agent: &Agent) -> Result<()>;

    /// Remove an agent.
    async fn delete(&self, ns: &Namespace, path: &ServerPath) -> Result<()>;

    /// All agents in the namespace.
    async fn list_all(&self, ns: &Namespace) -> Result<Vec<Agent>>;

    /// Agents federated from one origin peer (or external source id).
    async fn list_by_origin(&self, ns: &Namespace, origin: &PeerId) -> Result<Vec<Agent>>;
}

/// Skill storage.
#[async_trait]
pub trait SkillRepository: Send + Sync {
    /// Fetch one skill by path.
    async fn get(&self, ns: &Namespace, path: &ServerPath) -> Result<Skill>;

    /// Store a new skill; `Conflict` when the path exists.
    async fn create(&self, ns: &Namespace, skill: &Skill) -> Result<()>;

    /// Replace an existing skill, optionally with optimistic checking.
    async fn update(
        &self,
        ns: &Namespace,
        skill: &Skill,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Remove a skill.
    async fn delete(&self, ns: &Namespace, path: &ServerPath) -> Result<()>;

    /// All skills in the namespace.
    async fn list_all(&self, ns: &Namespace) -> Result<Vec<Skill>>;
}

/// Scope document storage.
#[async_trait]
pub trait ScopeRepository: Send + Sync {
    /// Create-or-replace a scope document.
    async fn put(&self, ns: &Namespace, doc: &ScopeDocument) -> Result<()>;

    /// FGAC scope by name.
    async fn get_server_scope(&self, ns: &Namespace, scope_name: &str)
        -> Result<Option<ServerScope>>;

    /// Group mapping by group name.
    async fn get_group_mapping(
        &self,
        ns: &Namespace,
        group_name: &str,
    ) -> Result<Option<GroupMapping>>;

    /// All scope documents in the namespace.
    async fn list_all(&self, ns: &Namespace) -> Result<Vec<ScopeDocument>>;

    /// Remove a scope document by discriminator and key.
    async fn delete(&self, ns: &Namespace, scope_type: &str, key: &str) -> Result<()>;

    /// Bulk-load a scope file; returns how many documents were stored.
    async fn load_file(&self, ns: &Namespace, file: ScopeFile) -> Result<usize>;
}

/// Security-scan history storage.
#[async_trait]
pub trait SecurityScanRepository: Send + Sync {
    /// Append one scan result; history is never overwritten.
    async fn append(&self, ns: &Namespace, result: &SecurityScanResult) -> Result<()>;

    /// Most recent scan of a server, if any.
    async fn latest(&self, ns: &Namespace, path: &ServerPath)
        -> Result<Option<SecurityScanResult>>;

    /// Full scan history of a server, newest first.
    async fn history(&self, ns: &Namespace, path: &ServerPath) -> Result<Vec<SecurityScanResult>>;

    /// Remove all scans of a server (registry delete cascade).
    async fn delete_for(&self, ns: &Namespace, path: &ServerPath) -> Result<()>;
}

/// Peer registry, sync status, and federation config storage.
#[async_trait]
pub trait FederationRepository: Send + Sync {
    /// Fetch one peer by id.
    async fn get_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<PeerRegistry>;

    /// Create-or-replace a peer.
    async fn put_peer(&self, ns: &Namespace, peer: &PeerRegistry) -> Result<()>;

    /// Remove a peer.
    async fn delete_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<()>;

    /// All configured peers.
    async fn list_peers(&self, ns: &Namespace) -> Result<Vec<PeerRegistry>>;

    /// Sync status of one peer, if any sync has run.
    async fn get_status(&self, ns: &Namespace, peer_id: &PeerId)
        -> Result<Option<PeerSyncStatus>>;

    /// Store a peer's sync status.
    async fn put_status(&self, ns: &Namespace, status: &PeerSyncStatus) -> Result<()>;

    /// The singleton federation config; defaults when absent.
    async fn get_config(&self, ns: &Namespace) -> Result<FederationConfig>;

    /// Store the singleton federation config.
    async fn put_config(&self, ns: &Namespace, config: &FederationConfig) -> Result<()>;
}

/// One scored hit from a search sub-query.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    /// The matched embedding document
    pub document: EmbeddingDocument,
    /// Raw sub-query score (not yet normalized)
    pub score: f32,
}

/// Embedding index storage and sub-query execution.
///
/// Score fusion and normalization happen in the search service; this port
/// only answers the two sub-queries.
#[async_trait]
pub trait SearchIndexRepository: Send + Sync {
    /// Create the namespace's indices if missing; `recreate` drops first.
    /// The embedding dimension is fixed here for the namespace's lifetime.
    async fn ensure_indices(&self, ns: &Namespace, dimensions: usize, recreate: bool)
        -> Result<()>;

    /// Create-or-replace the embedding document for `(entity_type, path)`.
    /// A vector whose dimension disagrees with the index fails with
    /// `BackendData`.
    async fn upsert(&self, ns: &Namespace, doc: &EmbeddingDocument) -> Result<()>;

    /// Remove the embedding document for `(entity_type, path)`.
    async fn delete(&self, ns: &Namespace, entity_type: EntityType, path: &ServerPath)
        -> Result<()>;

    /// BM25 sub-query over name/description/text and nested tools/skills.
    async fn lexical(&self, ns: &Namespace, query: &str, limit: usize)
        -> Result<Vec<ScoredDocument>>;

    /// k-NN sub-query over the embedding field.
    async fn knn(&self, ns: &Namespace, vector: &[f32], limit: usize)
        -> Result<Vec<ScoredDocument>>;
}
