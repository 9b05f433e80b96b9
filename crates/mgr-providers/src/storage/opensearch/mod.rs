//! Distributed-index storage backend.
//!
//! Documents live in six OpenSearch-compatible indices suffixed by
//! namespace. Mappings declare keyword fields for exact matching, analyzed
//! text fields for lexical scoring, nested types for per-element matching on
//! tools/skills, and a `knn_vector` of fixed dimension for the semantic
//! sub-query.

mod client;
mod entity_repos;
mod mappings;
mod misc_repos;
mod search_index;

pub use client::{OpenSearchClient, OpenSearchSettings};
pub use entity_repos::{OsAgentRepository, OsServerRepository, OsSkillRepository};
pub use misc_repos::{OsFederationRepository, OsScanRepository, OsScopeRepository};
pub use search_index::OsSearchIndex;
