//! Storage backends.
//!
//! Two interchangeable implementations of the repository ports, selected at
//! bootstrap: a JSON-file backend for single-node development and an
//! OpenSearch-compatible distributed index for production.

#[cfg(feature = "storage-file")]
pub mod file;
#[cfg(feature = "storage-opensearch")]
pub mod opensearch;

/// Encode an entity path as a flat document/file id
/// (`/peer-a/fininfo` → `peer-a__fininfo`).
pub(crate) fn doc_id(path: &str) -> String {
    path.trim_start_matches('/').replace('/', "__")
}
