//! File storage backend.
//!
//! One JSON file per entity under `{root}/{namespace}/{kind}/`, a
//! `{kind}_state.json` sidecar carrying only the enabled flags (so a toggle
//! never rewrites whole entities), and an in-memory cosine sidecar over the
//! embeddings directory for approximate nearest-neighbor search.

mod entity_repos;
mod federation_repository;
mod scan_repository;
mod scope_repository;
mod search_index;
mod store;

pub use entity_repos::{FileAgentRepository, FileServerRepository, FileSkillRepository};
pub use federation_repository::FileFederationRepository;
pub use scan_repository::FileScanRepository;
pub use scope_repository::FileScopeRepository;
pub use search_index::FileSearchIndex;
