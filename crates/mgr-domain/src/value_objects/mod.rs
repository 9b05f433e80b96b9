//! Value objects: validated identifiers, namespaces, search shapes, and the
//! per-request auth context.

pub mod auth;
pub mod config;
pub mod ids;
pub mod namespace;
pub mod search;

pub use auth::{AccessDecision, AuthContext, RequestedAccess};
pub use config::HybridSearchSettings;
pub use ids::{PeerId, ServerPath};
pub use namespace::Namespace;
pub use search::{
    EntityType, GroupedSearchResults, SearchHit, SearchMode, SearchRequest, ToolHit,
};
