//! Federation configuration and topology.
//!
//! The topology is a star: peers and the two fixed external catalogs sync
//! into the local registry; edges always point source → local.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::constants::federation::FEDERATION_CONFIG_ID;

/// Where a catalog entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum FederationOrigin {
    /// Registered directly on this registry
    #[display("local")]
    Local,
    /// Pulled from a configured peer
    #[display("peer")]
    Peer,
    /// Pulled from the upstream protocol registry
    #[display("anthropic")]
    Anthropic,
    /// Pulled from the upstream agent registry
    #[display("asor")]
    Asor,
}

/// Settings for one fixed external catalog source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalSourceConfig {
    /// Whether the source syncs at all
    #[serde(default)]
    pub enabled: bool,
    /// Catalog endpoint
    #[serde(default)]
    pub endpoint: String,
    /// Environment variable holding the source credential, when required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_env_var: Option<String>,
    /// Whether a sync runs during startup
    #[serde(default)]
    pub sync_on_startup: bool,
    /// Specific item names to import; empty imports the whole catalog
    #[serde(default)]
    pub items: Vec<String>,
}

/// The singleton federation configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Fixed document id (`federation-config`)
    #[serde(default = "FederationConfig::default_config_id")]
    pub config_id: String,
    /// Upstream protocol registry (servers)
    #[serde(default)]
    pub anthropic: ExternalSourceConfig,
    /// Upstream agent registry (agents)
    #[serde(default)]
    pub asor: ExternalSourceConfig,
}

impl FederationConfig {
    fn default_config_id() -> String {
        FEDERATION_CONFIG_ID.to_owned()
    }

    /// Config with the fixed id and both sources disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            config_id: Self::default_config_id(),
            anthropic: ExternalSourceConfig::default(),
            asor: ExternalSourceConfig::default(),
        }
    }
}

/// One node in the unified topology snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationNode {
    /// Node identifier (`local`, peer id, or source name)
    pub node_id: String,
    /// Node kind
    pub node_type: FederationOrigin,
    /// Display name
    pub name: String,
    /// Endpoint, when the node is remote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Whether the node's last sync/health check succeeded
    pub healthy: bool,
    /// Last successful sync from this node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

/// One directed sync edge (always source → local).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationEdge {
    /// Sync source node id
    pub source: String,
    /// Sync target node id (the local registry)
    pub target: String,
}

/// Snapshot of the federation star.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationTopology {
    /// All known nodes, local first
    pub nodes: Vec<FederationNode>,
    /// Directed sync edges
    pub edges: Vec<FederationEdge>,
    /// When the snapshot was taken
    pub generated_at: DateTime<Utc>,
}
