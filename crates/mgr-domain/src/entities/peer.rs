//! Peer registry, sync status, and federation export payloads.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::federation::{MAX_SYNC_INTERVAL_MINUTES, MIN_SYNC_INTERVAL_MINUTES};
use crate::error::{Error, Result};
use crate::value_objects::ids::{PeerId, ServerPath};

use super::server::{ToolDef, Transport, Visibility};

/// Which items a peer sync accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Everything the peer exports as public
    #[default]
    #[display("all")]
    All,
    /// Only whitelisted paths
    #[display("whitelist")]
    Whitelist,
    /// Only items whose tags intersect the filter set
    #[display("tag_filter")]
    TagFilter,
}

/// How to authenticate against a peer's export endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeerAuthType {
    /// No credentials
    #[default]
    #[display("none")]
    None,
    /// `X-Api-Key` header
    #[display("api_key")]
    ApiKey,
    /// OAuth2 client credentials
    #[display("oauth2")]
    Oauth2,
    /// Pre-shared bearer token
    #[display("static_token")]
    StaticToken,
}

/// Peer credentials; keys depend on the auth type
/// (`token`, `api_key`, `client_id`, `client_secret`, `token_url`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAuth {
    /// Authentication scheme
    #[serde(default)]
    pub auth_type: PeerAuthType,
    /// Scheme-specific credential material
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
}

/// A configured federation peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRegistry {
    /// Unique peer identifier
    pub peer_id: PeerId,
    /// Display name
    pub name: String,
    /// Base URL of the peer registry
    pub endpoint: String,
    /// Whether sync runs for this peer
    #[serde(default)]
    pub enabled: bool,
    /// Filtering mode applied to the peer's export
    #[serde(default)]
    pub sync_mode: SyncMode,
    /// Server paths accepted in whitelist mode
    #[serde(default)]
    pub whitelist_servers: Vec<String>,
    /// Agent paths accepted in whitelist mode
    #[serde(default)]
    pub whitelist_agents: Vec<String>,
    /// Tags accepted in tag-filter mode
    #[serde(default)]
    pub tag_filters: Vec<String>,
    /// Minutes between pull syncs, in `[5, 1440]`
    pub sync_interval_minutes: u32,
    /// Credentials for the peer's export endpoint
    #[serde(default)]
    pub auth: PeerAuth,
}

impl PeerRegistry {
    /// Validate cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when the sync interval is out of range or the
    /// endpoint is not an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_SYNC_INTERVAL_MINUTES..=MAX_SYNC_INTERVAL_MINUTES)
            .contains(&self.sync_interval_minutes)
        {
            return Err(Error::bad_request_field(
                format!(
                    "sync_interval_minutes must be within [{MIN_SYNC_INTERVAL_MINUTES}, {MAX_SYNC_INTERVAL_MINUTES}]"
                ),
                "sync_interval_minutes",
            ));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(Error::bad_request_field(
                "endpoint must be an absolute http(s) URL",
                "endpoint",
            ));
        }
        Ok(())
    }

    /// Whether an exported item passes this peer's filter.
    #[must_use]
    pub fn accepts(&self, path: &str, tags: &[String], is_agent: bool) -> bool {
        match self.sync_mode {
            SyncMode::All => true,
            SyncMode::Whitelist => {
                let list = if is_agent {
                    &self.whitelist_agents
                } else {
                    &self.whitelist_servers
                };
                list.iter().any(|p| p == path)
            }
            SyncMode::TagFilter => tags.iter().any(|t| self.tag_filters.contains(t)),
        }
    }
}

/// Durable sync bookkeeping for one peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSyncStatus {
    /// The peer this status belongs to
    pub peer_id: PeerId,
    /// Whether recent syncs have been succeeding
    pub is_healthy: bool,
    /// Last health probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<DateTime<Utc>>,
    /// Last sync that completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_sync: Option<DateTime<Utc>>,
    /// Last sync that started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_attempt: Option<DateTime<Utc>>,
    /// Monotonic generation; advanced once per successful sync
    pub current_generation: u64,
    /// Servers imported over the lifetime of the peer
    pub total_servers_synced: u64,
    /// Agents imported over the lifetime of the peer
    pub total_agents_synced: u64,
    /// Durable same-peer exclusion flag
    pub sync_in_progress: bool,
    /// Failures since the last success
    pub consecutive_failures: u32,
}

impl PeerSyncStatus {
    /// Fresh status for a newly registered peer.
    #[must_use]
    pub fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            is_healthy: true,
            last_health_check: None,
            last_successful_sync: None,
            last_sync_attempt: None,
            current_generation: 0,
            total_servers_synced: 0,
            total_agents_synced: 0,
            sync_in_progress: false,
            consecutive_failures: 0,
        }
    }
}

/// Outcome of one sync run, returned to callers and recorded in audit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Generation this sync stamped
    pub generation: u64,
    /// Servers upserted
    pub servers_synced: u64,
    /// Agents upserted
    pub agents_synced: u64,
    /// Servers reclaimed as orphans
    pub servers_orphaned: u64,
    /// Agents reclaimed as orphans
    pub agents_orphaned: u64,
}

/// One server as it appears on the wire in a federation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerExportItem {
    /// Routing path on the exporting registry
    pub path: ServerPath,
    /// Display name
    pub server_name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Upstream URL
    pub proxy_pass_url: String,
    /// Supported transports
    #[serde(default)]
    pub supported_transports: Vec<Transport>,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Advertised tools
    #[serde(default)]
    pub tool_list: Vec<ToolDef>,
    /// Visibility on the exporting registry
    #[serde(default)]
    pub visibility: Visibility,
    /// Last mutation on the exporting registry
    pub updated_at: DateTime<Utc>,
}

/// Federation export payload for servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServersExport {
    /// Number of items
    pub total_count: usize,
    /// Exported servers
    pub items: Vec<ServerExportItem>,
    /// Exporting registry's current generation
    pub generation: u64,
}

/// One agent as it appears on the wire in a federation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExportItem {
    /// Routing path on the exporting registry
    pub path: ServerPath,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Upstream agent endpoint
    pub proxy_pass_url: String,
    /// A2A protocol version
    #[serde(default)]
    pub protocol_version: String,
    /// Skills as `(id, name, description)` is expanded client-side
    #[serde(default)]
    pub skills: Vec<super::agent::AgentSkill>,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Visibility on the exporting registry
    #[serde(default)]
    pub visibility: Visibility,
    /// Last mutation on the exporting registry
    pub updated_at: DateTime<Utc>,
}

/// Federation export payload for agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsExport {
    /// Number of items
    pub total_count: usize,
    /// Exported agents
    pub items: Vec<AgentExportItem>,
    /// Exporting registry's current generation
    pub generation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(sync_mode: SyncMode) -> PeerRegistry {
        PeerRegistry {
            peer_id: PeerId::new("peer-a").expect("valid"),
            name: "Peer A".to_owned(),
            endpoint: "https://peer-a.example.com".to_owned(),
            enabled: true,
            sync_mode,
            whitelist_servers: vec!["/fininfo".to_owned()],
            whitelist_agents: vec!["/travel-agent".to_owned()],
            tag_filters: vec!["prod".to_owned()],
            sync_interval_minutes: 30,
            auth: PeerAuth::default(),
        }
    }

    #[test]
    fn sync_interval_bounds() {
        let mut p = peer(SyncMode::All);
        p.sync_interval_minutes = 4;
        assert!(p.validate().is_err());
        p.sync_interval_minutes = 1441;
        assert!(p.validate().is_err());
        p.sync_interval_minutes = 5;
        assert!(p.validate().is_ok());
        p.sync_interval_minutes = 1440;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn whitelist_mode_filters_by_path() {
        let p = peer(SyncMode::Whitelist);
        assert!(p.accepts("/fininfo", &[], false));
        assert!(!p.accepts("/other", &[], false));
        assert!(p.accepts("/travel-agent", &[], true));
        assert!(!p.accepts("/fininfo", &[], true));
    }

    #[test]
    fn tag_filter_mode_intersects_tags() {
        let p = peer(SyncMode::TagFilter);
        assert!(p.accepts("/x", &["prod".to_owned()], false));
        assert!(!p.accepts("/x", &["dev".to_owned()], false));
    }
}
