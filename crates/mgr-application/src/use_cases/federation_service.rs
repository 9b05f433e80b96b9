//! Federation Engine Use Case
//!
//! # Overview
//! Generation-based pull replication. Each sync of a peer advances a
//! monotonic generation, stamps every imported copy with it, and then
//! reclaims copies from that peer left at an older generation (orphans).
//! Same-peer syncs are mutually exclusive through an in-memory lock plus the
//! durable `sync_in_progress` flag; different peers sync in parallel.
//!
//! The two fixed external catalogs (anthropic, asor) run through the same
//! engine behind adapters that translate their wire schemas; each source
//! tracks its own generation under a pseudo peer id.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use mgr_domain::constants::federation::{LOCAL_NODE_ID, UNHEALTHY_AFTER_FAILURES};
use mgr_domain::entities::{
    Agent, AgentExportItem, AgentsExport, FederationConfig, FederationEdge, FederationNode,
    FederationOrigin, FederationTopology, McpServer, PeerRegistry, PeerSyncStatus,
    ServerExportItem, ServersExport, SyncReport, Visibility,
};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::{ExternalCatalogAdapter, PeerCatalogClient};
use mgr_domain::ports::repositories::{AgentRepository, FederationRepository, ServerRepository};
use mgr_domain::ports::services::{
    FederationServiceInterface, PeerSyncOutcome, SearchServiceInterface,
};
use mgr_domain::value_objects::{Namespace, PeerId};

use crate::support::retry::with_backoff;

/// A durable `sync_in_progress` flag older than this is treated as stale
/// (left behind by a crashed process) and reclaimed.
const STALE_SYNC_FLAG_MINUTES: i64 = 60;

/// Implementation of the `FederationServiceInterface`.
pub struct FederationServiceImpl {
    federation: Arc<dyn FederationRepository>,
    servers: Arc<dyn ServerRepository>,
    agents: Arc<dyn AgentRepository>,
    peer_client: Arc<dyn PeerCatalogClient>,
    adapters: Vec<Arc<dyn ExternalCatalogAdapter>>,
    search: Arc<dyn SearchServiceInterface>,
    /// In-memory same-peer exclusion; does not survive restart.
    sync_locks: DashMap<String, Arc<Mutex<()>>>,
    local_name: String,
}

impl FederationServiceImpl {
    /// Create the service with injected dependencies.
    pub fn new(
        federation: Arc<dyn FederationRepository>,
        servers: Arc<dyn ServerRepository>,
        agents: Arc<dyn AgentRepository>,
        peer_client: Arc<dyn PeerCatalogClient>,
        adapters: Vec<Arc<dyn ExternalCatalogAdapter>>,
        search: Arc<dyn SearchServiceInterface>,
        local_name: String,
    ) -> Self {
        Self {
            federation,
            servers,
            agents,
            peer_client,
            adapters,
            search,
            sync_locks: DashMap::new(),
            local_name,
        }
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.sync_locks
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load_status(&self, ns: &Namespace, peer_id: &PeerId) -> Result<PeerSyncStatus> {
        Ok(self
            .federation
            .get_status(ns, peer_id)
            .await?
            .unwrap_or_else(|| PeerSyncStatus::new(peer_id.clone())))
    }

    /// Guard the durable flag: a concurrent sync is in progress unless the
    /// flag is stale.
    fn check_durable_flag(status: &PeerSyncStatus) -> Result<()> {
        if !status.sync_in_progress {
            return Ok(());
        }
        let stale = status.last_sync_attempt.is_none_or(|t| {
            Utc::now() - t > ChronoDuration::minutes(STALE_SYNC_FLAG_MINUTES)
        });
        if stale {
            mgr_domain::warn!(
                "federation",
                "reclaiming stale sync_in_progress flag",
                &status.peer_id
            );
            Ok(())
        } else {
            Err(Error::conflict(format!(
                "sync already in progress for peer {}",
                status.peer_id
            )))
        }
    }

    async fn record_failure(
        &self,
        ns: &Namespace,
        mut status: PeerSyncStatus,
        err: &Error,
    ) -> Result<()> {
        status.consecutive_failures += 1;
        status.is_healthy = status.consecutive_failures <= UNHEALTHY_AFTER_FAILURES;
        status.sync_in_progress = false;
        status.last_health_check = Some(Utc::now());
        mgr_domain::warn!(
            "federation",
            "peer sync failed",
            &format!(
                "{}: {err} (consecutive failures: {})",
                status.peer_id, status.consecutive_failures
            )
        );
        self.federation.put_status(ns, &status).await
    }

    fn canonical_server(
        item: ServerExportItem,
        origin_id: &PeerId,
        origin_type: FederationOrigin,
        generation: u64,
    ) -> McpServer {
        let path = item.path.with_peer_prefix(origin_id);
        McpServer {
            path,
            server_name: item.server_name,
            description: item.description,
            proxy_pass_url: item.proxy_pass_url,
            supported_transports: item.supported_transports,
            auth_type: None,
            tags: item.tags,
            tool_list: item.tool_list,
            is_enabled: true,
            visibility: item.visibility,
            versions: Vec::new(),
            backend_paths: Vec::new(),
            origin_peer: Some(origin_id.clone()),
            origin_type: Some(origin_type),
            generation: Some(generation),
            created_at: item.updated_at,
            updated_at: item.updated_at,
        }
    }

    fn canonical_agent(
        item: AgentExportItem,
        origin_id: &PeerId,
        origin_type: FederationOrigin,
        generation: u64,
    ) -> Agent {
        let path = item.path.with_peer_prefix(origin_id);
        Agent {
            path,
            name: item.name,
            description: item.description,
            proxy_pass_url: item.proxy_pass_url,
            protocol_version: item.protocol_version,
            capabilities: Vec::new(),
            skills: item.skills,
            trust_level: mgr_domain::entities::TrustLevel::Low,
            visibility: item.visibility,
            tags: item.tags,
            is_enabled: true,
            origin_peer: Some(origin_id.clone()),
            origin_type: Some(origin_type),
            generation: Some(generation),
            created_at: item.updated_at,
            updated_at: item.updated_at,
        }
    }

    /// Delete copies from `origin_id` whose generation predates
    /// `generation`, cascading their embedding documents.
    async fn reclaim_orphans(
        &self,
        ns: &Namespace,
        origin_id: &PeerId,
        generation: u64,
    ) -> Result<(u64, u64)> {
        let mut servers_orphaned = 0;
        for server in self.servers.list_by_origin(ns, origin_id).await? {
            if server.generation.unwrap_or(0) < generation {
                self.servers.delete(ns, &server.path).await?;
                self.search
                    .remove(ns, mgr_domain::value_objects::EntityType::Server, &server.path)
                    .await?;
                servers_orphaned += 1;
            }
        }

        let mut agents_orphaned = 0;
        for agent in self.agents.list_by_origin(ns, origin_id).await? {
            if agent.generation.unwrap_or(0) < generation {
                self.agents.delete(ns, &agent.path).await?;
                self.search
                    .remove(ns, mgr_domain::value_objects::EntityType::Agent, &agent.path)
                    .await?;
                agents_orphaned += 1;
            }
        }

        Ok((servers_orphaned, agents_orphaned))
    }

    async fn import_servers(
        &self,
        ns: &Namespace,
        items: Vec<ServerExportItem>,
        origin_id: &PeerId,
        origin_type: FederationOrigin,
        generation: u64,
    ) -> Result<u64> {
        let mut count = 0;
        for item in items {
            let server = Self::canonical_server(item, origin_id, origin_type, generation);
            with_backoff("federation.upsert_server", || {
                self.servers.upsert(ns, &server)
            })
            .await?;
            self.search.index_server(ns, &server).await?;
            count += 1;
        }
        Ok(count)
    }

    async fn import_agents(
        &self,
        ns: &Namespace,
        items: Vec<AgentExportItem>,
        origin_id: &PeerId,
        origin_type: FederationOrigin,
        generation: u64,
    ) -> Result<u64> {
        let mut count = 0;
        for item in items {
            let agent = Self::canonical_agent(item, origin_id, origin_type, generation);
            with_backoff("federation.upsert_agent", || self.agents.upsert(ns, &agent)).await?;
            self.search.index_agent(ns, &agent).await?;
            count += 1;
        }
        Ok(count)
    }

    async fn finish_sync(
        &self,
        ns: &Namespace,
        mut status: PeerSyncStatus,
        report: &SyncReport,
    ) -> Result<()> {
        let now = Utc::now();
        status.current_generation = report.generation;
        status.last_successful_sync = Some(now);
        status.last_health_check = Some(now);
        status.total_servers_synced += report.servers_synced;
        status.total_agents_synced += report.agents_synced;
        status.consecutive_failures = 0;
        status.is_healthy = true;
        status.sync_in_progress = false;
        self.federation.put_status(ns, &status).await
    }

    fn adapter_for(&self, origin: FederationOrigin) -> Result<&Arc<dyn ExternalCatalogAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.origin() == origin)
            .ok_or_else(|| Error::bad_request(format!("no adapter for source '{origin}'")))
    }
}

#[async_trait]
impl FederationServiceInterface for FederationServiceImpl {
    async fn put_peer(&self, ns: &Namespace, peer: PeerRegistry) -> Result<PeerRegistry> {
        peer.validate()?;
        with_backoff("federation.put_peer", || self.federation.put_peer(ns, &peer)).await?;

        if self.federation.get_status(ns, &peer.peer_id).await?.is_none() {
            let status = PeerSyncStatus::new(peer.peer_id.clone());
            self.federation.put_status(ns, &status).await?;
        }
        Ok(peer)
    }

    async fn get_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<PeerRegistry> {
        self.federation.get_peer(ns, peer_id).await
    }

    async fn list_peers(&self, ns: &Namespace) -> Result<Vec<PeerRegistry>> {
        let mut peers = self.federation.list_peers(ns).await?;
        peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        Ok(peers)
    }

    async fn delete_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<()> {
        self.federation.delete_peer(ns, peer_id).await?;
        self.sync_locks.remove(peer_id.as_str());
        mgr_domain::info!("federation", "peer removed", peer_id);
        Ok(())
    }

    async fn set_peer_enabled(
        &self,
        ns: &Namespace,
        peer_id: &PeerId,
        enabled: bool,
    ) -> Result<PeerRegistry> {
        let mut peer = self.federation.get_peer(ns, peer_id).await?;
        peer.enabled = enabled;
        self.federation.put_peer(ns, &peer).await?;
        Ok(peer)
    }

    async fn peer_status(&self, ns: &Namespace, peer_id: &PeerId) -> Result<PeerSyncStatus> {
        // Verify the peer exists so status for unknown peers is NotFound.
        self.federation.get_peer(ns, peer_id).await?;
        self.load_status(ns, peer_id).await
    }

    async fn sync_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<SyncReport> {
        let peer = self.federation.get_peer(ns, peer_id).await?;
        if !peer.enabled {
            return Err(Error::bad_request(format!("peer {peer_id} is disabled")));
        }

        let lock = self.lock_for(peer_id.as_str());
        let Ok(_guard) = lock.try_lock() else {
            return Err(Error::conflict(format!(
                "sync already in progress for peer {peer_id}"
            )));
        };

        let mut status = self.load_status(ns, peer_id).await?;
        Self::check_durable_flag(&status)?;

        let generation = status.current_generation + 1;
        status.sync_in_progress = true;
        status.last_sync_attempt = Some(Utc::now());
        self.federation.put_status(ns, &status).await?;

        let servers_export = match self.peer_client.fetch_servers(&peer).await {
            Ok(export) => export,
            Err(err) => {
                self.record_failure(ns, status, &err).await?;
                return Err(err);
            }
        };
        let agents_export = match self.peer_client.fetch_agents(&peer).await {
            Ok(export) => export,
            Err(err) => {
                self.record_failure(ns, status, &err).await?;
                return Err(err);
            }
        };

        let accepted_servers: Vec<ServerExportItem> = servers_export
            .items
            .into_iter()
            .filter(|i| i.visibility == Visibility::Public)
            .filter(|i| peer.accepts(i.path.as_str(), &i.tags, false))
            .collect();
        let accepted_agents: Vec<AgentExportItem> = agents_export
            .items
            .into_iter()
            .filter(|i| i.visibility == Visibility::Public)
            .filter(|i| peer.accepts(i.path.as_str(), &i.tags, true))
            .collect();

        // A failure after this point still releases the durable flag via the
        // failure accounting; already-upserted items carry the new generation
        // and are refreshed or reclaimed by the next successful sync.
        let imported = async {
            let servers_synced = self
                .import_servers(ns, accepted_servers, peer_id, FederationOrigin::Peer, generation)
                .await?;
            let agents_synced = self
                .import_agents(ns, accepted_agents, peer_id, FederationOrigin::Peer, generation)
                .await?;
            let orphaned = self.reclaim_orphans(ns, peer_id, generation).await?;
            Ok::<_, Error>((servers_synced, agents_synced, orphaned))
        }
        .await;

        let (servers_synced, agents_synced, (servers_orphaned, agents_orphaned)) = match imported {
            Ok(counts) => counts,
            Err(err) => {
                self.record_failure(ns, status, &err).await?;
                return Err(err);
            }
        };

        let report = SyncReport {
            generation,
            servers_synced,
            agents_synced,
            servers_orphaned,
            agents_orphaned,
        };
        self.finish_sync(ns, status, &report).await?;

        mgr_domain::info!(
            "federation",
            "peer sync complete",
            &format!(
                "{peer_id} gen={generation} servers={servers_synced} agents={agents_synced} orphaned={}",
                servers_orphaned + agents_orphaned
            )
        );
        Ok(report)
    }

    async fn sync_all(&self, ns: &Namespace) -> Result<Vec<PeerSyncOutcome>> {
        let peers = self.federation.list_peers(ns).await?;
        let enabled: Vec<_> = peers.into_iter().filter(|p| p.enabled).collect();

        let outcomes = futures::future::join_all(enabled.iter().map(|peer| async {
            match self.sync_peer(ns, &peer.peer_id).await {
                Ok(report) => PeerSyncOutcome {
                    peer_id: peer.peer_id.clone(),
                    report: Some(report),
                    error: None,
                },
                Err(err) => PeerSyncOutcome {
                    peer_id: peer.peer_id.clone(),
                    report: None,
                    error: Some(err.kind().to_owned()),
                },
            }
        }))
        .await;
        Ok(outcomes)
    }

    async fn sync_external(&self, ns: &Namespace, origin: FederationOrigin) -> Result<SyncReport> {
        let adapter = self.adapter_for(origin)?;
        let config = self.federation.get_config(ns).await?;
        let source_config = match origin {
            FederationOrigin::Anthropic => &config.anthropic,
            FederationOrigin::Asor => &config.asor,
            _ => return Err(Error::bad_request("only external sources can be synced here")),
        };
        if !source_config.enabled {
            return Err(Error::bad_request(format!("source '{origin}' is disabled")));
        }

        let source_id = PeerId::new(adapter.source_id())?;
        let lock = self.lock_for(source_id.as_str());
        let Ok(_guard) = lock.try_lock() else {
            return Err(Error::conflict(format!(
                "sync already in progress for source {origin}"
            )));
        };

        let mut status = self.load_status(ns, &source_id).await?;
        Self::check_durable_flag(&status)?;

        let generation = status.current_generation + 1;
        status.sync_in_progress = true;
        status.last_sync_attempt = Some(Utc::now());
        self.federation.put_status(ns, &status).await?;

        let catalog = match adapter.fetch(source_config).await {
            Ok(catalog) => catalog,
            Err(err) => {
                self.record_failure(ns, status, &err).await?;
                return Err(err);
            }
        };

        let imported = async {
            let mut servers_synced = 0;
            for mut server in catalog.servers {
                if !source_config.items.is_empty()
                    && !source_config.items.contains(&server.server_name)
                {
                    continue;
                }
                server.path = server.path.with_peer_prefix(&source_id);
                server.origin_peer = Some(source_id.clone());
                server.origin_type = Some(origin);
                server.generation = Some(generation);
                server.is_enabled = true;
                with_backoff("federation.upsert_server", || {
                    self.servers.upsert(ns, &server)
                })
                .await?;
                self.search.index_server(ns, &server).await?;
                servers_synced += 1;
            }

            let mut agents_synced = 0;
            for mut agent in catalog.agents {
                if !source_config.items.is_empty() && !source_config.items.contains(&agent.name) {
                    continue;
                }
                agent.path = agent.path.with_peer_prefix(&source_id);
                agent.origin_peer = Some(source_id.clone());
                agent.origin_type = Some(origin);
                agent.generation = Some(generation);
                agent.is_enabled = true;
                with_backoff("federation.upsert_agent", || self.agents.upsert(ns, &agent))
                    .await?;
                self.search.index_agent(ns, &agent).await?;
                agents_synced += 1;
            }

            let orphaned = self.reclaim_orphans(ns, &source_id, generation).await?;
            Ok::<_, Error>((servers_synced, agents_synced, orphaned))
        }
        .await;

        let (servers_synced, agents_synced, (servers_orphaned, agents_orphaned)) = match imported {
            Ok(counts) => counts,
            Err(err) => {
                self.record_failure(ns, status, &err).await?;
                return Err(err);
            }
        };

        let report = SyncReport {
            generation,
            servers_synced,
            agents_synced,
            servers_orphaned,
            agents_orphaned,
        };
        self.finish_sync(ns, status, &report).await?;
        Ok(report)
    }

    async fn get_config(&self, ns: &Namespace) -> Result<FederationConfig> {
        self.federation.get_config(ns).await
    }

    async fn put_config(
        &self,
        ns: &Namespace,
        config: FederationConfig,
    ) -> Result<FederationConfig> {
        self.federation.put_config(ns, &config).await?;
        Ok(config)
    }

    async fn topology(&self, ns: &Namespace) -> Result<FederationTopology> {
        let mut nodes = vec![FederationNode {
            node_id: LOCAL_NODE_ID.to_owned(),
            node_type: FederationOrigin::Local,
            name: self.local_name.clone(),
            endpoint: None,
            healthy: true,
            last_sync: None,
        }];
        let mut edges = Vec::new();

        for peer in self.federation.list_peers(ns).await? {
            let status = self.load_status(ns, &peer.peer_id).await?;
            nodes.push(FederationNode {
                node_id: peer.peer_id.to_string(),
                node_type: FederationOrigin::Peer,
                name: peer.name.clone(),
                endpoint: Some(peer.endpoint.clone()),
                healthy: status.is_healthy,
                last_sync: status.last_successful_sync,
            });
            if peer.enabled {
                edges.push(FederationEdge {
                    source: peer.peer_id.to_string(),
                    target: LOCAL_NODE_ID.to_owned(),
                });
            }
        }

        let config = self.federation.get_config(ns).await?;
        for adapter in &self.adapters {
            let source_config = match adapter.origin() {
                FederationOrigin::Anthropic => &config.anthropic,
                FederationOrigin::Asor => &config.asor,
                _ => continue,
            };
            let source_id = PeerId::new(adapter.source_id())?;
            let status = self.load_status(ns, &source_id).await?;
            nodes.push(FederationNode {
                node_id: adapter.source_id().to_owned(),
                node_type: adapter.origin(),
                name: adapter.source_id().to_owned(),
                endpoint: Some(source_config.endpoint.clone()),
                healthy: status.is_healthy,
                last_sync: status.last_successful_sync,
            });
            if source_config.enabled {
                edges.push(FederationEdge {
                    source: adapter.source_id().to_owned(),
                    target: LOCAL_NODE_ID.to_owned(),
                });
            }
        }

        Ok(FederationTopology {
            nodes,
            edges,
            generated_at: Utc::now(),
        })
    }

    async fn export_servers(&self, ns: &Namespace) -> Result<ServersExport> {
        let servers = self.servers.list_all(ns).await?;
        let items: Vec<ServerExportItem> = servers
            .into_iter()
            .filter(|s| s.is_enabled && s.visibility == Visibility::Public && !s.is_virtual())
            .map(|s| ServerExportItem {
                path: s.path,
                server_name: s.server_name,
                description: s.description,
                proxy_pass_url: s.proxy_pass_url,
                supported_transports: s.supported_transports,
                tags: s.tags,
                tool_list: s.tool_list,
                visibility: s.visibility,
                updated_at: s.updated_at,
            })
            .collect();
        Ok(ServersExport {
            total_count: items.len(),
            items,
            generation: Utc::now().timestamp() as u64,
        })
    }

    async fn export_agents(&self, ns: &Namespace) -> Result<AgentsExport> {
        let agents = self.agents.list_all(ns).await?;
        let items: Vec<AgentExportItem> = agents
            .into_iter()
            .filter(|a| a.is_enabled && a.visibility == Visibility::Public)
            .map(|a| AgentExportItem {
                path: a.path,
                name: a.name,
                description: a.description,
                proxy_pass_url: a.proxy_pass_url,
                protocol_version: a.protocol_version,
                skills: a.skills,
                tags: a.tags,
                visibility: a.visibility,
                updated_at: a.updated_at,
            })
            .collect();
        Ok(AgentsExport {
            total_count: items.len(),
            items,
            generation: Utc::now().timestamp() as u64,
        })
    }
}
