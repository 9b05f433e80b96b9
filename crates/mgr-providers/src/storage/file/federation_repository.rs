//! File-backed federation repository (peers, sync status, config).

use std::path::PathBuf;

use async_trait::async_trait;

use mgr_domain::constants::federation::FEDERATION_CONFIG_ID;
use mgr_domain::entities::{FederationConfig, PeerRegistry, PeerSyncStatus};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::repositories::FederationRepository;
use mgr_domain::value_objects::{Namespace, PeerId};

use super::store::JsonStore;

/// File-backed [`FederationRepository`].
pub struct FileFederationRepository {
    peers: JsonStore,
    statuses: JsonStore,
    config: JsonStore,
}

impl FileFederationRepository {
    /// Create a repository rooted at the storage directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            peers: JsonStore::new(root.clone(), "peers"),
            statuses: JsonStore::new(root.clone(), "peer_status"),
            config: JsonStore::new(root, "federation"),
        }
    }
}

#[async_trait]
impl FederationRepository for FileFederationRepository {
    async fn get_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<PeerRegistry> {
        self.peers
            .read(ns, peer_id.as_str())
            .await?
            .ok_or_else(|| Error::not_found(format!("peer {peer_id}")))
    }

    async fn put_peer(&self, ns: &Namespace, peer: &PeerRegistry) -> Result<()> {
        let _guard = self.peers.write_lock.lock().await;
        self.peers.write(ns, peer.peer_id.as_str(), peer).await
    }

    async fn delete_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<()> {
        let _guard = self.peers.write_lock.lock().await;
        self.peers.remove(ns, peer_id.as_str()).await?;
        self.statuses.remove(ns, peer_id.as_str()).await
    }

    async fn list_peers(&self, ns: &Namespace) -> Result<Vec<PeerRegistry>> {
        self.peers.list(ns).await
    }

    async fn get_status(
        &self,
        ns: &Namespace,
        peer_id: &PeerId,
    ) -> Result<Option<PeerSyncStatus>> {
        self.statuses.read(ns, peer_id.as_str()).await
    }

    async fn put_status(&self, ns: &Namespace, status: &PeerSyncStatus) -> Result<()> {
        let _guard = self.statuses.write_lock.lock().await;
        self.statuses
            .write(ns, status.peer_id.as_str(), status)
            .await
    }

    async fn get_config(&self, ns: &Namespace) -> Result<FederationConfig> {
        Ok(self
            .config
            .read(ns, FEDERATION_CONFIG_ID)
            .await?
            .unwrap_or_else(FederationConfig::disabled))
    }

    async fn put_config(&self, ns: &Namespace, config: &FederationConfig) -> Result<()> {
        let _guard = self.config.write_lock.lock().await;
        self.config.write(ns, FEDERATION_CONFIG_ID, config).await
    }
}
