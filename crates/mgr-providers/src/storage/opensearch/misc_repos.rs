//! Index-backed scope, scan and federation repositories.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use mgr_domain::constants::federation::FEDERATION_CONFIG_ID;
use mgr_domain::constants::storage::{
    INDEX_FEDERATION_CONFIG, INDEX_SCOPES, INDEX_SECURITY_SCANS,
};
use mgr_domain::entities::scope::{GroupMapping, ServerScope};
use mgr_domain::entities::{
    FederationConfig, PeerRegistry, PeerSyncStatus, ScopeDocument, ScopeFile, SecurityScanResult,
};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::repositories::{
    FederationRepository, ScopeRepository, SecurityScanRepository,
};
use mgr_domain::value_objects::{Namespace, PeerId, ServerPath};

use crate::storage::doc_id;

use super::client::{OpenSearchClient, parse_hit};

const LIST_SIZE: usize = 10_000;

/// Index-backed [`ScopeRepository`].
pub struct OsScopeRepository {
    client: Arc<OpenSearchClient>,
}

impl OsScopeRepository {
    /// Create a repository over a shared client.
    #[must_use]
    pub fn new(client: Arc<OpenSearchClient>) -> Self {
        Self { client }
    }

    fn index(ns: &Namespace) -> String {
        ns.index_name(INDEX_SCOPES)
    }

    fn id(scope_type: &str, key: &str) -> String {
        format!("{scope_type}__{key}")
    }

    async fn get_typed(
        &self,
        ns: &Namespace,
        scope_type: &str,
        key: &str,
    ) -> Result<Option<ScopeDocument>> {
        let source = self
            .client
            .get_doc(&Self::index(ns), &Self::id(scope_type, key))
            .await?;
        source
            .map(|s| {
                serde_json::from_value(s).map_err(|e| {
                    Error::backend_data_with_source(format!("malformed scope {key}"), e)
                })
            })
            .transpose()
    }
}

#[async_trait]
impl ScopeRepository for OsScopeRepository {
    async fn put(&self, ns: &Namespace, doc: &ScopeDocument) -> Result<()> {
        let body = serde_json::to_value(doc)?;
        self.client
            .put_doc(
                &Self::index(ns),
                &Self::id(doc.scope_type(), doc.key()),
                &body,
                false,
            )
            .await
    }

    async fn get_server_scope(
        &self,
        ns: &Namespace,
        scope_name: &str,
    ) -> Result<Option<ServerScope>> {
        match self.get_typed(ns, "server_scope", scope_name).await? {
            Some(ScopeDocument::ServerScope(scope)) => Ok(Some(scope)),
            Some(other) => Err(Error::backend_data(format!(
                "scope '{scope_name}' stored as {}",
                other.scope_type()
            ))),
            None => Ok(None),
        }
    }

    async fn get_group_mapping(
        &self,
        ns: &Namespace,
        group_name: &str,
    ) -> Result<Option<GroupMapping>> {
        match self.get_typed(ns, "group_mapping", group_name).await? {
            Some(ScopeDocument::GroupMapping(mapping)) => Ok(Some(mapping)),
            Some(other) => Err(Error::backend_data(format!(
                "group mapping '{group_name}' stored as {}",
                other.scope_type()
            ))),
            None => Ok(None),
        }
    }

    async fn list_all(&self, ns: &Namespace) -> Result<Vec<ScopeDocument>> {
        let hits = self
            .client
            .search(
                &Self::index(ns),
                &json!({"size": LIST_SIZE, "query": {"match_all": {}}}),
            )
            .await?;
        hits.iter()
            .map(|h| parse_hit::<ScopeDocument>(h).map(|(d, _)| d))
            .collect()
    }

    async fn delete(&self, ns: &Namespace, scope_type: &str, key: &str) -> Result<()> {
        self.client
            .delete_doc(&Self::index(ns), &Self::id(scope_type, key))
            .await
    }

    async fn load_file(&self, ns: &Namespace, file: ScopeFile) -> Result<usize> {
        let docs = file.into_documents();
        for doc in &docs {
            self.put(ns, doc).await?;
        }
        Ok(docs.len())
    }
}

/// Index-backed [`SecurityScanRepository`]; one document per scan.
pub struct OsScanRepository {
    client: Arc<OpenSearchClient>,
}

impl OsScanRepository {
    /// Create a repository over a shared client.
    #[must_use]
    pub fn new(client: Arc<OpenSearchClient>) -> Self {
        Self { client }
    }

    fn index(ns: &Namespace) -> String {
        ns.index_name(INDEX_SECURITY_SCANS)
    }
}

#[async_trait]
impl SecurityScanRepository for OsScanRepository {
    async fn append(&self, ns: &Namespace, result: &SecurityScanResult) -> Result<()> {
        let id = format!(
            "{}@{}",
            doc_id(result.server_path.as_str()),
            result.scan_timestamp.timestamp_millis()
        );
        let body = serde_json::to_value(result)?;
        self.client.put_doc(&Self::index(ns), &id, &body, false).await
    }

    async fn latest(
        &self,
        ns: &Namespace,
        path: &ServerPath,
    ) -> Result<Option<SecurityScanResult>> {
        let hits = self
            .client
            .search(
                &Self::index(ns),
                &json!({
                    "size": 1,
                    "query": {"term": {"server_path": path.as_str()}},
                    "sort": [{"scan_timestamp": {"order": "desc"}}]
                }),
            )
            .await?;
        hits.first()
            .map(|h| parse_hit::<SecurityScanResult>(h).map(|(r, _)| r))
            .transpose()
    }

    async fn history(&self, ns: &Namespace, path: &ServerPath) -> Result<Vec<SecurityScanResult>> {
        let hits = self
            .client
            .search(
                &Self::index(ns),
                &json!({
                    "size": LIST_SIZE,
                    "query": {"term": {"server_path": path.as_str()}},
                    "sort": [{"scan_timestamp": {"order": "desc"}}]
                }),
            )
            .await?;
        hits.iter()
            .map(|h| parse_hit::<SecurityScanResult>(h).map(|(r, _)| r))
            .collect()
    }

    async fn delete_for(&self, ns: &Namespace, path: &ServerPath) -> Result<()> {
        self.client
            .delete_by_query(
                &Self::index(ns),
                &json!({"query": {"term": {"server_path": path.as_str()}}}),
            )
            .await
    }
}

/// Envelope stored in the federation index; `document` carries the typed
/// payload opaquely, the top-level fields exist for filtering.
#[derive(serde::Serialize, serde::Deserialize)]
struct FederationDoc {
    doc_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    peer_id: Option<String>,
    document: serde_json::Value,
}

/// Index-backed [`FederationRepository`]; peers, statuses and the singleton
/// config share the federation index behind `doc_kind`.
pub struct OsFederationRepository {
    client: Arc<OpenSearchClient>,
}

impl OsFederationRepository {
    /// Create a repository over a shared client.
    #[must_use]
    pub fn new(client: Arc<OpenSearchClient>) -> Self {
        Self { client }
    }

    fn index(ns: &Namespace) -> String {
        ns.index_name(INDEX_FEDERATION_CONFIG)
    }

    async fn get_payload<T: serde::de::DeserializeOwned>(
        &self,
        ns: &Namespace,
        id: &str,
    ) -> Result<Option<T>> {
        let source = self.client.get_doc(&Self::index(ns), id).await?;
        source
            .map(|s| {
                let envelope: FederationDoc = serde_json::from_value(s).map_err(|e| {
                    Error::backend_data_with_source(format!("malformed federation doc {id}"), e)
                })?;
                serde_json::from_value(envelope.document).map_err(|e| {
                    Error::backend_data_with_source(format!("malformed federation doc {id}"), e)
                })
            })
            .transpose()
    }

    async fn put_payload<T: serde::Serialize>(
        &self,
        ns: &Namespace,
        id: &str,
        doc_kind: &str,
        peer_id: Option<&str>,
        payload: &T,
    ) -> Result<()> {
        let envelope = FederationDoc {
            doc_kind: doc_kind.to_owned(),
            peer_id: peer_id.map(str::to_owned),
            document: serde_json::to_value(payload)?,
        };
        let body = serde_json::to_value(&envelope)?;
        self.client.put_doc(&Self::index(ns), id, &body, false).await
    }
}

#[async_trait]
impl FederationRepository for OsFederationRepository {
    async fn get_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<PeerRegistry> {
        self.get_payload(ns, &format!("peer__{peer_id}"))
            .await?
            .ok_or_else(|| Error::not_found(format!("peer {peer_id}")))
    }

    async fn put_peer(&self, ns: &Namespace, peer: &PeerRegistry) -> Result<()> {
        self.put_payload(
            ns,
            &format!("peer__{}", peer.peer_id),
            "peer",
            Some(peer.peer_id.as_str()),
            peer,
        )
        .await
    }

    async fn delete_peer(&self, ns: &Namespace, peer_id: &PeerId) -> Result<()> {
        self.client
            .delete_doc(&Self::index(ns), &format!("peer__{peer_id}"))
            .await?;
        self.client
            .delete_doc(&Self::index(ns), &format!("status__{peer_id}"))
            .await
    }

    async fn list_peers(&self, ns: &Namespace) -> Result<Vec<PeerRegistry>> {
        let hits = self
            .client
            .search(
                &Self::index(ns),
                &json!({
                    "size": LIST_SIZE,
                    "query": {"term": {"doc_kind": "peer"}}
                }),
            )
            .await?;
        hits.iter()
            .map(|h| {
                parse_hit::<FederationDoc>(h).and_then(|(envelope, _)| {
                    serde_json::from_value(envelope.document).map_err(|e| {
                        Error::backend_data_with_source("malformed peer document", e)
                    })
                })
            })
            .collect()
    }

    async fn get_status(
        &self,
        ns: &Namespace,
        peer_id: &PeerId,
    ) -> Result<Option<PeerSyncStatus>> {
        self.get_payload(ns, &format!("status__{peer_id}")).await
    }

    async fn put_status(&self, ns: &Namespace, status: &PeerSyncStatus) -> Result<()> {
        self.put_payload(
            ns,
            &format!("status__{}", status.peer_id),
            "status",
            Some(status.peer_id.as_str()),
            status,
        )
        .await
    }

    async fn get_config(&self, ns: &Namespace) -> Result<FederationConfig> {
        Ok(self
            .get_payload(ns, FEDERATION_CONFIG_ID)
            .await?
            .unwrap_or_else(FederationConfig::disabled))
    }

    async fn put_config(&self, ns: &Namespace, config: &FederationConfig) -> Result<()> {
        self.put_payload(ns, FEDERATION_CONFIG_ID, "config", None, config)
            .await
    }
}
