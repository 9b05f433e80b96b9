//! HTTP client for peer registry export endpoints.
//!
//! Applies the peer's configured auth (none, API key, static token, or
//! OAuth2 client credentials) and maps every transport failure onto
//! `PeerUnreachable` so the sync engine's failure accounting sees one kind.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use mgr_domain::constants::federation::PEER_FETCH_TIMEOUT_SECS;
use mgr_domain::entities::{AgentsExport, PeerAuthType, PeerRegistry, ServersExport};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::{PeerCatalogClient, TokenClient};

/// HTTP-backed [`PeerCatalogClient`].
pub struct HttpPeerCatalogClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenClient>,
}

impl HttpPeerCatalogClient {
    /// Create a client; OAuth2 peers exchange credentials through `tokens`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be built.
    pub fn new(tokens: Arc<dyn TokenClient>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(PEER_FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::config_with_source("failed to build peer HTTP client", e))?;
        Ok(Self { http, tokens })
    }

    fn credential<'a>(peer: &'a PeerRegistry, key: &str) -> Result<&'a str> {
        peer.auth
            .credentials
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::config(format!(
                    "peer {} auth type {} requires credential '{key}'",
                    peer.peer_id, peer.auth.auth_type
                ))
            })
    }

    async fn authorized_get(&self, peer: &PeerRegistry, url: &str) -> Result<reqwest::Response> {
        let mut request = self.http.get(url);
        match peer.auth.auth_type {
            PeerAuthType::None => {}
            PeerAuthType::ApiKey => {
                request = request.header("X-Api-Key", Self::credential(peer, "api_key")?);
            }
            PeerAuthType::StaticToken => {
                request = request.bearer_auth(Self::credential(peer, "token")?);
            }
            PeerAuthType::Oauth2 => {
                let token = self
                    .tokens
                    .client_credentials(
                        Self::credential(peer, "token_url")?,
                        Self::credential(peer, "client_id")?,
                        Self::credential(peer, "client_secret")?,
                        peer.auth.credentials.get("scope").map(String::as_str),
                    )
                    .await
                    .map_err(|e| {
                        Error::peer_unreachable(
                            peer.peer_id.as_str(),
                            format!("token exchange failed: {e}"),
                        )
                    })?;
                request = request.bearer_auth(token.access_token);
            }
        }

        let response = request.send().await.map_err(|e| {
            Error::peer_unreachable(peer.peer_id.as_str(), format!("request to {url} failed: {e}"))
        })?;
        if !response.status().is_success() {
            return Err(Error::peer_unreachable(
                peer.peer_id.as_str(),
                format!("{url} returned {}", response.status()),
            ));
        }
        Ok(response)
    }

    fn endpoint(peer: &PeerRegistry, suffix: &str) -> String {
        format!("{}{suffix}", peer.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl PeerCatalogClient for HttpPeerCatalogClient {
    async fn fetch_servers(&self, peer: &PeerRegistry) -> Result<ServersExport> {
        let url = Self::endpoint(peer, "/api/federation/servers");
        let response = self.authorized_get(peer, &url).await?;
        response.json().await.map_err(|e| {
            Error::peer_unreachable(
                peer.peer_id.as_str(),
                format!("malformed servers export: {e}"),
            )
        })
    }

    async fn fetch_agents(&self, peer: &PeerRegistry) -> Result<AgentsExport> {
        let url = Self::endpoint(peer, "/api/federation/agents");
        let response = self.authorized_get(peer, &url).await?;
        response.json().await.map_err(|e| {
            Error::peer_unreachable(
                peer.peer_id.as_str(),
                format!("malformed agents export: {e}"),
            )
        })
    }

    async fn health_check(&self, peer: &PeerRegistry) -> Result<()> {
        let url = Self::endpoint(peer, "/health");
        self.authorized_get(peer, &url).await?;
        Ok(())
    }
}
