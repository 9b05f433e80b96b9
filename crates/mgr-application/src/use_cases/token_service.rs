//! Token Refresh Use Case
//!
//! # Overview
//! Keeps ingress and egress OAuth credentials fresh. Each cycle refreshes
//! every credential whose `expiry - buffer` deadline has passed, then
//! rewrites the MCP client configuration artifacts so clients always hold a
//! complete service map (no-auth services included). The worker loop in the
//! server layer drives cycles on a cadence and stops cooperatively.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use mgr_domain::error::Result;
use mgr_domain::ports::providers::{ClientConfigWriter, ClientServiceEntry, IssuedToken, TokenClient};
use mgr_domain::ports::services::{
    RegistryServiceInterface, TokenRefreshReport, TokenServiceInterface,
};
use mgr_domain::value_objects::Namespace;

use crate::support::retry::with_backoff;

/// One credential set the refresher keeps fresh.
#[derive(Debug, Clone)]
pub struct CredentialSpec {
    /// Name; egress credentials match servers by `auth_type`
    pub name: String,
    /// OAuth token endpoint
    pub token_url: String,
    /// Client id
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
    /// Optional scope parameter
    pub scope: Option<String>,
}

/// Settings wired from configuration.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Credentials to keep fresh
    pub credentials: Vec<CredentialSpec>,
    /// Refresh ahead of expiry by at least this many minutes (≥ 60)
    pub buffer_minutes: i64,
    /// Gateway base URL written into client configs
    pub gateway_base_url: String,
    /// Namespace whose services are enumerated into the configs
    pub namespace: Namespace,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            credentials: Vec::new(),
            buffer_minutes: 60,
            gateway_base_url: "http://localhost:7860".to_owned(),
            namespace: Namespace::default(),
        }
    }
}

/// Implementation of the `TokenServiceInterface`.
pub struct TokenServiceImpl {
    client: Arc<dyn TokenClient>,
    writer: Arc<dyn ClientConfigWriter>,
    registry: Arc<dyn RegistryServiceInterface>,
    settings: TokenSettings,
    issued: tokio::sync::Mutex<HashMap<String, IssuedToken>>,
}

impl TokenServiceImpl {
    /// Create the service with injected dependencies.
    pub fn new(
        client: Arc<dyn TokenClient>,
        writer: Arc<dyn ClientConfigWriter>,
        registry: Arc<dyn RegistryServiceInterface>,
        settings: TokenSettings,
    ) -> Self {
        // The buffer floor is part of the contract: never refresh later than
        // one hour before expiry.
        let mut settings = settings;
        settings.buffer_minutes = settings.buffer_minutes.max(60);
        Self {
            client,
            writer,
            registry,
            settings,
            issued: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    fn needs_refresh(token: Option<&IssuedToken>, buffer_minutes: i64) -> bool {
        match token {
            None => true,
            Some(t) => Utc::now() >= t.expires_at - ChronoDuration::minutes(buffer_minutes),
        }
    }

    async fn build_service_map(&self) -> Result<Vec<ClientServiceEntry>> {
        let servers = self
            .registry
            .list_servers(&self.settings.namespace, false)
            .await?;
        let issued = self.issued.lock().await;

        let entries = servers
            .into_iter()
            .map(|server| {
                let auth_token = server
                    .auth_type
                    .as_deref()
                    .filter(|t| *t != "none")
                    .and_then(|t| issued.get(t))
                    .map(|t| t.access_token.clone());
                let transport = server
                    .supported_transports
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "streamable-http".to_owned());
                ClientServiceEntry {
                    name: server.server_name,
                    url: format!(
                        "{}{}/mcp",
                        self.settings.gateway_base_url.trim_end_matches('/'),
                        server.path
                    ),
                    auth_token,
                    transport,
                    headers: Default::default(),
                }
            })
            .collect();
        Ok(entries)
    }
}

#[async_trait]
impl TokenServiceInterface for TokenServiceImpl {
    async fn refresh_cycle(&self) -> Result<TokenRefreshReport> {
        let mut report = TokenRefreshReport::default();

        for spec in &self.settings.credentials {
            let current = {
                let issued = self.issued.lock().await;
                issued.get(&spec.name).cloned()
            };
            if !Self::needs_refresh(current.as_ref(), self.settings.buffer_minutes) {
                report.skipped += 1;
                continue;
            }

            let refreshed = with_backoff("tokens.refresh", || {
                self.client.client_credentials(
                    &spec.token_url,
                    &spec.client_id,
                    &spec.client_secret,
                    spec.scope.as_deref(),
                )
            })
            .await;

            match refreshed {
                Ok(token) => {
                    self.issued.lock().await.insert(spec.name.clone(), token);
                    report.refreshed += 1;
                    mgr_domain::info!("tokens", "credential refreshed", &spec.name);
                }
                Err(err) => {
                    report.failed += 1;
                    mgr_domain::error!(
                        "tokens",
                        "credential refresh failed",
                        &format!("{}: {err}", spec.name)
                    );
                }
            }
        }

        let services = self.build_service_map().await?;
        self.writer.write_configs(&services).await?;
        report.artifacts_written = true;
        Ok(report)
    }
}
