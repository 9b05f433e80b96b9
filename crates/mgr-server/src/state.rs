//! Shared request state.

use std::sync::Arc;
use std::time::Duration;

use mgr_domain::error::{Error, Result};
use mgr_infrastructure::config::AppConfig;
use mgr_infrastructure::di::AppContext;

use crate::auth::AuthVerifier;

/// State handed to every handler: the DI container, the ingress verifier,
/// and the bounded proxy client.
#[derive(Clone)]
pub struct AppState {
    /// Composition root
    pub ctx: Arc<AppContext>,
    /// Ingress token verifier
    pub verifier: Arc<AuthVerifier>,
    /// Upstream HTTP client used by the gateway edge
    pub proxy_client: reqwest::Client,
}

impl AppState {
    /// Build request state from the initialized context.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the verifier or proxy client
    /// cannot be built.
    pub fn new(ctx: Arc<AppContext>) -> Result<Self> {
        let verifier = Arc::new(AuthVerifier::from_config(&ctx.config.auth)?);
        let proxy_client = build_proxy_client(&ctx.config)?;
        Ok(Self {
            ctx,
            verifier,
            proxy_client,
        })
    }
}

fn build_proxy_client(config: &AppConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.proxy.timeout_secs))
        .pool_max_idle_per_host(config.proxy.max_idle_per_host)
        .build()
        .map_err(|e| Error::config_with_source("failed to build proxy client", e))
}
