//! Adapter for the upstream MCP protocol registry.
//!
//! Translates the upstream catalog schema (`{servers: [{name, description,
//! remotes: [{transport_type, url}]}]}`) into canonical servers. Paths are
//! slugged from server names; the federation engine prefixes and
//! generation-tags them like any peer import.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use mgr_domain::entities::{ExternalSourceConfig, FederationOrigin, McpServer, ToolDef, Transport};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::{ExternalCatalog, ExternalCatalogAdapter};
use mgr_domain::value_objects::ServerPath;

#[derive(Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    servers: Vec<CatalogServer>,
}

#[derive(Deserialize)]
struct CatalogServer {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    remotes: Vec<CatalogRemote>,
    #[serde(default)]
    tools: Vec<CatalogTool>,
}

#[derive(Deserialize)]
struct CatalogRemote {
    #[serde(default)]
    transport_type: String,
    url: String,
}

#[derive(Deserialize)]
struct CatalogTool {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    input_schema: serde_json::Value,
}

/// Upstream protocol-registry [`ExternalCatalogAdapter`].
pub struct AnthropicCatalogAdapter {
    http: reqwest::Client,
}

impl AnthropicCatalogAdapter {
    /// Create the adapter.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::config_with_source("failed to build catalog HTTP client", e))?;
        Ok(Self { http })
    }

    /// Lowercase-alphanumeric slug of an upstream server name.
    fn slug(name: &str) -> String {
        let mut slug: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        while slug.contains("--") {
            slug = slug.replace("--", "-");
        }
        slug.trim_matches('-').to_owned()
    }

    fn transport_of(raw: &str) -> Option<Transport> {
        match raw {
            "sse" => Some(Transport::Sse),
            "streamable-http" | "streamable_http" | "http" => Some(Transport::StreamableHttp),
            "websocket" => Some(Transport::Websocket),
            "stdio" => Some(Transport::Stdio),
            _ => None,
        }
    }

    fn translate(server: CatalogServer) -> Result<McpServer> {
        let remote = server
            .remotes
            .first()
            .ok_or_else(|| Error::backend_data(format!("catalog server '{}' has no remote", server.name)))?;

        let path = ServerPath::new(format!("/{}", Self::slug(&server.name)))?;
        let mut canonical = McpServer::new(path, server.name, remote.url.clone());
        canonical.description = server.description;
        canonical.supported_transports = server
            .remotes
            .iter()
            .filter_map(|r| Self::transport_of(&r.transport_type))
            .collect();
        canonical.tool_list = server
            .tools
            .into_iter()
            .map(|t| ToolDef {
                name: t.name,
                description: t.description,
                input_schema: t.input_schema,
            })
            .collect();
        canonical.created_at = Utc::now();
        canonical.updated_at = canonical.created_at;
        Ok(canonical)
    }
}

#[async_trait]
impl ExternalCatalogAdapter for AnthropicCatalogAdapter {
    fn origin(&self) -> FederationOrigin {
        FederationOrigin::Anthropic
    }

    fn source_id(&self) -> &'static str {
        "anthropic"
    }

    async fn fetch(&self, config: &ExternalSourceConfig) -> Result<ExternalCatalog> {
        let response = self
            .http
            .get(&config.endpoint)
            .send()
            .await
            .map_err(|e| {
                Error::peer_unreachable("anthropic", format!("catalog fetch failed: {e}"))
            })?;
        if !response.status().is_success() {
            return Err(Error::peer_unreachable(
                "anthropic",
                format!("catalog returned {}", response.status()),
            ));
        }

        let catalog: CatalogResponse = response.json().await.map_err(|e| {
            Error::peer_unreachable("anthropic", format!("malformed catalog: {e}"))
        })?;

        let mut servers = Vec::new();
        for server in catalog.servers {
            match Self::translate(server) {
                Ok(s) => servers.push(s),
                Err(err) => {
                    mgr_domain::warn!("federation", "skipping untranslatable catalog server", &err);
                }
            }
        }

        Ok(ExternalCatalog {
            servers,
            agents: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_path_safe() {
        assert_eq!(
            AnthropicCatalogAdapter::slug("Cloudflare Docs (v2)"),
            "cloudflare-docs-v2"
        );
        assert_eq!(AnthropicCatalogAdapter::slug("--Weird__Name--"), "weird-name");
    }
}
