//! Adapter for the upstream agent registry.
//!
//! Translates agent cards (`{agents: [{name, description, url, skills,
//! protocolVersion}]}`) into canonical agents; credentials come from the
//! environment variable named in the source config.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use mgr_domain::entities::{Agent, AgentSkill, ExternalSourceConfig, FederationOrigin};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::{ExternalCatalog, ExternalCatalogAdapter};
use mgr_domain::value_objects::ServerPath;

#[derive(Deserialize)]
struct AgentCatalogResponse {
    #[serde(default)]
    agents: Vec<AgentCard>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentCard {
    name: String,
    #[serde(default)]
    description: String,
    url: String,
    #[serde(default)]
    protocol_version: String,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    skills: Vec<AgentCardSkill>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
struct AgentCardSkill {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Upstream agent-registry [`ExternalCatalogAdapter`].
pub struct AsorCatalogAdapter {
    http: reqwest::Client,
}

impl AsorCatalogAdapter {
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

    fn translate(card: AgentCard) -> Result<Agent> {
        let slug: String = card
            .name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .trim_matches('-')
            .to_owned();
        let path = ServerPath::new(format!("/{slug}"))?;

        let mut agent = Agent::new(path, card.name, card.url);
        agent.description = card.description;
        agent.protocol_version = card.protocol_version;
        agent.capabilities = card.capabilities;
        agent.tags = card.tags;
        agent.skills = card
            .skills
            .into_iter()
            .map(|s| AgentSkill {
                id: s.id,
                name: s.name,
                description: s.description,
                tags: s.tags,
            })
            .collect();
        agent.created_at = Utc::now();
        agent.updated_at = agent.created_at;
        Ok(agent)
    }
}

#[async_trait]
impl ExternalCatalogAdapter for AsorCatalogAdapter {
    fn origin(&self) -> FederationOrigin {
        FederationOrigin::Asor
    }

    fn source_id(&self) -> &'static str {
        "asor"
    }

    async fn fetch(&self, config: &ExternalSourceConfig) -> Result<ExternalCatalog> {
        let mut request = self.http.get(&config.endpoint);
        if let Some(env_var) = &config.auth_env_var {
            if let Ok(token) = std::env::var(env_var) {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await.map_err(|e| {
            Error::peer_unreachable("asor", format!("catalog fetch failed: {e}"))
        })?;
        if !response.status().is_success() {
            return Err(Error::peer_unreachable(
                "asor",
                format!("catalog returned {}", response.status()),
            ));
        }

        let catalog: AgentCatalogResponse = response
            .json()
            .await
            .map_err(|e| Error::peer_unreachable("asor", format!("malformed catalog: {e}")))?;

        let mut agents = Vec::new();
        for card in catalog.agents {
            match Self::translate(card) {
                Ok(agent) => agents.push(agent),
                Err(err) => {
                    mgr_domain::warn!("federation", "skipping untranslatable agent card", &err);
                }
            }
        }

        Ok(ExternalCatalog {
            servers: Vec::new(),
            agents,
        })
    }
}
