//! Index-backed server, agent and skill repositories.
//!
//! Optimistic concurrency is read-compare-write on `updated_at`; the
//! service layer owns the retry loop.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use mgr_domain::constants::storage::{INDEX_AGENTS, INDEX_SERVERS};
use mgr_domain::entities::{Agent, McpServer, Skill};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::repositories::{AgentRepository, ServerRepository, SkillRepository};
use mgr_domain::value_objects::{Namespace, PeerId, ServerPath};

use crate::storage::doc_id;

use super::client::{OpenSearchClient, parse_hit};

/// Upper bound for full-index listings.
const LIST_SIZE: usize = 10_000;

/// Index-backed [`ServerRepository`].
pub struct OsServerRepository {
    client: Arc<OpenSearchClient>,
}

impl OsServerRepository {
    /// Create a repository over a shared client.
    #[must_use]
    pub fn new(client: Arc<OpenSearchClient>) -> Self {
        Self { client }
    }

    fn index(ns: &Namespace) -> String {
        ns.index_name(INDEX_SERVERS)
    }
}

#[async_trait]
impl ServerRepository for OsServerRepository {
    async fn get(&self, ns: &Namespace, path: &ServerPath) -> Result<McpServer> {
        let source = self
            .client
            .get_doc(&Self::index(ns), &doc_id(path.as_str()))
            .await?
            .ok_or_else(|| Error::not_found(format!("server {path}")))?;
        serde_json::from_value(source)
            .map_err(|e| Error::backend_data_with_source(format!("malformed server {path}"), e))
    }

    async fn create(&self, ns: &Namespace, server: &McpServer) -> Result<()> {
        let doc = serde_json::to_value(server)?;
        self.client
            .put_doc(&Self::index(ns), &doc_id(server.path.as_str()), &doc, true)
            .await
            .map_err(|e| match e {
                Error::Conflict { .. } => {
                    Error::conflict(format!("server {} already exists", server.path))
                }
                other => other,
            })
    }

    async fn update(
        &self,
        ns: &Namespace,
        server: &McpServer,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let current = self.get(ns, &server.path).await?;
        if let Some(expected) = expected_updated_at {
            if current.updated_at != expected {
                return Err(Error::conflict(format!(
                    "server {} changed at {}",
                    server.path, current.updated_at
                )));
            }
        }
        let doc = serde_json::to_value(server)?;
        self.client
            .put_doc(&Self::index(ns), &doc_id(server.path.as_str()), &doc, false)
            .await
    }

    async fn upsert(&self, ns: &Namespace, server: &McpServer) -> Result<()> {
        let doc = serde_json::to_value(server)?;
        self.client
            .put_doc(&Self::index(ns), &doc_id(server.path.as_str()), &doc, false)
            .await
    }

    async fn delete(&self, ns: &Namespace, path: &ServerPath) -> Result<()> {
        self.client
            .delete_doc(&Self::index(ns), &doc_id(path.as_str()))
            .await
    }

    async fn list_all(&self, ns: &Namespace) -> Result<Vec<McpServer>> {
        // Skills share this index; exclude them by their marker field.
        let hits = self
            .client
            .search(
                &Self::index(ns),
                &json!({
                    "size": LIST_SIZE,
                    "query": {
                        "bool": {"must_not": {"exists": {"field": "skill_md_url"}}}
                    }
                }),
            )
            .await?;
        hits.iter()
            .map(|h| parse_hit::<McpServer>(h).map(|(s, _)| s))
            .collect()
    }

    async fn list_by_origin(&self, ns: &Namespace, origin: &PeerId) -> Result<Vec<McpServer>> {
        let hits = self
            .client
            .search(
                &Self::index(ns),
                &json!({
                    "size": LIST_SIZE,
                    "query": {"term": {"origin_peer": origin.as_str()}}
                }),
            )
            .await?;
        hits.iter()
            .map(|h| parse_hit::<McpServer>(h).map(|(s, _)| s))
            .collect()
    }
}

/// Index-backed [`AgentRepository`].
pub struct OsAgentRepository {
    client: Arc<OpenSearchClient>,
}

impl OsAgentRepository {
    /// Create a repository over a shared client.
    #[must_use]
    pub fn new(client: Arc<OpenSearchClient>) -> Self {
        Self { client }
    }

    fn index(ns: &Namespace) -> String {
        ns.index_name(INDEX_AGENTS)
    }
}

#[async_trait]
impl AgentRepository for OsAgentRepository {
    async fn get(&self, ns: &Namespace, path: &ServerPath) -> Result<Agent> {
        let source = self
            .client
            .get_doc(&Self::index(ns), &doc_id(path.as_str()))
            .await?
            .ok_or_else(|| Error::not_found(format!("agent {path}")))?;
        serde_json::from_value(source)
            .map_err(|e| Error::backend_data_with_source(format!("malformed agent {path}"), e))
    }

    async fn create(&self, ns: &Namespace, agent: &Agent) -> Result<()> {
        let doc = serde_json::to_value(agent)?;
        self.client
            .put_doc(&Self::index(ns), &doc_id(agent.path.as_str()), &doc, true)
            .await
            .map_err(|e| match e {
                Error::Conflict { .. } => {
                    Error::conflict(format!("agent {} already exists", agent.path))
                }
                other => other,
            })
    }

    async fn update(
        &self,
        ns: &Namespace,
        agent: &Agent,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let current = self.get(ns, &agent.path).await?;
        if let Some(expected) = expected_updated_at {
            if current.updated_at != expected {
                return Err(Error::conflict(format!(
                    "agent {} changed at {}",
                    agent.path, current.updated_at
                )));
            }
        }
        let doc = serde_json::to_value(agent)?;
        self.client
            .put_doc(&Self::index(ns), &doc_id(agent.path.as_str()), &doc, false)
            .await
    }

    async fn upsert(&self, ns: &Namespace, agent: &Agent) -> Result<()> {
        let doc = serde_json::to_value(agent)?;
        self.client
            .put_doc(&Self::index(ns), &doc_id(agent.path.as_str()), &doc, false)
            .await
    }

    async fn delete(&self, ns: &Namespace, path: &ServerPath) -> Result<()> {
        self.client
            .delete_doc(&Self::index(ns), &doc_id(path.as_str()))
            .await
    }

    async fn list_all(&self, ns: &Namespace) -> Result<Vec<Agent>> {
        let hits = self
            .client
            .search(
                &Self::index(ns),
                &json!({"size": LIST_SIZE, "query": {"match_all": {}}}),
            )
            .await?;
        hits.iter()
            .map(|h| parse_hit::<Agent>(h).map(|(a, _)| a))
            .collect()
    }

    async fn list_by_origin(&self, ns: &Namespace, origin: &PeerId) -> Result<Vec<Agent>> {
        let hits = self
            .client
            .search(
                &Self::index(ns),
                &json!({
                    "size": LIST_SIZE,
                    "query": {"term": {"origin_peer": origin.as_str()}}
                }),
            )
            .await?;
        hits.iter()
            .map(|h| parse_hit::<Agent>(h).map(|(a, _)| a))
            .collect()
    }
}

/// Index-backed [`SkillRepository`]; skills share the servers index under a
/// `skill__` id prefix so the namespace keeps six indices.
pub struct OsSkillRepository {
    client: Arc<OpenSearchClient>,
}

impl OsSkillRepository {
    /// Create a repository over a shared client.
    #[must_use]
    pub fn new(client: Arc<OpenSearchClient>) -> Self {
        Self { client }
    }

    fn index(ns: &Namespace) -> String {
        ns.index_name(INDEX_SERVERS)
    }

    fn skill_id(path: &ServerPath) -> String {
        format!("skill__{}", doc_id(path.as_str()))
    }
}

#[async_trait]
impl SkillRepository for OsSkillRepository {
    async fn get(&self, ns: &Namespace, path: &ServerPath) -> Result<Skill> {
        let source = self
            .client
            .get_doc(&Self::index(ns), &Self::skill_id(path))
            .await?
            .ok_or_else(|| Error::not_found(format!("skill {path}")))?;
        serde_json::from_value(source)
            .map_err(|e| Error::backend_data_with_source(format!("malformed skill {path}"), e))
    }

    async fn create(&self, ns: &Namespace, skill: &Skill) -> Result<()> {
        let doc = serde_json::to_value(skill)?;
        self.client
            .put_doc(&Self::index(ns), &Self::skill_id(&skill.path), &doc, true)
            .await
            .map_err(|e| match e {
                Error::Conflict { .. } => {
                    Error::conflict(format!("skill {} already exists", skill.path))
                }
                other => other,
            })
    }

    async fn update(
        &self,
        ns: &Namespace,
        skill: &Skill,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let current = self.get(ns, &skill.path).await?;
        if let Some(expected) = expected_updated_at {
            if current.updated_at != expected {
                return Err(Error::conflict(format!(
                    "skill {} changed at {}",
                    skill.path, current.updated_at
                )));
            }
        }
        let doc = serde_json::to_value(skill)?;
        self.client
            .put_doc(&Self::index(ns), &Self::skill_id(&skill.path), &doc, false)
            .await
    }

    async fn delete(&self, ns: &Namespace, path: &ServerPath) -> Result<()> {
        self.client
            .delete_doc(&Self::index(ns), &Self::skill_id(path))
            .await
    }

    async fn list_all(&self, ns: &Namespace) -> Result<Vec<Skill>> {
        let hits = self
            .client
            .search(
                &Self::index(ns),
                &json!({
                    "size": LIST_SIZE,
                    "query": {"exists": {"field": "skill_md_url"}}
                }),
            )
            .await?;
        hits.iter()
            .map(|h| parse_hit::<Skill>(h).map(|(s, _)| s))
            .collect()
    }
}
