//! File-backed server, agent and skill repositories.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use mgr_domain::entities::{Agent, McpServer, Skill};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::repositories::{AgentRepository, ServerRepository, SkillRepository};
use mgr_domain::value_objects::{Namespace, PeerId, ServerPath};

use crate::storage::doc_id;

use super::store::JsonStore;

macro_rules! overlay_enabled {
    ($store:expr, $ns:expr, $entity:expr) => {{
        let state = $store.read_state($ns).await?;
        if let Some(enabled) = state.get(&doc_id($entity.path.as_str())) {
            $entity.is_enabled = *enabled;
        }
    }};
}

/// File-backed [`ServerRepository`].
pub struct FileServerRepository {
    store: JsonStore,
}

impl FileServerRepository {
    /// Create a repository rooted at the storage directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(root, "servers"),
        }
    }
}

#[async_trait]
impl ServerRepository for FileServerRepository {
    async fn get(&self, ns: &Namespace, path: &ServerPath) -> Result<McpServer> {
        let mut server: McpServer = self
            .store
            .read(ns, path.as_str())
            .await?
            .ok_or_else(|| Error::not_found(format!("server {path}")))?;
        overlay_enabled!(self.store, ns, server);
        Ok(server)
    }

    async fn create(&self, ns: &Namespace, server: &McpServer) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        if self
            .store
            .read::<McpServer>(ns, server.path.as_str())
            .await?
            .is_some()
        {
            return Err(Error::conflict(format!(
                "server {} already exists",
                server.path
            )));
        }
        self.store.write(ns, server.path.as_str(), server).await?;
        self.store
            .set_state(ns, server.path.as_str(), server.is_enabled)
            .await
    }

    async fn update(
        &self,
        ns: &Namespace,
        server: &McpServer,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        let current: McpServer = self
            .store
            .read(ns, server.path.as_str())
            .await?
            .ok_or_else(|| Error::not_found(format!("server {}", server.path)))?;
        if let Some(expected) = expected_updated_at {
            if current.updated_at != expected {
                return Err(Error::conflict(format!(
                    "server {} changed at {}",
                    server.path, current.updated_at
                )));
            }
        }
        self.store.write(ns, server.path.as_str(), server).await?;
        self.store
            .set_state(ns, server.path.as_str(), server.is_enabled)
            .await
    }

    async fn upsert(&self, ns: &Namespace, server: &McpServer) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        self.store.write(ns, server.path.as_str(), server).await?;
        self.store
            .set_state(ns, server.path.as_str(), server.is_enabled)
            .await
    }

    async fn delete(&self, ns: &Namespace, path: &ServerPath) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        self.store.remove(ns, path.as_str()).await?;
        self.store.clear_state(ns, path.as_str()).await
    }

    async fn list_all(&self, ns: &Namespace) -> Result<Vec<McpServer>> {
        let mut servers: Vec<McpServer> = self.store.list(ns).await?;
        let state = self.store.read_state(ns).await?;
        for server in &mut servers {
            if let Some(enabled) = state.get(&doc_id(server.path.as_str())) {
                server.is_enabled = *enabled;
            }
        }
        Ok(servers)
    }

    async fn list_by_origin(&self, ns: &Namespace, origin: &PeerId) -> Result<Vec<McpServer>> {
        let servers = self.list_all(ns).await?;
        Ok(servers
            .into_iter()
            .filter(|s| s.origin_peer.as_ref() == Some(origin))
            .collect())
    }
}

/// File-backed [`AgentRepository`].
pub struct FileAgentRepository {
    store: JsonStore,
}

impl FileAgentRepository {
    /// Create a repository rooted at the storage directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(root, "agents"),
        }
    }
}

#[async_trait]
impl AgentRepository for FileAgentRepository {
    async fn get(&self, ns: &Namespace, path: &ServerPath) -> Result<Agent> {
        let mut agent: Agent = self
            .store
            .read(ns, path.as_str())
            .await?
            .ok_or_else(|| Error::not_found(format!("agent {path}")))?;
        overlay_enabled!(self.store, ns, agent);
        Ok(agent)
    }

    async fn create(&self, ns: &Namespace, agent: &Agent) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        if self
            .store
            .read::<Agent>(ns, agent.path.as_str())
            .await?
            .is_some()
        {
            return Err(Error::conflict(format!(
                "agent {} already exists",
                agent.path
            )));
        }
        self.store.write(ns, agent.path.as_str(), agent).await?;
        self.store
            .set_state(ns, agent.path.as_str(), agent.is_enabled)
            .await
    }

    async fn update(
        &self,
        ns: &Namespace,
        agent: &Agent,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        let current: Agent = self
            .store
            .read(ns, agent.path.as_str())
            .await?
            .ok_or_else(|| Error::not_found(format!("agent {}", agent.path)))?;
        if let Some(expected) = expected_updated_at {
            if current.updated_at != expected {
                return Err(Error::conflict(format!(
                    "agent {} changed at {}",
                    agent.path, current.updated_at
                )));
            }
        }
        self.store.write(ns, agent.path.as_str(), agent).await?;
        self.store
            .set_state(ns, agent.path.as_str(), agent.is_enabled)
            .await
    }

    async fn upsert(&self, ns: &Namespace, agent: &Agent) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        self.store.write(ns, agent.path.as_str(), agent).await?;
        self.store
            .set_state(ns, agent.path.as_str(), agent.is_enabled)
            .await
    }

    async fn delete(&self, ns: &Namespace, path: &ServerPath) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        self.store.remove(ns, path.as_str()).await?;
        self.store.clear_state(ns, path.as_str()).await
    }

    async fn list_all(&self, ns: &Namespace) -> Result<Vec<Agent>> {
        let mut agents: Vec<Agent> = self.store.list(ns).await?;
        let state = self.store.read_state(ns).await?;
        for agent in &mut agents {
            if let Some(enabled) = state.get(&doc_id(agent.path.as_str())) {
                agent.is_enabled = *enabled;
            }
        }
        Ok(agents)
    }

    async fn list_by_origin(&self, ns: &Namespace, origin: &PeerId) -> Result<Vec<Agent>> {
        let agents = self.list_all(ns).await?;
        Ok(agents
            .into_iter()
            .filter(|a| a.origin_peer.as_ref() == Some(origin))
            .collect())
    }
}

/// File-backed [`SkillRepository`].
pub struct FileSkillRepository {
    store: JsonStore,
}

impl FileSkillRepository {
    /// Create a repository rooted at the storage directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(root, "skills"),
        }
    }
}

#[async_trait]
impl SkillRepository for FileSkillRepository {
    async fn get(&self, ns: &Namespace, path: &ServerPath) -> Result<Skill> {
        self.store
            .read(ns, path.as_str())
            .await?
            .ok_or_else(|| Error::not_found(format!("skill {path}")))
    }

    async fn create(&self, ns: &Namespace, skill: &Skill) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        if self
            .store
            .read::<Skill>(ns, skill.path.as_str())
            .await?
            .is_some()
        {
            return Err(Error::conflict(format!(
                "skill {} already exists",
                skill.path
            )));
        }
        self.store.write(ns, skill.path.as_str(), skill).await
    }

    async fn update(
        &self,
        ns: &Namespace,
        skill: &Skill,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        let current: Skill = self
            .store
            .read(ns, skill.path.as_str())
            .await?
            .ok_or_else(|| Error::not_found(format!("skill {}", skill.path)))?;
        if let Some(expected) = expected_updated_at {
            if current.updated_at != expected {
                return Err(Error::conflict(format!(
                    "skill {} changed at {}",
                    skill.path, current.updated_at
                )));
            }
        }
        self.store.write(ns, skill.path.as_str(), skill).await
    }

    async fn delete(&self, ns: &Namespace, path: &ServerPath) -> Result<()> {
        let _guard = self.store.write_lock.lock().await;
        self.store.remove(ns, path.as_str()).await
    }

    async fn list_all(&self, ns: &Namespace) -> Result<Vec<Skill>> {
        self.store.list(ns).await
    }
}
