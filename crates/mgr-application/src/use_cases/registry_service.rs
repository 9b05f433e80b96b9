//! Registry Service Use Case
//!
//! # Overview
//! Owns the lifecycle of servers, agents, skills and virtual servers:
//! registration (optionally gated behind a security scan), partial updates
//! with optimistic concurrency, enable/disable with unsafe-verdict gating,
//! version management, and deletion with embedding/scan cascade.
//!
//! Every mutation re-indexes the entity's embedding document; that contract
//! keeps the search index in lockstep with the catalog.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use mgr_domain::entities::{Agent, McpServer, ScanStatus, Skill};
use mgr_domain::error::{Error, Result};
use mgr_domain::ports::repositories::{
    AgentRepository, SecurityScanRepository, ServerRepository, SkillRepository,
};
use mgr_domain::ports::services::{
    AgentUpdate, RegistrationOutcome, RegistryServiceInterface, ScanServiceInterface,
    SearchServiceInterface, ServerUpdate,
};
use mgr_domain::value_objects::{AuthContext, EntityType, Namespace, ServerPath};

use crate::support::retry::with_backoff;

/// Behavior toggles wired from configuration.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Whether registration enqueues a gating scan
    pub scan_on_registration: bool,
    /// Whether an `unsafe` verdict blocks enablement
    pub block_unsafe: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            scan_on_registration: false,
            block_unsafe: true,
        }
    }
}

/// Implementation of the `RegistryServiceInterface`.
pub struct RegistryServiceImpl {
    servers: Arc<dyn ServerRepository>,
    agents: Arc<dyn AgentRepository>,
    skills: Arc<dyn SkillRepository>,
    scans: Arc<dyn SecurityScanRepository>,
    search: Arc<dyn SearchServiceInterface>,
    scan_service: Arc<dyn ScanServiceInterface>,
    settings: RegistrySettings,
}

impl RegistryServiceImpl {
    /// Create the service with injected dependencies.
    pub fn new(
        servers: Arc<dyn ServerRepository>,
        agents: Arc<dyn AgentRepository>,
        skills: Arc<dyn SkillRepository>,
        scans: Arc<dyn SecurityScanRepository>,
        search: Arc<dyn SearchServiceInterface>,
        scan_service: Arc<dyn ScanServiceInterface>,
        settings: RegistrySettings,
    ) -> Self {
        Self {
            servers,
            agents,
            skills,
            scans,
            search,
            scan_service,
            settings,
        }
    }

    fn apply_server_update(server: &mut McpServer, update: ServerUpdate) {
        if let Some(v) = update.server_name {
            server.server_name = v;
        }
        if let Some(v) = update.description {
            server.description = v;
        }
        if let Some(v) = update.proxy_pass_url {
            server.proxy_pass_url = v;
        }
        if let Some(v) = update.supported_transports {
            server.supported_transports = v;
        }
        if let Some(v) = update.auth_type {
            server.auth_type = v;
        }
        if let Some(v) = update.tags {
            server.tags = v;
        }
        if let Some(v) = update.tool_list {
            server.tool_list = v;
        }
        if let Some(v) = update.visibility {
            server.visibility = v;
        }
        if let Some(v) = update.versions {
            server.versions = v;
        }
        if let Some(v) = update.backend_paths {
            server.backend_paths = v;
        }
    }

    fn apply_agent_update(agent: &mut Agent, update: AgentUpdate) {
        if let Some(v) = update.name {
            agent.name = v;
        }
        if let Some(v) = update.description {
            agent.description = v;
        }
        if let Some(v) = update.proxy_pass_url {
            agent.proxy_pass_url = v;
        }
        if let Some(v) = update.protocol_version {
            agent.protocol_version = v;
        }
        if let Some(v) = update.capabilities {
            agent.capabilities = v;
        }
        if let Some(v) = update.skills {
            agent.skills = v;
        }
        if let Some(v) = update.trust_level {
            agent.trust_level = v;
        }
        if let Some(v) = update.visibility {
            agent.visibility = v;
        }
        if let Some(v) = update.tags {
            agent.tags = v;
        }
    }
}

#[async_trait]
impl RegistryServiceInterface for RegistryServiceImpl {
    async fn register_server(
        &self,
        ns: &Namespace,
        mut server: McpServer,
    ) -> Result<RegistrationOutcome<McpServer>> {
        server.validate()?;
        let now = Utc::now();
        server.created_at = now;
        server.updated_at = now;

        let gated = self.settings.scan_on_registration && !server.is_virtual();
        if gated {
            server.is_enabled = false;
            server.add_security_pending_tag();
        } else {
            server.is_enabled = true;
        }

        with_backoff("registry.register_server", || {
            self.servers.create(ns, &server)
        })
        .await?;

        let mut scan_status = None;
        if gated {
            let result = self.scan_service.scan_server(ns, &server.path).await?;
            scan_status = Some(result.scan_status);

            if result.scan_status == ScanStatus::Safe {
                server.is_enabled = true;
                server.remove_security_pending_tag();
                server.updated_at = Utc::now();
                with_backoff("registry.register_server", || {
                    self.servers.update(ns, &server, None)
                })
                .await?;
                mgr_domain::info!(
                    "registry",
                    "server passed registration scan",
                    &server.path
                );
            } else {
                mgr_domain::warn!(
                    "registry",
                    "server gated by registration scan",
                    &format!("{} verdict={}", server.path, result.scan_status)
                );
            }
        }

        self.search.index_server(ns, &server).await?;

        Ok(RegistrationOutcome {
            entity: server,
            scan_status,
        })
    }

    async fn get_server(&self, ns: &Namespace, path: &ServerPath) -> Result<McpServer> {
        with_backoff("registry.get_server", || self.servers.get(ns, path)).await
    }

    async fn list_servers(
        &self,
        ns: &Namespace,
        include_disabled: bool,
    ) -> Result<Vec<McpServer>> {
        let mut servers = with_backoff("registry.list_servers", || self.servers.list_all(ns)).await?;
        if !include_disabled {
            servers.retain(|s| s.is_enabled);
        }
        servers.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(servers)
    }

    async fn update_server(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        update: ServerUpdate,
    ) -> Result<McpServer> {
        let mut server = self.servers.get(ns, path).await?;
        let expected = update.expected_updated_at.or(Some(server.updated_at));
        Self::apply_server_update(&mut server, update);
        server.validate()?;
        server.updated_at = Utc::now();

        with_backoff("registry.update_server", || {
            self.servers.update(ns, &server, expected)
        })
        .await?;
        self.search.index_server(ns, &server).await?;
        Ok(server)
    }

    async fn toggle_server(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        enabled: bool,
        override_unsafe: bool,
        ctx: &AuthContext,
    ) -> Result<McpServer> {
        let mut server = self.servers.get(ns, path).await?;

        if enabled && self.settings.block_unsafe {
            let blocked = self.scan_service.is_enable_blocked(ns, path).await?;
            if blocked {
                if !(ctx.is_admin() && override_unsafe) {
                    return Err(Error::forbidden(format!(
                        "{path}:enable:security-override"
                    )));
                }
                server.remove_security_pending_tag();
                mgr_domain::warn!(
                    "registry",
                    "admin override enabled an unsafe-verdict server",
                    &format!("{path} by {}", ctx.subject)
                );
            }
        }

        let expected = Some(server.updated_at);
        server.is_enabled = enabled;
        server.updated_at = Utc::now();

        // No retry here: a Conflict means a concurrent toggle won, and the
        // caller must re-read before deciding again.
        self.servers.update(ns, &server, expected).await?;
        self.search.index_server(ns, &server).await?;
        Ok(server)
    }

    async fn set_default_version(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        version: &str,
    ) -> Result<McpServer> {
        let mut server = self.servers.get(ns, path).await?;
        let expected = Some(server.updated_at);
        server.set_default_version(version)?;
        server.updated_at = Utc::now();

        with_backoff("registry.set_default_version", || {
            self.servers.update(ns, &server, expected)
        })
        .await?;
        self.search.index_server(ns, &server).await?;
        Ok(server)
    }

    async fn delete_server(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        echo_name: &str,
    ) -> Result<()> {
        let server = self.servers.get(ns, path).await?;
        if server.server_name != echo_name {
            return Err(Error::bad_request_field(
                "server_name echo does not match; deletion rejected",
                "server_name",
            ));
        }

        with_backoff("registry.delete_server", || self.servers.delete(ns, path)).await?;
        self.search.remove(ns, EntityType::Server, path).await?;
        self.scans.delete_for(ns, path).await?;
        mgr_domain::info!("registry", "server deleted", path);
        Ok(())
    }

    async fn resolve_virtual_backend(
        &self,
        ns: &Namespace,
        virtual_server: &McpServer,
        tool: &str,
    ) -> Result<McpServer> {
        // Routing is deterministic: first composed backend advertising the
        // tool wins, in backend_paths order.
        for backend_path in &virtual_server.backend_paths {
            let backend = match self.servers.get(ns, backend_path).await {
                Ok(b) => b,
                Err(Error::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            };
            if backend.tool_list.iter().any(|t| t.name == tool) {
                return Ok(backend);
            }
        }
        Err(Error::not_found(format!(
            "tool '{tool}' on virtual server {}",
            virtual_server.path
        )))
    }

    async fn register_agent(
        &self,
        ns: &Namespace,
        mut agent: Agent,
    ) -> Result<RegistrationOutcome<Agent>> {
        agent.validate()?;
        let now = Utc::now();
        agent.created_at = now;
        agent.updated_at = now;
        agent.is_enabled = true;

        with_backoff("registry.register_agent", || self.agents.create(ns, &agent)).await?;
        self.search.index_agent(ns, &agent).await?;

        Ok(RegistrationOutcome {
            entity: agent,
            scan_status: None,
        })
    }

    async fn get_agent(&self, ns: &Namespace, path: &ServerPath) -> Result<Agent> {
        with_backoff("registry.get_agent", || self.agents.get(ns, path)).await
    }

    async fn list_agents(&self, ns: &Namespace, include_disabled: bool) -> Result<Vec<Agent>> {
        let mut agents = with_backoff("registry.list_agents", || self.agents.list_all(ns)).await?;
        if !include_disabled {
            agents.retain(|a| a.is_enabled);
        }
        agents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(agents)
    }

    async fn update_agent(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        update: AgentUpdate,
    ) -> Result<Agent> {
        let mut agent = self.agents.get(ns, path).await?;
        let expected = update.expected_updated_at.or(Some(agent.updated_at));
        Self::apply_agent_update(&mut agent, update);
        agent.validate()?;
        agent.updated_at = Utc::now();

        with_backoff("registry.update_agent", || {
            self.agents.update(ns, &agent, expected)
        })
        .await?;
        self.search.index_agent(ns, &agent).await?;
        Ok(agent)
    }

    async fn toggle_agent(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        enabled: bool,
        _ctx: &AuthContext,
    ) -> Result<Agent> {
        let mut agent = self.agents.get(ns, path).await?;
        let expected = Some(agent.updated_at);
        agent.is_enabled = enabled;
        agent.updated_at = Utc::now();

        self.agents.update(ns, &agent, expected).await?;
        self.search.index_agent(ns, &agent).await?;
        Ok(agent)
    }

    async fn delete_agent(
        &self,
        ns: &Namespace,
        path: &ServerPath,
        echo_name: &str,
    ) -> Result<()> {
        let agent = self.agents.get(ns, path).await?;
        if agent.name != echo_name {
            return Err(Error::bad_request_field(
                "name echo does not match; deletion rejected",
                "name",
            ));
        }

        with_backoff("registry.delete_agent", || self.agents.delete(ns, path)).await?;
        self.search.remove(ns, EntityType::Agent, path).await?;
        mgr_domain::info!("registry", "agent deleted", path);
        Ok(())
    }

    async fn register_skill(&self, ns: &Namespace, mut skill: Skill) -> Result<Skill> {
        skill.validate()?;
        let now = Utc::now();
        skill.created_at = now;
        skill.updated_at = now;

        with_backoff("registry.register_skill", || self.skills.create(ns, &skill)).await?;
        Ok(skill)
    }

    async fn get_skill(&self, ns: &Namespace, path: &ServerPath) -> Result<Skill> {
        with_backoff("registry.get_skill", || self.skills.get(ns, path)).await
    }

    async fn list_skills(&self, ns: &Namespace) -> Result<Vec<Skill>> {
        let mut skills = with_backoff("registry.list_skills", || self.skills.list_all(ns)).await?;
        skills.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(skills)
    }

    async fn update_skill(&self, ns: &Namespace, mut skill: Skill) -> Result<Skill> {
        skill.validate()?;
        let current = self.skills.get(ns, &skill.path).await?;
        skill.created_at = current.created_at;
        skill.updated_at = Utc::now();

        with_backoff("registry.update_skill", || {
            self.skills.update(ns, &skill, Some(current.updated_at))
        })
        .await?;
        Ok(skill)
    }

    async fn delete_skill(&self, ns: &Namespace, path: &ServerPath) -> Result<()> {
        with_backoff("registry.delete_skill", || self.skills.delete(ns, path)).await
    }

    async fn rate_skill(&self, ns: &Namespace, path: &ServerPath, rating: u8) -> Result<Skill> {
        let mut skill = self.skills.get(ns, path).await?;
        let expected = Some(skill.updated_at);
        skill.record_rating(rating)?;
        skill.updated_at = Utc::now();

        self.skills.update(ns, &skill, expected).await?;
        Ok(skill)
    }
}
