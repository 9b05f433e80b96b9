//! Embedding document: one per server or agent, indexed for hybrid search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::ids::ServerPath;
use crate::value_objects::search::EntityType;

use super::agent::Agent;
use super::server::McpServer;

/// Name/description pair of a tool or skill, carried in the index as a
/// nested object so per-element matching works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Tool or skill name
    pub name: String,
    /// Tool or skill description
    #[serde(default)]
    pub description: String,
}

/// Searchable projection of a server or agent, plus its embedding vector.
///
/// One document exists per `(entity_type, path)`; every mutation of the
/// underlying entity re-upserts it. The vector dimension is fixed per
/// namespace at index-creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingDocument {
    /// Kind of the underlying entity
    pub entity_type: EntityType,
    /// Path of the underlying entity
    pub path: ServerPath,
    /// Display name, lexically indexed
    pub name: String,
    /// Description, lexically indexed
    #[serde(default)]
    pub description: String,
    /// Tags, lexically indexed
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the entity is currently enabled
    pub is_enabled: bool,
    /// Concatenated text the embedding was computed from
    pub text_for_embedding: String,
    /// Dense vector; empty in lexical-only operation
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Tool summaries for servers
    #[serde(default)]
    pub tools: Vec<ItemSummary>,
    /// Skill summaries for agents
    #[serde(default)]
    pub skills: Vec<ItemSummary>,
    /// Original entity document, carried for result assembly
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// When this document was (re)indexed
    pub indexed_at: DateTime<Utc>,
}

impl EmbeddingDocument {
    /// Build the document for a server; the vector is attached by the caller.
    #[must_use]
    pub fn for_server(server: &McpServer, embedding: Vec<f32>) -> Self {
        let tools: Vec<ItemSummary> = server
            .tool_list
            .iter()
            .map(|t| ItemSummary {
                name: t.name.clone(),
                description: t.description.clone(),
            })
            .collect();
        Self {
            entity_type: EntityType::Server,
            path: server.path.clone(),
            name: server.server_name.clone(),
            description: server.description.clone(),
            tags: server.tags.clone(),
            is_enabled: server.is_enabled,
            text_for_embedding: server_embedding_text(server),
            embedding,
            tools,
            skills: Vec::new(),
            metadata: serde_json::to_value(server).unwrap_or(serde_json::Value::Null),
            indexed_at: Utc::now(),
        }
    }

    /// Build the document for an agent; the vector is attached by the caller.
    #[must_use]
    pub fn for_agent(agent: &Agent, embedding: Vec<f32>) -> Self {
        let skills: Vec<ItemSummary> = agent
            .skills
            .iter()
            .map(|s| ItemSummary {
                name: s.name.clone(),
                description: s.description.clone(),
            })
            .collect();
        Self {
            entity_type: EntityType::Agent,
            path: agent.path.clone(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            tags: agent.tags.clone(),
            is_enabled: agent.is_enabled,
            text_for_embedding: agent_embedding_text(agent),
            embedding,
            tools: Vec::new(),
            skills,
            metadata: serde_json::to_value(agent).unwrap_or(serde_json::Value::Null),
            indexed_at: Utc::now(),
        }
    }
}

/// Text a server embeds as:
/// `"{name}. {description}. Tags: {tags}. Tools: {names}. {descriptions}"`.
#[must_use]
pub fn server_embedding_text(server: &McpServer) -> String {
    let tool_names: Vec<&str> = server.tool_list.iter().map(|t| t.name.as_str()).collect();
    let tool_descriptions: Vec<&str> = server
        .tool_list
        .iter()
        .map(|t| t.description.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    format!(
        "{}. {}. Tags: {}. Tools: {}. {}",
        server.server_name,
        server.description,
        server.tags.join(", "),
        tool_names.join(", "),
        tool_descriptions.join(", "),
    )
}

/// Text an agent embeds as:
/// `"{name}. {description}. Tags: {tags}. Capabilities: {capabilities}.
/// Skills: {names}. {descriptions}"`.
#[must_use]
pub fn agent_embedding_text(agent: &Agent) -> String {
    let skill_names: Vec<&str> = agent.skills.iter().map(|s| s.name.as_str()).collect();
    let skill_descriptions: Vec<&str> = agent
        .skills
        .iter()
        .map(|s| s.description.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    format!(
        "{}. {}. Tags: {}. Capabilities: {}. Skills: {}. {}",
        agent.name,
        agent.description,
        agent.tags.join(", "),
        agent.capabilities.join(", "),
        skill_names.join(", "),
        skill_descriptions.join(", "),
    )
}
