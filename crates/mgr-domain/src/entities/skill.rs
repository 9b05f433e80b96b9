//! Skill entity: a reusable capability document targeting agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value_objects::ids::ServerPath;

use super::server::Visibility;

/// A tool a skill is allowed to call, with the capabilities it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowedTool {
    /// Tool name on the backing server
    pub tool_name: String,
    /// Path of the server exposing the tool
    pub server_path: ServerPath,
    /// Capability labels the skill exercises through this tool
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Registered skill document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    /// Unique routing path within the namespace
    pub path: ServerPath,
    /// Display name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// URL of the skill markdown document
    #[serde(default)]
    pub skill_md_url: String,
    /// Skill version label
    #[serde(default)]
    pub version: String,
    /// Author attribution
    #[serde(default)]
    pub author: String,
    /// Catalog visibility
    #[serde(default)]
    pub visibility: Visibility,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Agent paths this skill targets
    #[serde(default)]
    pub target_agents: Vec<String>,
    /// Tools the skill may invoke
    #[serde(default)]
    pub allowed_tools: Vec<AllowedTool>,
    /// Runtime requirements, provider-specific
    #[serde(default)]
    pub requirements: serde_json::Value,
    /// Running average of user ratings in `[0, 5]`
    #[serde(default)]
    pub average_rating: f64,
    /// Number of ratings received
    #[serde(default)]
    pub rating_count: u64,
    /// Creation timestamp, server-assigned
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp; optimistic concurrency token
    pub updated_at: DateTime<Utc>,
}

impl Skill {
    /// Minimal constructor; timestamps are set to now.
    pub fn new(path: ServerPath, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            path,
            name: name.into(),
            description: String::new(),
            skill_md_url: String::new(),
            version: String::new(),
            author: String::new(),
            visibility: Visibility::default(),
            tags: Vec::new(),
            target_agents: Vec::new(),
            allowed_tools: Vec::new(),
            requirements: serde_json::Value::Null,
            average_rating: 0.0,
            rating_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold a new rating into the running average.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when the rating is outside `[1, 5]`.
    pub fn record_rating(&mut self, rating: u8) -> Result<()> {
        if !(1..=5).contains(&rating) {
            return Err(Error::bad_request_field(
                "rating must be between 1 and 5",
                "rating",
            ));
        }
        let total = self.average_rating * self.rating_count as f64 + f64::from(rating);
        self.rating_count += 1;
        self.average_rating = total / self.rating_count as f64;
        Ok(())
    }

    /// Validate cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` on an empty name.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::bad_request_field("name must not be empty", "name"));
        }
        Ok(())
    }
}
