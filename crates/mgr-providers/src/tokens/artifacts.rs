//! Client configuration artifact writer.
//!
//! Materializes two files per refresh cycle in the tokens directory, both
//! written atomically (temp + rename) with 0600 permissions:
//!
//! - `mcp.json` — Claude/Roocode client format
//! - `vscode_mcp.json` — VS Code MCP format
//!
//! No-auth services are listed too, so clients get one complete map.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::{ClientConfigWriter, ClientServiceEntry};

/// File-backed [`ClientConfigWriter`].
pub struct FileClientConfigWriter {
    dir: PathBuf,
}

impl FileClientConfigWriter {
    /// Writer rooted at the tokens directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn mcp_config(services: &[ClientServiceEntry]) -> Value {
        let mut servers = Map::new();
        for service in services {
            let mut entry = Map::new();
            entry.insert("url".to_owned(), json!(service.url));
            entry.insert("transport".to_owned(), json!(service.transport));

            let mut headers = Map::new();
            if let Some(token) = &service.auth_token {
                headers.insert("Authorization".to_owned(), json!(format!("Bearer {token}")));
            }
            for (name, value) in &service.headers {
                headers.insert(name.clone(), json!(value));
            }
            if !headers.is_empty() {
                entry.insert("headers".to_owned(), Value::Object(headers));
            }
            servers.insert(service.name.clone(), Value::Object(entry));
        }
        json!({"mcpServers": servers})
    }

    fn vscode_config(services: &[ClientServiceEntry]) -> Value {
        let mut servers = Map::new();
        for service in services {
            let mut entry = Map::new();
            entry.insert("type".to_owned(), json!("http"));
            entry.insert("url".to_owned(), json!(service.url));

            let mut headers = Map::new();
            if let Some(token) = &service.auth_token {
                headers.insert("Authorization".to_owned(), json!(format!("Bearer {token}")));
            }
            for (name, value) in &service.headers {
                headers.insert(name.clone(), json!(value));
            }
            if !headers.is_empty() {
                entry.insert("headers".to_owned(), Value::Object(headers));
            }
            servers.insert(service.name.clone(), Value::Object(entry));
        }
        json!({"servers": servers})
    }

    async fn write_secret_file(path: &Path, value: &Value) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::internal("artifact path has no parent"))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::transient_with_source("failed to create tokens dir", e))?;

        let json = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| Error::transient_with_source("failed to write artifact", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| Error::transient_with_source("failed to chmod artifact", e))?;
        }

        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| Error::transient_with_source("failed to commit artifact", e))?;
        Ok(())
    }
}

#[async_trait]
impl ClientConfigWriter for FileClientConfigWriter {
    async fn write_configs(&self, services: &[ClientServiceEntry]) -> Result<()> {
        Self::write_secret_file(&self.dir.join("mcp.json"), &Self::mcp_config(services)).await?;
        Self::write_secret_file(
            &self.dir.join("vscode_mcp.json"),
            &Self::vscode_config(services),
        )
        .await?;
        mgr_domain::debug!(
            "tokens",
            "client config artifacts written",
            &services.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<ClientServiceEntry> {
        vec![
            ClientServiceEntry {
                name: "fininfo".to_owned(),
                url: "http://localhost:7860/fininfo/mcp".to_owned(),
                auth_token: Some("tok-123".to_owned()),
                transport: "streamable-http".to_owned(),
                headers: Default::default(),
            },
            ClientServiceEntry {
                name: "currenttime".to_owned(),
                url: "http://localhost:7860/currenttime/mcp".to_owned(),
                auth_token: None,
                transport: "sse".to_owned(),
                headers: Default::default(),
            },
        ]
    }

    #[tokio::test]
    async fn writes_both_artifacts_with_complete_service_map() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = FileClientConfigWriter::new(dir.path());
        writer.write_configs(&entries()).await.expect("write");

        let mcp: Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("mcp.json")).expect("mcp.json"),
        )
        .expect("parse");
        assert!(mcp.pointer("/mcpServers/fininfo/headers/Authorization").is_some());
        // No-auth services appear without headers.
        assert!(mcp.pointer("/mcpServers/currenttime").is_some());
        assert!(mcp.pointer("/mcpServers/currenttime/headers").is_none());

        let vscode: Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("vscode_mcp.json")).expect("vscode_mcp.json"),
        )
        .expect("parse");
        assert_eq!(
            vscode.pointer("/servers/fininfo/type").and_then(Value::as_str),
            Some("http")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn artifacts_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let writer = FileClientConfigWriter::new(dir.path());
        writer.write_configs(&entries()).await.expect("write");

        let mode = std::fs::metadata(dir.path().join("mcp.json"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
