//! Thin OpenSearch HTTP client.
//!
//! Maps the backend's status codes onto the repository error contract:
//! transport failures and 5xx are `TransientBackend` (retryable), 409 is
//! `Conflict`, 400 is `BackendData`. 404 is returned to the caller, who
//! knows whether absence means `NotFound` or success.

use std::time::Duration;

use base64::Engine;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use mgr_domain::error::{Error, Result};

/// Connection settings for the distributed index.
#[derive(Debug, Clone)]
pub struct OpenSearchSettings {
    /// Base URL, e.g. `https://opensearch:9200`
    pub url: String,
    /// Basic-auth username
    pub username: Option<String>,
    /// Basic-auth password
    pub password: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenSearchSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_owned(),
            username: None,
            password: None,
            timeout_secs: 10,
        }
    }
}

/// Shared HTTP client for all index repositories.
pub struct OpenSearchClient {
    http: Client,
    base_url: String,
    basic_auth: Option<String>,
}

impl OpenSearchClient {
    /// Build a client from settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be built.
    pub fn new(settings: &OpenSearchSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::config_with_source("failed to build index HTTP client", e))?;

        let basic_auth = match (&settings.username, &settings.password) {
            (Some(user), Some(pass)) => Some(format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"))
            )),
            _ => None,
        };

        Ok(Self {
            http,
            base_url: settings.url.trim_end_matches('/').to_owned(),
            basic_auth,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value)> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self.http.request(method, &url);
        if let Some(auth) = &self.basic_auth {
            request = request.header("Authorization", auth);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transient_with_source(format!("index request to {url} failed"), e))?;
        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_server_error() {
            return Err(Error::transient(format!(
                "index returned {status} for {url}: {payload}"
            )));
        }
        match status {
            StatusCode::CONFLICT => Err(Error::conflict(format!("index conflict at {url}"))),
            StatusCode::BAD_REQUEST => Err(Error::backend_data(format!(
                "index rejected request at {url}: {payload}"
            ))),
            _ => Ok((status, payload)),
        }
    }

    /// Fetch a document's `_source`; `None` on 404.
    pub async fn get_doc(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let (status, payload) = self
            .send(Method::GET, &format!("{index}/_doc/{id}"), None)
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(payload.get("_source").cloned())
    }

    /// Store a document; `create_only` maps duplicate keys to `Conflict`.
    pub async fn put_doc(
        &self,
        index: &str,
        id: &str,
        doc: &Value,
        create_only: bool,
    ) -> Result<()> {
        let op = if create_only { "&op_type=create" } else { "" };
        let (status, payload) = self
            .send(
                Method::PUT,
                &format!("{index}/_doc/{id}?refresh=true{op}"),
                Some(doc),
            )
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Err(Error::transient(format!(
                "index {index} missing while writing: {payload}"
            )));
        }
        Ok(())
    }

    /// Delete a document; absence is success.
    pub async fn delete_doc(&self, index: &str, id: &str) -> Result<()> {
        self.send(
            Method::DELETE,
            &format!("{index}/_doc/{id}?refresh=true"),
            None,
        )
        .await?;
        Ok(())
    }

    /// Delete by query (scan-history cascade).
    pub async fn delete_by_query(&self, index: &str, query: &Value) -> Result<()> {
        self.send(
            Method::POST,
            &format!("{index}/_delete_by_query?refresh=true"),
            Some(query),
        )
        .await?;
        Ok(())
    }

    /// Run a search; returns the hit array (`hits.hits`).
    pub async fn search(&self, index: &str, body: &Value) -> Result<Vec<Value>> {
        let (status, payload) = self
            .send(Method::POST, &format!("{index}/_search"), Some(body))
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        Ok(payload
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Whether an index exists.
    pub async fn index_exists(&self, index: &str) -> Result<bool> {
        let (status, _) = self.send(Method::HEAD, index, None).await?;
        Ok(status.is_success())
    }

    /// Create an index with the given settings/mappings body.
    pub async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        self.send(Method::PUT, index, Some(body)).await?;
        Ok(())
    }

    /// Drop an index; absence is success.
    pub async fn delete_index(&self, index: &str) -> Result<()> {
        self.send(Method::DELETE, index, None).await?;
        Ok(())
    }

    /// Mapping of an index, as returned by `GET /{index}/_mapping`.
    pub async fn get_mapping(&self, index: &str) -> Result<Option<Value>> {
        let (status, payload) = self.send(Method::GET, &format!("{index}/_mapping"), None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(payload))
    }
}

/// Parse one search hit into `(source, score)`.
pub(crate) fn parse_hit<T: serde::de::DeserializeOwned>(hit: &Value) -> Result<(T, f32)> {
    let source = hit
        .get("_source")
        .cloned()
        .ok_or_else(|| Error::backend_data("search hit without _source"))?;
    let score = hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
    let parsed: T = serde_json::from_value(source)
        .map_err(|e| Error::backend_data_with_source("malformed document in index", e))?;
    Ok((parsed, score))
}
