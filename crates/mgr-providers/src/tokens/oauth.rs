//! OAuth2 client-credentials token client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use mgr_domain::error::{Error, Result};
use mgr_domain::ports::providers::{IssuedToken, TokenClient};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_owned()
}

fn default_expires_in() -> i64 {
    3600
}

/// HTTP-backed [`TokenClient`].
pub struct HttpTokenClient {
    http: reqwest::Client,
}

impl HttpTokenClient {
    /// Create the client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::config_with_source("failed to build token HTTP client", e))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl TokenClient for HttpTokenClient {
    async fn client_credentials(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        scope: Option<&str>,
    ) -> Result<IssuedToken> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        if let Some(scope) = scope {
            form.push(("scope", scope));
        }

        let response = self
            .http
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::transient_with_source("token endpoint unreachable", e))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Error::transient(format!("token endpoint returned {status}")));
        }
        if !status.is_success() {
            return Err(Error::unauthenticated(format!(
                "token endpoint rejected client credentials with {status}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::backend_data_with_source("malformed token response", e))?;

        Ok(IssuedToken {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
        })
    }
}
