//! Bearer JWT verification against the identity provider's JWKS.
//!
//! Key sets are fetched per issuer and cached with a short TTL; signature,
//! issuer and audience are all enforced. An HS256 shared-secret mode exists
//! for development and tests.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use moka::future::Cache;
use serde::Deserialize;

use mgr_domain::error::{Error, Result};
use mgr_infrastructure::config::AuthConfig;

/// Claims extracted from a verified ingress token.
#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    /// Token subject
    pub subject: String,
    /// OAuth client id (`azp` or `client_id` claim)
    pub client_id: Option<String>,
    /// Group memberships
    pub groups: Vec<String>,
    /// Preferred username, when the IdP provides one
    pub username: Option<String>,
    /// Token issuer
    pub issuer: Option<String>,
}

#[derive(Deserialize)]
struct RawClaims {
    sub: String,
    #[serde(default)]
    azp: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default, rename = "cognito:groups")]
    cognito_groups: Vec<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    iss: Option<String>,
}

impl From<RawClaims> for VerifiedClaims {
    fn from(raw: RawClaims) -> Self {
        let mut groups = raw.groups;
        groups.extend(raw.cognito_groups);
        Self {
            subject: raw.sub,
            client_id: raw.azp.or(raw.client_id),
            groups,
            username: raw.preferred_username,
            issuer: raw.iss,
        }
    }
}

/// JWKS-backed verifier.
pub struct JwksVerifier {
    http: reqwest::Client,
    jwks_url: String,
    issuer: Option<String>,
    audience: Option<String>,
    cache: Cache<String, Arc<JwkSet>>,
}

impl JwksVerifier {
    fn new(jwks_url: String, issuer: Option<String>, audience: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::config_with_source("failed to build JWKS HTTP client", e))?;
        let cache = Cache::builder()
            .max_capacity(4)
            .time_to_live(Duration::from_secs(300))
            .build();
        Ok(Self {
            http,
            jwks_url,
            issuer,
            audience,
            cache,
        })
    }

    async fn key_set(&self) -> Result<Arc<JwkSet>> {
        if let Some(keys) = self.cache.get(&self.jwks_url).await {
            return Ok(keys);
        }

        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| Error::unauthenticated(format!("JWKS fetch failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::unauthenticated(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }
        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| Error::unauthenticated(format!("malformed JWKS: {e}")))?;

        let keys = Arc::new(keys);
        self.cache
            .insert(self.jwks_url.clone(), Arc::clone(&keys))
            .await;
        Ok(keys)
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }

    async fn verify(&self, token: &str) -> Result<VerifiedClaims> {
        let header = decode_header(token)
            .map_err(|e| Error::unauthenticated(format!("malformed token header: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| Error::unauthenticated("token header missing kid"))?;

        let keys = self.key_set().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| Error::unauthenticated(format!("no JWKS key matches kid '{kid}'")))?;
        let key = DecodingKey::from_jwk(jwk)
            .map_err(|e| Error::unauthenticated(format!("unusable JWKS key: {e}")))?;

        let data = decode::<RawClaims>(token, &key, &self.validation(header.alg))
            .map_err(|e| Error::unauthenticated(format!("token rejected: {e}")))?;
        Ok(data.claims.into())
    }
}

/// Ingress token verifier, selected from configuration.
pub enum AuthVerifier {
    /// RS256 against the IdP's JWKS
    Jwks(JwksVerifier),
    /// HS256 shared secret (development / tests)
    SharedSecret {
        /// The shared signing secret
        secret: String,
        /// Expected issuer, when configured
        issuer: Option<String>,
    },
}

impl AuthVerifier {
    /// Build a verifier from auth configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when neither a JWKS URL nor a shared
    /// secret is configured.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        if let Some(jwks_url) = &config.jwks_url {
            return Ok(Self::Jwks(JwksVerifier::new(
                jwks_url.clone(),
                config.issuer.clone(),
                config.audience.clone(),
            )?));
        }
        if let Some(secret) = &config.shared_secret {
            return Ok(Self::SharedSecret {
                secret: secret.clone(),
                issuer: config.issuer.clone(),
            });
        }
        Err(Error::config(
            "ingress auth requires auth.jwks_url or auth.shared_secret",
        ))
    }

    /// Verify a bearer token and extract its claims.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for any verification failure.
    pub async fn verify(&self, token: &str) -> Result<VerifiedClaims> {
        match self {
            Self::Jwks(verifier) => verifier.verify(token).await,
            Self::SharedSecret { secret, issuer } => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.validate_aud = false;
                if let Some(issuer) = issuer {
                    validation.set_issuer(&[issuer]);
                }
                let key = DecodingKey::from_secret(secret.as_bytes());
                let data = decode::<RawClaims>(token, &key, &validation)
                    .map_err(|e| Error::unauthenticated(format!("token rejected: {e}")))?;
                Ok(data.claims.into())
            }
        }
    }
}
