//! OAuth 2.0 client-credentials token acquisition.
//!
//! [`TokenProvider`] owns the single cached access token for a connector
//! instance. Tokens are requested lazily, reused while valid, and replaced
//! once expired; there is no external invalidation path and nothing is ever
//! persisted. The cache is guarded by a mutex so concurrent blob downloads
//! that race on a refresh perform it once.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{ConnectorError, Result};
use crate::config::ConnectorConfig;

/// Bounded per-request timeout applied to every outbound call.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Seconds subtracted from the reported lifetime so a token is never used
/// right at its expiry boundary.
const EXPIRY_SAFETY_MARGIN_SECS: i64 = 30;

const OAUTH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Default identity endpoint for a tenant.
pub(crate) fn default_token_url(tenant_id: &str) -> String {
    format!(
        "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
        tenant_id
    )
}

/// A bearer token with its computed expiry instant.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Raw bearer token value.
    pub token: String,
    /// Instant at or after which the token must not be used.
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Identity endpoint token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Expiry-aware provider of client-credentials access tokens.
pub struct TokenProvider {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    /// Creates a provider for the given credentials and identity endpoint.
    pub fn new(
        client: reqwest::Client,
        config: &ConnectorConfig,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: token_url.into(),
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid bearer token, requesting a new one if the cached
    /// token is absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Authentication`] when the token request
    /// fails or is rejected. No retry is attempted.
    pub async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.is_expired(Utc::now()) {
                return Ok(token.token.clone());
            }
        }

        let token = self.request_token().await?;
        let bearer = token.token.clone();
        *cached = Some(token);
        Ok(bearer)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", OAUTH_SCOPE),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .timeout(REQUEST_TIMEOUT)
            .form(&params)
            .send()
            .await
            .map_err(|e| ConnectorError::Authentication(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Authentication(format!(
                "token request rejected ({}): {}",
                status,
                self.redact(&body)
            )));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            ConnectorError::Authentication(format!("parse token response: {}", e))
        })?;

        let lifetime = (token_response.expires_in - EXPIRY_SAFETY_MARGIN_SECS).max(0);
        let expires_at = Utc::now() + ChronoDuration::seconds(lifetime);

        tracing::debug!(%expires_at, "acquired client-credentials access token");

        Ok(AccessToken {
            token: token_response.access_token,
            expires_at,
        })
    }

    /// Truncates an upstream error body and strips the client secret from
    /// it before it is embedded in an error message.
    fn redact(&self, body: &str) -> String {
        let snippet: String = body.chars().take(256).collect();
        snippet.replace(&self.client_secret, "[redacted]")
    }
}
