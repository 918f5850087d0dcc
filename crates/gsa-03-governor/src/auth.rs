//! OAuth2 client credentials for the Governor API.
//!
//! Tokens are cached and reused until 30 seconds before they expire.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{GovernorError, GovernorResult};

/// Scopes the addon needs to read groups, users and applications.
pub const DEFAULT_SCOPES: &[&str] = &[
    "read:governor:users",
    "read:governor:groups",
    "read:governor:applications",
];

/// Refresh this long before the token's stated expiry.
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Client credentials grant parameters.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    /// Sent as the `audience` form parameter.
    pub audience: String,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("audience", &self.audience)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// Fetches and caches access tokens. Clones share the cache.
#[derive(Debug, Clone)]
pub struct TokenSource {
    credentials: ClientCredentials,
    cached: Arc<RwLock<Option<CachedToken>>>,
    http: reqwest::Client,
}

impl TokenSource {
    pub fn new(credentials: ClientCredentials, http: reqwest::Client) -> Self {
        Self {
            credentials,
            cached: Arc::new(RwLock::new(None)),
            http,
        }
    }

    /// A valid access token, fetching a new one when needed.
    pub async fn token(&self) -> GovernorResult<String> {
        {
            let cache = self.cached.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| !c.is_expired()) {
                return Ok(cached.access_token.clone());
            }
        }

        debug!(token_url = %self.credentials.token_url, "fetching governor access token");

        let scope = self.credentials.scopes.join(" ");
        let mut form = vec![("grant_type", "client_credentials")];
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }
        if !self.credentials.audience.is_empty() {
            form.push(("audience", self.credentials.audience.as_str()));
        }

        let response = self
            .http
            .post(&self.credentials.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&form)
            .send()
            .await
            .map_err(|e| GovernorError::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GovernorError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GovernorError::Auth(format!("failed to parse token response: {e}")))?;

        let expires_at = token
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs).saturating_sub(EXPIRY_SKEW));

        *self.cached.write().await = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }

    /// Drop the cached token, e.g. after a 401.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}
