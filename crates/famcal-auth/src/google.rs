//! Google OAuth2 token refresh for Calendar access.

use anyhow::{Context, Result};
use famcal_core::GoogleConfig;
use serde::{Deserialize, Serialize};

use crate::storage::{TokenSet, TokenStore};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Cache key for Google tokens in the [`TokenStore`].
pub const GOOGLE_SERVICE: &str = "google";

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

impl GoogleTokenResponse {
    fn into_token_set(self, refresh_token: &str) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: Some(self.refresh_token.unwrap_or_else(|| refresh_token.to_string())),
            expires_at: chrono::Utc::now().timestamp() + self.expires_in as i64,
            scopes: self.scope.split_whitespace().map(str::to_string).collect(),
        }
    }
}

pub struct GoogleOAuth2Provider {
    pub client_id: String,
    pub client_secret: String,
    token_url: String,
    client: reqwest::Client,
}

impl GoogleOAuth2Provider {
    /// Requests go through `client`, so its timeout bounds the refresh.
    pub fn new(client: reqwest::Client, client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client,
        }
    }

    #[cfg(test)]
    pub fn new_with_token_url(
        client: reqwest::Client,
        client_id: &str,
        client_secret: &str,
        token_url: &str,
    ) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_url: token_url.to_string(),
            client,
        }
    }

    /// Exchange a refresh token for a fresh access token.
    #[tracing::instrument(skip(self, refresh_token), level = "info")]
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<GoogleTokenResponse> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("Failed to send refresh request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Token refresh failed: {}", error_text);
        }

        response
            .json::<GoogleTokenResponse>()
            .await
            .context("Failed to parse refresh response")
    }
}

/// Source of bearer tokens for the Calendar API.
///
/// A static token (GOOGLE_ACCESS_TOKEN) wins; otherwise a cached token is reused until
/// it is close to expiry, then refreshed through the OAuth2 refresh flow.
pub struct GoogleAuth {
    static_token: Option<String>,
    provider: Option<GoogleOAuth2Provider>,
    refresh_token: Option<String>,
    store: TokenStore,
}

impl GoogleAuth {
    pub fn from_config(config: &GoogleConfig, client: reqwest::Client, store: TokenStore) -> Self {
        let provider = config.has_refresh_credentials().then(|| {
            GoogleOAuth2Provider::new(
                client,
                config.client_id.clone(),
                config.client_secret.clone(),
            )
        });

        Self {
            static_token: config.access_token.clone(),
            provider,
            refresh_token: config.refresh_token.clone(),
            store,
        }
    }

    #[cfg(test)]
    fn with_provider(provider: GoogleOAuth2Provider, refresh_token: &str, store: TokenStore) -> Self {
        Self {
            static_token: None,
            provider: Some(provider),
            refresh_token: Some(refresh_token.to_string()),
            store,
        }
    }

    /// Return a usable access token, refreshing and caching it when needed.
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        let (provider, refresh_token) = match (&self.provider, &self.refresh_token) {
            (Some(p), Some(r)) => (p, r),
            _ => anyhow::bail!(
                "Google credentials not configured: set GOOGLE_ACCESS_TOKEN or google.client_id, google.client_secret and google.refresh_token"
            ),
        };

        match self.store.retrieve_token(GOOGLE_SERVICE) {
            Ok(Some(cached)) if !cached.needs_refresh() => {
                tracing::debug!("Using cached Google access token");
                return Ok(cached.access_token);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring unreadable token cache: {:#}", e),
        }

        let response = match provider.refresh_token(refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                if let Err(del) = self.store.delete_token(GOOGLE_SERVICE) {
                    tracing::warn!("Failed to clear token cache: {:#}", del);
                }
                return Err(e);
            }
        };

        let token_set = response.into_token_set(refresh_token);
        if let Err(e) = self.store.store_token(GOOGLE_SERVICE, &token_set) {
            tracing::warn!("Failed to cache Google access token: {:#}", e);
        }

        tracing::info!("Refreshed Google access token");
        Ok(token_set.access_token)
    }
}
