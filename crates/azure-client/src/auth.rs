//! Azure AD token acquisition
//!
//! `ServicePrincipalTokenProvider` performs the OAuth2 client-credentials
//! flow and caches the token until shortly before it expires.

use crate::error::AzureError;
use crate::models::TokenResponse;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// OAuth2 scope granting access to the ARM endpoint at `management_url`
pub fn management_scope(management_url: &str) -> String {
    format!("{}/.default", management_url.trim_end_matches('/'))
}

/// Source of bearer tokens for ARM calls
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a valid bearer token
    async fn token(&self) -> Result<String, AzureError>;
}

/// Client-credentials token provider
pub struct ServicePrincipalTokenProvider {
    client: Client,
    login_url: String,
    scope: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    cache: Mutex<Option<(String, Instant)>>,
}

impl std::fmt::Debug for ServicePrincipalTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePrincipalTokenProvider")
            .field("login_url", &self.login_url)
            .field("scope", &self.scope)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl ServicePrincipalTokenProvider {
    /// Create a provider for the given tenant and service principal; tokens
    /// are issued for the ARM endpoint at `management_url`
    pub fn new(
        client: Client,
        login_url: String,
        management_url: &str,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            client,
            login_url: login_url.trim_end_matches('/').to_string(),
            scope: management_scope(management_url),
            tenant_id,
            client_id,
            client_secret,
            cache: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for ServicePrincipalTokenProvider {
    async fn token(&self) -> Result<String, AzureError> {
        let mut cache = self.cache.lock().await;
        if let Some((token, expiry)) = cache.as_ref() {
            if Instant::now() < *expiry {
                return Ok(token.clone());
            }
        }

        let url = format!("{}/{}/oauth2/v2.0/token", self.login_url, self.tenant_id);
        debug!("Requesting Azure AD token for client {}", self.client_id);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self.client.post(&url).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AzureError::Authentication(format!(
                "token request failed: {} - {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let expires_in = token.expires_in.unwrap_or(3600);
        let expiry = Instant::now() + Duration::from_secs(expires_in.saturating_sub(60));
        *cache = Some((token.access_token.clone(), expiry));
        Ok(token.access_token)
    }
}

/// Fixed token, for tests and for tokens injected by the environment
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait::async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, AzureError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_follows_management_url() {
        assert_eq!(management_scope("https://management.azure.com"), "https://management.azure.com/.default");
        assert_eq!(
            management_scope("https://management.usgovcloudapi.net/"),
            "https://management.usgovcloudapi.net/.default"
        );
    }
}
