//! Common utilities for the Azure Resource Manager client
//!
//! Wraps `reqwest` with bearer authentication, `api-version` handling and
//! translation of ARM error payloads into `AzureError`.

use crate::auth::TokenProvider;
use crate::error::AzureError;
use crate::models::ErrorResponse;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// HTTP client wrapper with authentication
pub struct HttpClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path and api-version
    pub fn build_url(&self, path: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.base_url, path, api_version)
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        api_version: &str,
    ) -> Result<T, AzureError> {
        let url = self.build_url(path, api_version);
        debug!("GET {}", url);

        let token = self.tokens.token().await?;
        let response = self.client
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Make a PUT request
    pub async fn put<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        api_version: &str,
        body: &serde_json::Value,
    ) -> Result<T, AzureError> {
        let url = self.build_url(path, api_version);
        debug!("PUT {} with body: {}", url, body);

        let token = self.tokens.token().await?;
        let response = self.client
            .put(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, AzureError> {
        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, retry_after, &body));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Translate a non-success ARM response into an `AzureError`
pub fn error_from_response(status: StatusCode, retry_after: Option<Duration>, body: &str) -> AzureError {
    let (code, message) = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => (Some(parsed.error.code), parsed.error.message),
        Err(_) => (None, body.chars().take(500).collect()),
    };

    match status {
        StatusCode::NOT_FOUND => AzureError::NotFound {
            code: code.unwrap_or_else(|| "NotFound".to_string()),
            message,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AzureError::Authentication(format!("{}: {}", status, message))
        }
        _ => AzureError::Api {
            status: status.as_u16(),
            code,
            message,
            retry_after,
        },
    }
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_error_from_response_not_found() {
        let body = r#"{"error":{"code":"ResourceGroupNotFound","message":"Resource group 'gone' could not be found."}}"#;
        let err = error_from_response(StatusCode::NOT_FOUND, None, body);
        assert!(matches!(err, AzureError::NotFound { ref code, .. } if code == "ResourceGroupNotFound"));
    }

    #[test]
    fn test_error_from_response_api_with_retry_after() {
        let body = r#"{"error":{"code":"TooManyRequests","message":"Rate limit exceeded"}}"#;
        let err = error_from_response(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(12)), body);
        assert_eq!(err.code(), Some("TooManyRequests"));
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_error_from_response_unparsable_body() {
        let err = error_from_response(StatusCode::BAD_GATEWAY, None, "<html>bad gateway</html>");
        assert_eq!(err.code(), None);
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_error_from_response_auth() {
        let err = error_from_response(StatusCode::FORBIDDEN, None, "{}");
        assert!(matches!(err, AzureError::Authentication(_)));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(30)));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }
}
