//! Azure client errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with Azure Resource Manager
#[derive(Debug, Error)]
pub enum AzureError {
    /// HTTP request/response error (connection refused, TLS, body decode, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// ARM returned a non-success status with an error payload
    #[error("Azure API error {status} ({}): {message}", .code.as_deref().unwrap_or("no code"))]
    Api {
        /// HTTP status code
        status: u16,
        /// `error.code` from the response body, if any
        code: Option<String>,
        /// `error.message` from the response body, or the raw body
        message: String,
        /// Delay requested by the `Retry-After` header
        retry_after: Option<Duration>,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Token acquisition failed or the token was rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource (or one of its parents) not found
    #[error("Not found ({code}): {message}")]
    NotFound {
        /// `error.code` from the response body, e.g. "ResourceGroupNotFound"
        code: String,
        /// `error.message` from the response body
        message: String,
    },

    /// The call did not complete within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AzureError {
    /// Provider error code, if the error carries one
    pub fn code(&self) -> Option<&str> {
        match self {
            AzureError::Api { code, .. } => code.as_deref(),
            AzureError::NotFound { code, .. } => Some(code),
            _ => None,
        }
    }

    /// HTTP status of the failed call, if known
    pub fn status(&self) -> Option<u16> {
        match self {
            AzureError::Api { status, .. } => Some(*status),
            AzureError::NotFound { .. } => Some(404),
            AzureError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Provider-supplied retry delay, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AzureError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether the target (or a parent of it) does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, AzureError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_accessors() {
        let err = AzureError::Api {
            status: 429,
            code: Some("TooManyRequests".to_string()),
            message: "slow down".to_string(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.code(), Some("TooManyRequests"));
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Azure API error 429 (TooManyRequests): slow down");
    }

    #[test]
    fn test_not_found_accessors() {
        let err = AzureError::NotFound {
            code: "ResourceGroupNotFound".to_string(),
            message: "Resource group 'gone' could not be found.".to_string(),
        };
        assert_eq!(err.code(), Some("ResourceGroupNotFound"));
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
    }
}
