//! Provider error classification.
//!
//! Every provider failure is mapped exactly once, here, to a
//! `ProviderErrorKind`. The kind alone decides how the reconciler retries.

use azure_client::AzureError;
use crds::{ErrorCategory, ProviderErrorKind};
use std::time::Duration;

/// How a failed pass is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    /// Retry with exponential backoff
    Backoff,
    /// Do not retry until the spec changes
    Terminal,
    /// Retry once without delay, then back off
    ImmediateOnce,
    /// Retry after the provider's `Retry-After`, else back off
    HonorProviderDelay,
    /// Back off, and give up after a bounded number of attempts
    CappedBackoff,
}

impl RetryDisposition {
    /// Disposition of an error kind
    pub fn of(kind: ProviderErrorKind) -> Self {
        match kind {
            ProviderErrorKind::ResourceGroupNotFound | ProviderErrorKind::ParentNotFound => RetryDisposition::Backoff,
            ProviderErrorKind::BadRequest => RetryDisposition::Terminal,
            ProviderErrorKind::Conflict => RetryDisposition::ImmediateOnce,
            ProviderErrorKind::Throttled => RetryDisposition::HonorProviderDelay,
            ProviderErrorKind::Unknown => RetryDisposition::CappedBackoff,
        }
    }
}

/// Status category of an error kind
pub fn category(kind: ProviderErrorKind) -> ErrorCategory {
    match kind {
        ProviderErrorKind::ResourceGroupNotFound => ErrorCategory::DependencyMissingResourceGroup,
        ProviderErrorKind::ParentNotFound => ErrorCategory::DependencyMissingNamespace,
        ProviderErrorKind::BadRequest => ErrorCategory::RequestInvalid,
        ProviderErrorKind::Conflict | ProviderErrorKind::Throttled => ErrorCategory::ProviderTransient,
        ProviderErrorKind::Unknown => ErrorCategory::ProviderUnclassified,
    }
}

/// A classified failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ProviderErrorKind,
    pub disposition: RetryDisposition,
    /// Provider-requested delay (`Retry-After`), if any
    pub retry_after: Option<Duration>,
    pub message: String,
}

impl Classification {
    /// Classification for a failure detected without a provider error
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            disposition: RetryDisposition::of(kind),
            retry_after: None,
            message: message.into(),
        }
    }
}

/// Classify a provider error
pub fn classify(error: &AzureError) -> Classification {
    let kind = match error {
        AzureError::InvalidRequest(_) => ProviderErrorKind::BadRequest,
        AzureError::Http(_)
        | AzureError::Timeout(_)
        | AzureError::Serialization(_)
        | AzureError::Authentication(_) => ProviderErrorKind::Unknown,
        AzureError::Api { .. } | AzureError::NotFound { .. } => match error.code() {
            Some(code) => kind_for_code(code).unwrap_or(ProviderErrorKind::Unknown),
            None => error.status().map_or(ProviderErrorKind::Unknown, kind_for_status),
        },
    };

    Classification {
        kind,
        disposition: RetryDisposition::of(kind),
        retry_after: error.retry_after(),
        message: error.to_string(),
    }
}

fn kind_for_code(code: &str) -> Option<ProviderErrorKind> {
    let kind = match code {
        "ResourceGroupNotFound" => ProviderErrorKind::ResourceGroupNotFound,
        "ParentResourceNotFound" | "ResourceNotFound" | "NamespaceNotFound" => ProviderErrorKind::ParentNotFound,
        "BadRequest" | "InvalidRequestContent" | "InvalidParameter" | "FeatureNotSupported" => {
            ProviderErrorKind::BadRequest
        }
        "Conflict" | "AnotherOperationInProgress" => ProviderErrorKind::Conflict,
        "TooManyRequests" | "ServerBusy" | "Throttled" => ProviderErrorKind::Throttled,
        _ => return None,
    };
    Some(kind)
}

fn kind_for_status(status: u16) -> ProviderErrorKind {
    match status {
        400 => ProviderErrorKind::BadRequest,
        409 => ProviderErrorKind::Conflict,
        429 => ProviderErrorKind::Throttled,
        _ => ProviderErrorKind::Unknown,
    }
}
