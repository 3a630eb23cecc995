//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use std::time::Duration;

const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";
const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";

/// Runtime configuration of the Event Hub Controller
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub management_url: String,
    pub login_url: String,
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Upper bound on a single provider call
    pub provider_timeout: Duration,
    /// Maximum number of rules reconciled at the same time
    pub concurrency: u16,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Unclassified failures tolerated before a rule is marked Failed
    pub unknown_max_attempts: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("management_url", &self.management_url)
            .field("login_url", &self.login_url)
            .field("watch_namespace", &self.watch_namespace)
            .field("provider_timeout", &self.provider_timeout)
            .field("concurrency", &self.concurrency)
            .field("backoff_base", &self.backoff_base)
            .field("backoff_max", &self.backoff_max)
            .field("unknown_max_attempts", &self.unknown_max_attempts)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ControllerError::InvalidConfig(format!("{} environment variable is required", key)))
        };

        let backoff_base = Duration::from_secs(parse_or(&lookup, "BACKOFF_BASE_SECS", 5)?);
        let backoff_max = Duration::from_secs(parse_or(&lookup, "BACKOFF_MAX_SECS", 300)?);
        if backoff_max < backoff_base {
            return Err(ControllerError::InvalidConfig(
                "BACKOFF_MAX_SECS must not be smaller than BACKOFF_BASE_SECS".to_string(),
            ));
        }

        let concurrency: u16 = parse_or(&lookup, "RECONCILE_CONCURRENCY", 3)?;
        if concurrency == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            subscription_id: required("AZURE_SUBSCRIPTION_ID")?,
            tenant_id: required("AZURE_TENANT_ID")?,
            client_id: required("AZURE_CLIENT_ID")?,
            client_secret: required("AZURE_CLIENT_SECRET")?,
            management_url: lookup("AZURE_MANAGEMENT_URL").unwrap_or_else(|| DEFAULT_MANAGEMENT_URL.to_string()),
            login_url: lookup("AZURE_LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|v| !v.is_empty()),
            provider_timeout: Duration::from_secs(parse_or(&lookup, "PROVIDER_TIMEOUT_SECS", 30)?),
            concurrency,
            backoff_base,
            backoff_max,
            unknown_max_attempts: parse_or(&lookup, "UNKNOWN_MAX_ATTEMPTS", 5)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            ControllerError::InvalidConfig(format!("{} has invalid value '{}'", key, raw))
        }),
    }
}
