//! Azure Resource Manager client
//!
//! Implements the subset of ARM needed to manage Event Hubs namespace network
//! rule sets: resource group and namespace lookups, and rule set writes.

use crate::auth::{ServicePrincipalTokenProvider, TokenProvider};
use crate::common::HttpClient;
use crate::error::AzureError;
use crate::eventhub_trait::EventHubClientTrait;
use crate::models::*;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// API version for Microsoft.Resources (subscriptions, resource groups)
pub const RESOURCES_API_VERSION: &str = "2021-04-01";
/// API version for Microsoft.EventHub
pub const EVENTHUB_API_VERSION: &str = "2021-11-01";

/// Settings needed to build an `AzureClient`
#[derive(Clone)]
pub struct AzureClientConfig {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// e.g. "https://management.azure.com"
    pub management_url: String,
    /// e.g. "https://login.microsoftonline.com"
    pub login_url: String,
    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for AzureClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureClientConfig")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("management_url", &self.management_url)
            .field("login_url", &self.login_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Azure Resource Manager client
#[derive(Debug)]
pub struct AzureClient {
    http: HttpClient,
    subscription_id: String,
}

impl AzureClient {
    /// Create a client authenticating as a service principal
    pub fn new(config: AzureClientConfig) -> Result<Self, AzureError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()?;

        let tokens = Arc::new(ServicePrincipalTokenProvider::new(
            client.clone(),
            config.login_url,
            &config.management_url,
            config.tenant_id,
            config.client_id,
            config.client_secret,
        ));

        Ok(Self {
            http: HttpClient::new(client, config.management_url, tokens),
            subscription_id: config.subscription_id,
        })
    }

    /// Create a client with a custom token source (tests, workload identity)
    pub fn with_token_provider(
        management_url: String,
        subscription_id: String,
        tokens: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> Result<Self, AzureError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http: HttpClient::new(client, management_url, tokens),
            subscription_id,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    fn namespace_path(&self, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.EventHub/namespaces/{}",
            self.subscription_id, resource_group, name
        )
    }
}

#[async_trait::async_trait]
impl EventHubClientTrait for AzureClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn validate_credentials(&self) -> Result<(), AzureError> {
        debug!("Validating Azure credentials for subscription {}", self.subscription_id);
        let path = format!("/subscriptions/{}", self.subscription_id);
        let _: serde_json::Value = self.http.get(&path, RESOURCES_API_VERSION).await?;
        Ok(())
    }

    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, AzureError> {
        let path = format!("/subscriptions/{}/resourcegroups/{}", self.subscription_id, name);
        self.http.get(&path, RESOURCES_API_VERSION).await
    }

    async fn get_namespace(&self, resource_group: &str, name: &str) -> Result<EventHubNamespace, AzureError> {
        let path = self.namespace_path(resource_group, name);
        self.http.get(&path, EVENTHUB_API_VERSION).await
    }

    async fn create_or_update_network_rule_set(&self, request: &NetworkRuleSetRequest) -> Result<NetworkRuleSet, AzureError> {
        let path = request.id.path(&self.subscription_id);
        self.http.put(&path, EVENTHUB_API_VERSION, &request.body()).await
    }

    async fn delete_network_rule_set(&self, id: &NetworkRuleSetId) -> Result<(), AzureError> {
        // The rule set is a singleton child of the namespace; deleting it
        // means restoring the open default.
        let reset = NetworkRuleSetRequest {
            id: id.clone(),
            properties: NetworkRuleSetProperties::open(),
        };
        let _: NetworkRuleSet = self
            .http
            .put(&id.path(&self.subscription_id), EVENTHUB_API_VERSION, &reset.body())
            .await?;
        Ok(())
    }
}
