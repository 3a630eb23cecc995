//! EventHubClient trait for mocking
//!
//! This trait abstracts the Azure client so the reconciler can be unit tested
//! against an in-memory implementation.

use crate::error::AzureError;
use crate::models::*;

/// Trait for the Azure operations the network rule controller needs
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait EventHubClientTrait: Send + Sync {
    /// Subscription all calls are scoped to
    fn subscription_id(&self) -> &str;

    /// Check credentials and connectivity
    async fn validate_credentials(&self) -> Result<(), AzureError>;

    /// Get a resource group; `AzureError::NotFound` if it does not exist
    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, AzureError>;

    /// Get an Event Hubs namespace inside a resource group
    async fn get_namespace(&self, resource_group: &str, name: &str) -> Result<EventHubNamespace, AzureError>;

    /// Create or replace the namespace's network rule set
    async fn create_or_update_network_rule_set(&self, request: &NetworkRuleSetRequest) -> Result<NetworkRuleSet, AzureError>;

    /// Remove the namespace's network rule set (reset it to the open default)
    async fn delete_network_rule_set(&self, id: &NetworkRuleSetId) -> Result<(), AzureError>;
}
