//! Mock Azure client for unit testing
//!
//! Stores resource groups, namespaces and rule sets in memory and answers the
//! way ARM does: `ResourceGroupNotFound` before `ParentResourceNotFound`, and
//! `BadRequest` for rule sets on Basic tier namespaces. Deleting a rule set
//! resets it to the open default, as `AzureClient` does. Every call is
//! recorded, and failures or latency can be injected per operation.

use crate::error::AzureError;
use crate::eventhub_trait::EventHubClientTrait;
use crate::models::*;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Operations of `EventHubClientTrait` that can be targeted by injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    GetResourceGroup,
    GetNamespace,
    CreateOrUpdateRuleSet,
    DeleteRuleSet,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    GetResourceGroup(String),
    GetNamespace { resource_group: String, name: String },
    CreateOrUpdateRuleSet(NetworkRuleSetRequest),
    DeleteRuleSet(NetworkRuleSetId),
}

impl MockCall {
    fn operation(&self) -> MockOperation {
        match self {
            MockCall::GetResourceGroup(_) => MockOperation::GetResourceGroup,
            MockCall::GetNamespace { .. } => MockOperation::GetNamespace,
            MockCall::CreateOrUpdateRuleSet(_) => MockOperation::CreateOrUpdateRuleSet,
            MockCall::DeleteRuleSet(_) => MockOperation::DeleteRuleSet,
        }
    }
}

/// Failure to return from the next call of an operation
#[derive(Debug, Clone)]
pub struct MockFailure {
    status: u16,
    code: Option<String>,
    message: String,
    retry_after: Option<Duration>,
}

impl MockFailure {
    /// ARM error with the given status and code
    pub fn api(status: u16, code: &str) -> Self {
        Self {
            status,
            code: Some(code.to_string()),
            message: format!("injected {} failure", code),
            retry_after: None,
        }
    }

    /// ARM error without an error code
    pub fn status_only(status: u16) -> Self {
        Self {
            status,
            code: None,
            message: format!("injected HTTP {} failure", status),
            retry_after: None,
        }
    }

    /// Attach a `Retry-After` delay
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    fn into_error(self) -> AzureError {
        if self.status == 404 {
            return AzureError::NotFound {
                code: self.code.unwrap_or_else(|| "NotFound".to_string()),
                message: self.message,
            };
        }
        AzureError::Api {
            status: self.status,
            code: self.code,
            message: self.message,
            retry_after: self.retry_after,
        }
    }
}

/// Mock Azure client for testing
#[derive(Debug, Clone)]
pub struct MockAzureClient {
    subscription_id: String,
    resource_groups: Arc<Mutex<HashMap<String, ResourceGroup>>>,
    namespaces: Arc<Mutex<HashMap<(String, String), EventHubNamespace>>>,
    rule_sets: Arc<Mutex<HashMap<NetworkRuleSetId, NetworkRuleSet>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    failures: Arc<Mutex<HashMap<MockOperation, VecDeque<MockFailure>>>>,
    latency: Arc<Mutex<HashMap<MockOperation, Duration>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockAzureClient {
    /// Create an empty mock for a subscription
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_groups: Arc::new(Mutex::new(HashMap::new())),
            namespaces: Arc::new(Mutex::new(HashMap::new())),
            rule_sets: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            latency: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a resource group (for test setup)
    pub fn add_resource_group(&self, name: &str) {
        let rg = ResourceGroup {
            id: format!("/subscriptions/{}/resourceGroups/{}", self.subscription_id, name),
            name: name.to_string(),
            location: "westus".to_string(),
            properties: Some(ResourceGroupProperties {
                provisioning_state: Some("Succeeded".to_string()),
            }),
        };
        lock(&self.resource_groups).insert(name.to_string(), rg);
    }

    /// Add a namespace with the given tier (for test setup)
    pub fn add_namespace(&self, resource_group: &str, name: &str, tier: SkuTier) {
        let tier_name = match tier {
            SkuTier::Basic => "Basic",
            SkuTier::Standard => "Standard",
            SkuTier::Premium => "Premium",
            SkuTier::Other => "Other",
        };
        let ns = EventHubNamespace {
            id: format!(
                "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.EventHub/namespaces/{}",
                self.subscription_id, resource_group, name
            ),
            name: name.to_string(),
            location: "westus".to_string(),
            sku: Sku {
                name: tier_name.to_string(),
                tier: Some(tier),
                capacity: Some(1),
            },
            properties: Some(NamespaceProperties {
                provisioning_state: Some("Succeeded".to_string()),
                status: Some("Active".to_string()),
            }),
        };
        lock(&self.namespaces).insert((resource_group.to_string(), name.to_string()), ns);
    }

    /// Remove a namespace (and with it its rule set)
    pub fn remove_namespace(&self, resource_group: &str, name: &str) {
        lock(&self.namespaces).remove(&(resource_group.to_string(), name.to_string()));
        lock(&self.rule_sets).remove(&NetworkRuleSetId::new(resource_group, name));
    }

    /// Fail the next call of `operation` with `failure`; queued failures are used in order
    pub fn fail_next(&self, operation: MockOperation, failure: MockFailure) {
        lock(&self.failures).entry(operation).or_default().push_back(failure);
    }

    /// Delay every call of `operation` by `delay`
    pub fn set_latency(&self, operation: MockOperation, delay: Duration) {
        lock(&self.latency).insert(operation, delay);
    }

    /// Current rule set of a namespace, if one was written
    pub fn rule_set(&self, id: &NetworkRuleSetId) -> Option<NetworkRuleSet> {
        lock(&self.rule_sets).get(id).cloned()
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Number of recorded calls of `operation`
    pub fn call_count(&self, operation: MockOperation) -> usize {
        lock(&self.calls).iter().filter(|c| c.operation() == operation).count()
    }

    async fn record(&self, call: MockCall) -> Result<(), AzureError> {
        let operation = call.operation();
        lock(&self.calls).push(call);

        let delay = lock(&self.latency).get(&operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = lock(&self.failures).get_mut(&operation).and_then(VecDeque::pop_front);
        match failure {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    fn lookup_namespace(&self, resource_group: &str, name: &str) -> Result<EventHubNamespace, AzureError> {
        if !lock(&self.resource_groups).contains_key(resource_group) {
            return Err(AzureError::NotFound {
                code: "ResourceGroupNotFound".to_string(),
                message: format!("Resource group '{}' could not be found.", resource_group),
            });
        }
        lock(&self.namespaces)
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| AzureError::NotFound {
                code: "ParentResourceNotFound".to_string(),
                message: format!(
                    "Can not perform requested operation on nested resource. Parent resource '{}' not found.",
                    name
                ),
            })
    }

    /// PUT of the singleton rule set, with ARM's parent and tier checks
    fn put_rule_set(&self, id: &NetworkRuleSetId, properties: NetworkRuleSetProperties) -> Result<NetworkRuleSet, AzureError> {
        let namespace = self.lookup_namespace(&id.resource_group, &id.namespace)?;

        if !namespace.sku.effective_tier().supports_network_rules() {
            return Err(AzureError::Api {
                status: 400,
                code: Some("BadRequest".to_string()),
                message: "Network rule sets are not supported for namespaces in the Basic tier.".to_string(),
                retry_after: None,
            });
        }

        let rule_set = NetworkRuleSet {
            id: id.path(&self.subscription_id),
            name: "default".to_string(),
            properties,
        };
        lock(&self.rule_sets).insert(id.clone(), rule_set.clone());
        Ok(rule_set)
    }
}

#[async_trait::async_trait]
impl EventHubClientTrait for MockAzureClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn validate_credentials(&self) -> Result<(), AzureError> {
        Ok(())
    }

    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, AzureError> {
        self.record(MockCall::GetResourceGroup(name.to_string())).await?;
        lock(&self.resource_groups)
            .get(name)
            .cloned()
            .ok_or_else(|| AzureError::NotFound {
                code: "ResourceGroupNotFound".to_string(),
                message: format!("Resource group '{}' could not be found.", name),
            })
    }

    async fn get_namespace(&self, resource_group: &str, name: &str) -> Result<EventHubNamespace, AzureError> {
        self.record(MockCall::GetNamespace {
            resource_group: resource_group.to_string(),
            name: name.to_string(),
        })
        .await?;
        self.lookup_namespace(resource_group, name).map_err(|e| match e {
            // A direct GET of a missing namespace reports ResourceNotFound
            AzureError::NotFound { code, message } if code == "ParentResourceNotFound" => AzureError::NotFound {
                code: "ResourceNotFound".to_string(),
                message,
            },
            other => other,
        })
    }

    async fn create_or_update_network_rule_set(&self, request: &NetworkRuleSetRequest) -> Result<NetworkRuleSet, AzureError> {
        self.record(MockCall::CreateOrUpdateRuleSet(request.clone())).await?;
        self.put_rule_set(&request.id, request.properties.clone())
    }

    async fn delete_network_rule_set(&self, id: &NetworkRuleSetId) -> Result<(), AzureError> {
        self.record(MockCall::DeleteRuleSet(id.clone())).await?;
        self.put_rule_set(id, NetworkRuleSetProperties::open())?;
        Ok(())
    }
}
