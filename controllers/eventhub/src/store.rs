//! Persistence of reconcile results on the watched object.
//!
//! The reconciler only ever writes two things back to Kubernetes: the status
//! subresource and the finalizer list. `ResourceStore` abstracts both so the
//! reconciler can run against an in-memory store in tests.

use crate::error::ControllerError;
use crds::{EventhubNamespaceNetworkRule, EventhubNamespaceNetworkRuleStatus};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use tracing::debug;

/// Sink for status and finalizer writes
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// Overwrite the status of `rule`
    async fn patch_status(
        &self,
        rule: &EventhubNamespaceNetworkRule,
        status: &EventhubNamespaceNetworkRuleStatus,
    ) -> Result<(), ControllerError>;

    /// Replace the finalizer list of `rule`
    async fn set_finalizers(
        &self,
        rule: &EventhubNamespaceNetworkRule,
        finalizers: Vec<String>,
    ) -> Result<(), ControllerError>;
}

/// `ResourceStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    /// Create a store using `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api_for(&self, rule: &EventhubNamespaceNetworkRule) -> Result<Api<EventhubNamespaceNetworkRule>, ControllerError> {
        let namespace = rule.namespace().ok_or_else(|| {
            ControllerError::InvalidObject(format!("{} has no namespace", rule.name_any()))
        })?;
        Ok(Api::namespaced(self.client.clone(), &namespace))
    }
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    async fn patch_status(
        &self,
        rule: &EventhubNamespaceNetworkRule,
        status: &EventhubNamespaceNetworkRuleStatus,
    ) -> Result<(), ControllerError> {
        let api = self.api_for(rule)?;
        let patch = serde_json::json!({ "status": status });
        api.patch_status(&rule.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn set_finalizers(
        &self,
        rule: &EventhubNamespaceNetworkRule,
        finalizers: Vec<String>,
    ) -> Result<(), ControllerError> {
        let api = self.api_for(rule)?;
        let name = rule.name_any();
        let patch = serde_json::json!({ "metadata": { "finalizers": finalizers } });
        match api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch)).await {
            Ok(_) => Ok(()),
            // Removing the last finalizer can race with the object disappearing
            Err(kube::Error::Api(e)) if e.code == 404 && !finalizers.iter().any(|f| f == crds::NETWORK_RULE_FINALIZER) => {
                debug!("{} already removed from the API server", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
