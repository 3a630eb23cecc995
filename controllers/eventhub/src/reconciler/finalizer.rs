//! Finalizer handling for network rules.
//!
//! The marker is added before the first write to Azure and removed only after
//! the rule set is confirmed gone, so a rule deleted while the controller is
//! down is still cleaned up when it comes back.

use super::with_timeout;
use crate::error::ControllerError;
use crate::store::ResourceStore;
use azure_client::{AzureError, EventHubClientTrait, NetworkRuleSetId};
use crds::{EventhubNamespaceNetworkRule, NETWORK_RULE_FINALIZER};
use std::time::Duration;
use tracing::debug;

/// Result of a successful external delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The rule set was reset by this call
    Deleted,
    /// The rule set, its namespace or its resource group no longer exists
    AlreadyAbsent,
}

/// Add the marker to `rule` if it is not there yet
pub async fn ensure_marker(
    store: &dyn ResourceStore,
    rule: &EventhubNamespaceNetworkRule,
) -> Result<(), ControllerError> {
    if rule.has_finalizer() {
        return Ok(());
    }
    let mut finalizers = rule.metadata.finalizers.clone().unwrap_or_default();
    finalizers.push(NETWORK_RULE_FINALIZER.to_string());
    debug!("Adding finalizer {}", NETWORK_RULE_FINALIZER);
    store.set_finalizers(rule, finalizers).await
}

/// Remove the marker from `rule`, keeping finalizers owned by others
pub async fn release(
    store: &dyn ResourceStore,
    rule: &EventhubNamespaceNetworkRule,
) -> Result<(), ControllerError> {
    let finalizers: Vec<String> = rule
        .metadata
        .finalizers
        .iter()
        .flatten()
        .filter(|f| f.as_str() != NETWORK_RULE_FINALIZER)
        .cloned()
        .collect();
    store.set_finalizers(rule, finalizers).await
}

/// Delete the external rule set. A missing namespace or resource group, or a
/// namespace whose tier cannot hold a rule set, counts as already absent.
pub async fn ensure_deleted(
    client: &dyn EventHubClientTrait,
    id: &NetworkRuleSetId,
    timeout: Duration,
) -> Result<DeleteOutcome, AzureError> {
    match with_timeout(timeout, client.get_namespace(&id.resource_group, &id.namespace)).await {
        Ok(namespace) if !namespace.sku.effective_tier().supports_network_rules() => {
            debug!(
                "Namespace {}/{} is {:?} tier and holds no rule set",
                id.resource_group,
                id.namespace,
                namespace.sku.effective_tier()
            );
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            debug!("Namespace {}/{} already absent: {}", id.resource_group, id.namespace, e);
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        Err(e) => return Err(e),
    }

    match with_timeout(timeout, client.delete_network_rule_set(id)).await {
        Ok(()) => Ok(DeleteOutcome::Deleted),
        Err(e) if e.is_not_found() => {
            debug!("Rule set of {}/{} already absent: {}", id.resource_group, id.namespace, e);
            Ok(DeleteOutcome::AlreadyAbsent)
        }
        Err(e) => Err(e),
    }
}
