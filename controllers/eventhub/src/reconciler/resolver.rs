//! Parent dependency resolution.
//!
//! A network rule set can only be written once its resource group and its
//! namespace exist. Lookups are read-only and run in a fixed order: the
//! resource group first, then the namespace inside it. When the resource
//! group is missing the namespace is not looked up at all, so a missing
//! resource group is never reported as a missing namespace.
//!
//! Only "does not exist" answers become `Resolution` variants. Any other
//! lookup failure (throttling, timeouts, transport errors) is returned as the
//! provider error so the classifier sees it.

use super::with_timeout;
use azure_client::{AzureError, EventHubClientTrait, EventHubNamespace};
use crds::{EventhubNamespaceNetworkRuleSpec, ParentRef};
use std::time::Duration;
use tracing::debug;

/// Outcome of resolving a rule's parents
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Both parents exist; carries the namespace (and with it its tier)
    Satisfied(EventHubNamespace),
    /// The resource group does not exist
    MissingResourceGroup(ParentRef),
    /// The resource group exists but the namespace does not
    MissingParentNamespace(ParentRef),
}

/// Resolve the resource group and namespace a spec refers to
pub async fn resolve(
    client: &dyn EventHubClientTrait,
    spec: &EventhubNamespaceNetworkRuleSpec,
    timeout: Duration,
) -> Result<Resolution, AzureError> {
    let rg_ref = spec.resource_group_ref();
    match with_timeout(timeout, client.get_resource_group(&rg_ref.name)).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            debug!("{} not found: {}", rg_ref, e);
            return Ok(Resolution::MissingResourceGroup(rg_ref));
        }
        Err(e) => return Err(e),
    }

    let ns_ref = spec.namespace_ref();
    match with_timeout(timeout, client.get_namespace(&spec.resource_group, &ns_ref.name)).await {
        Ok(namespace) => Ok(Resolution::Satisfied(namespace)),
        // The resource group can disappear between the two lookups
        Err(e) if e.code() == Some("ResourceGroupNotFound") => Ok(Resolution::MissingResourceGroup(rg_ref)),
        Err(e) if e.is_not_found() => {
            debug!("{} not found: {}", ns_ref, e);
            Ok(Resolution::MissingParentNamespace(ns_ref))
        }
        Err(e) => Err(e),
    }
}
