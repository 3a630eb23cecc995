//! EventhubNamespaceNetworkRule Custom Resource Definition
//!
//! Declares the network rule set (default action, IP rules and virtual
//! network rules) of an Azure Event Hubs namespace.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::references::ParentRef;

/// Finalizer placed on every network rule before anything is created in Azure
pub const NETWORK_RULE_FINALIZER: &str = "azure.microsoft.com/finalizer";

/// EventhubNamespaceNetworkRuleSpec defines the desired network rule set of a namespace
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "azure.microsoft.com",
    version = "v1alpha1",
    kind = "EventhubNamespaceNetworkRule",
    namespaced,
    status = "EventhubNamespaceNetworkRuleStatus",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Error","type":"string","jsonPath":".status.lastErrorKind"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EventhubNamespaceNetworkRuleSpec {
    /// Name of the Event Hubs namespace the rules apply to
    pub namespace: String,

    /// Resource group containing the namespace
    pub resource_group: String,

    /// Action applied when no rule matches
    #[serde(default)]
    pub default_action: DefaultAction,

    /// Virtual network (subnet) rules, in precedence order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_network_rules: Option<Vec<VirtualNetworkRule>>,

    /// IP rules, in precedence order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_rules: Option<Vec<IpRule>>,
}

impl EventhubNamespaceNetworkRuleSpec {
    /// Reference to the resource group this rule depends on
    pub fn resource_group_ref(&self) -> ParentRef {
        ParentRef::resource_group(self.resource_group.clone())
    }

    /// Reference to the namespace this rule depends on, scoped to its resource group
    pub fn namespace_ref(&self) -> ParentRef {
        ParentRef::namespace(self.namespace.clone(), self.resource_group.clone())
    }
}

/// Default action of a network rule set
///
/// Serializes as Azure expects ("Allow", "Deny") and also accepts the
/// lowercase spelling used in older manifests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum DefaultAction {
    #[default]
    #[serde(alias = "allow")]
    Allow,
    #[serde(alias = "deny")]
    Deny,
}

/// A single IP rule
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IpRule {
    /// IP address or CIDR mask, e.g. "1.1.1.1" or "10.0.0.0/24"
    pub ip_mask: String,
}

/// A single virtual network rule
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkRule {
    /// Fully qualified subnet resource ID
    #[serde(rename = "subnetID", alias = "subnetId")]
    pub subnet_id: String,

    /// Create the rule even if the subnet lacks the Microsoft.EventHub service endpoint
    #[serde(default)]
    pub ignore_missing_service_endpoint: bool,
}

/// Lifecycle state of a network rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum RuleState {
    #[default]
    Pending,
    Ready,
    Failed,
    Deleting,
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleState::Pending => "Pending",
            RuleState::Ready => "Ready",
            RuleState::Failed => "Failed",
            RuleState::Deleting => "Deleting",
        };
        f.write_str(s)
    }
}

/// Closed set of provider failure kinds recorded in status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum ProviderErrorKind {
    ResourceGroupNotFound,
    ParentNotFound,
    BadRequest,
    Conflict,
    Throttled,
    Unknown,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderErrorKind::ResourceGroupNotFound => "ResourceGroupNotFound",
            ProviderErrorKind::ParentNotFound => "ParentNotFound",
            ProviderErrorKind::BadRequest => "BadRequest",
            ProviderErrorKind::Conflict => "Conflict",
            ProviderErrorKind::Throttled => "Throttled",
            ProviderErrorKind::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// User-facing error category derived from a `ProviderErrorKind`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorCategory {
    /// Resource group does not exist (yet)
    DependencyMissingResourceGroup,
    /// Namespace does not exist (yet)
    DependencyMissingNamespace,
    /// Request can never succeed without a spec change
    RequestInvalid,
    /// Throttling or conflicting operation, will be retried
    ProviderTransient,
    /// Unrecognized failure, retried up to a cap
    ProviderUnclassified,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::DependencyMissingResourceGroup => "DependencyMissing(ResourceGroup)",
            ErrorCategory::DependencyMissingNamespace => "DependencyMissing(Namespace)",
            ErrorCategory::RequestInvalid => "RequestInvalid",
            ErrorCategory::ProviderTransient => "ProviderTransient",
            ErrorCategory::ProviderUnclassified => "ProviderUnclassified",
        };
        f.write_str(s)
    }
}

/// EventhubNamespaceNetworkRuleStatus defines the observed state of a network rule
///
/// `ready == true` always comes with `last_error_kind == None`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventhubNamespaceNetworkRuleStatus {
    /// Current lifecycle state
    pub state: RuleState,

    /// Whether the rule set is applied in Azure
    pub ready: bool,

    /// Generation of the spec this status was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Kind of the last provider error
    #[serde(default)]
    pub last_error_kind: Option<ProviderErrorKind>,

    /// Category of the last provider error
    #[serde(default)]
    pub error_category: Option<ErrorCategory>,

    /// Human readable message for the current state
    #[serde(default)]
    pub message: Option<String>,

    /// Seconds until the controller retries, if a retry is scheduled
    #[serde(default)]
    pub requeue_after_seconds: Option<u64>,

    /// Consecutive retryable failures for the observed generation
    #[serde(default)]
    pub attempts: u32,

    /// Earliest time of the next attempt; passes triggered before it are no-ops
    #[serde(default)]
    pub next_retry_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl EventhubNamespaceNetworkRule {
    /// Whether the finalizer marker is present
    pub fn has_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|x| x == NETWORK_RULE_FINALIZER))
    }

    /// Whether Kubernetes has marked this object for deletion
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_accepts_lowercase_default_action() {
        let spec: EventhubNamespaceNetworkRuleSpec = serde_json::from_value(serde_json::json!({
            "namespace": "ns-dev-eh",
            "resourceGroup": "rg-test",
            "defaultAction": "deny",
            "ipRules": [{"ipMask": "1.1.1.1"}],
            "virtualNetworkRules": [{
                "subnetID": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v/subnets/a",
                "ignoreMissingServiceEndpoint": true
            }]
        }))
        .unwrap();

        assert_eq!(spec.default_action, DefaultAction::Deny);
        assert_eq!(spec.ip_rules.as_ref().unwrap()[0].ip_mask, "1.1.1.1");
        assert!(spec.virtual_network_rules.as_ref().unwrap()[0].ignore_missing_service_endpoint);
    }

    #[test]
    fn test_spec_defaults() {
        let spec: EventhubNamespaceNetworkRuleSpec = serde_json::from_value(serde_json::json!({
            "namespace": "ns",
            "resourceGroup": "rg"
        }))
        .unwrap();

        assert_eq!(spec.default_action, DefaultAction::Allow);
        assert!(spec.ip_rules.is_none());
        assert!(spec.virtual_network_rules.is_none());
        assert_eq!(spec.namespace_ref().scope.as_deref(), Some("rg"));
    }

    #[test]
    fn test_status_serializes_pascal_case_kinds() {
        let status = EventhubNamespaceNetworkRuleStatus {
            state: RuleState::Failed,
            last_error_kind: Some(ProviderErrorKind::BadRequest),
            error_category: Some(ErrorCategory::RequestInvalid),
            ..Default::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "Failed");
        assert_eq!(json["lastErrorKind"], "BadRequest");
        assert_eq!(json["errorCategory"], "RequestInvalid");
        assert_eq!(json["ready"], false);
    }

    #[test]
    fn test_finalizer_detection() {
        let mut rule = EventhubNamespaceNetworkRule::new(
            "ehns-netrule",
            EventhubNamespaceNetworkRuleSpec {
                namespace: "ns".to_string(),
                resource_group: "rg".to_string(),
                default_action: DefaultAction::Allow,
                virtual_network_rules: None,
                ip_rules: None,
            },
        );
        assert!(!rule.has_finalizer());
        rule.metadata.finalizers = Some(vec![NETWORK_RULE_FINALIZER.to_string()]);
        assert!(rule.has_finalizer());
        assert!(!rule.is_being_deleted());
    }
}
