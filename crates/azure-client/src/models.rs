//! Azure Resource Manager models
//!
//! Only the fields the controller reads or writes are modelled; unknown
//! fields in responses are ignored.
//! See: Microsoft.EventHub/namespaces and namespaces/networkRuleSets (2021-11-01)

use serde::{Deserialize, Serialize};

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail inside the ARM error envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Resource group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

/// Resource group properties
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

/// Event Hubs namespace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventHubNamespace {
    pub id: String,
    pub name: String,
    pub location: String,
    pub sku: Sku,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<NamespaceProperties>,
}

/// Event Hubs namespace properties
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Namespace SKU
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    pub name: String,
    #[serde(default)]
    pub tier: Option<SkuTier>,
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl Sku {
    /// Effective tier; ARM sometimes omits `tier` and only reports `name`
    pub fn effective_tier(&self) -> SkuTier {
        match self.tier {
            Some(tier) => tier,
            None => match self.name.as_str() {
                "Basic" => SkuTier::Basic,
                "Standard" => SkuTier::Standard,
                "Premium" => SkuTier::Premium,
                _ => SkuTier::Other,
            },
        }
    }
}

/// Namespace service tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkuTier {
    Basic,
    Standard,
    Premium,
    #[serde(other)]
    Other,
}

impl SkuTier {
    /// Network rule sets are rejected by Azure on Basic namespaces
    pub fn supports_network_rules(self) -> bool {
        !matches!(self, SkuTier::Basic)
    }
}

/// Identity of a namespace's (singleton) network rule set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRuleSetId {
    pub resource_group: String,
    pub namespace: String,
}

impl NetworkRuleSetId {
    /// Create an ID for the rule set of `namespace` in `resource_group`
    pub fn new(resource_group: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            resource_group: resource_group.into(),
            namespace: namespace.into(),
        }
    }

    /// ARM path of the rule set below the subscription
    pub fn path(&self, subscription_id: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.EventHub/namespaces/{}/networkRuleSets/default",
            subscription_id, self.resource_group, self.namespace
        )
    }
}

/// Default action of a network rule set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NetworkDefaultAction {
    Allow,
    Deny,
}

/// Action of an IP rule; Azure only supports "Allow"
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IpRuleAction {
    Allow,
}

/// IP rule as sent to ARM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NwRuleSetIpRule {
    pub ip_mask: String,
    pub action: IpRuleAction,
}

/// Subnet reference inside a virtual network rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubnetRef {
    pub id: String,
}

/// Virtual network rule as sent to ARM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NwRuleSetVirtualNetworkRule {
    pub subnet: SubnetRef,
    pub ignore_missing_vnet_service_endpoint: bool,
}

/// Network rule set properties (request and response)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRuleSetProperties {
    pub default_action: NetworkDefaultAction,
    #[serde(default)]
    pub ip_rules: Vec<NwRuleSetIpRule>,
    #[serde(default)]
    pub virtual_network_rules: Vec<NwRuleSetVirtualNetworkRule>,
}

impl NetworkRuleSetProperties {
    /// The open rule set Azure starts every namespace with
    pub fn open() -> Self {
        Self {
            default_action: NetworkDefaultAction::Allow,
            ip_rules: Vec::new(),
            virtual_network_rules: Vec::new(),
        }
    }
}

/// Create-or-update request for a network rule set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkRuleSetRequest {
    pub id: NetworkRuleSetId,
    pub properties: NetworkRuleSetProperties,
}

impl NetworkRuleSetRequest {
    /// ARM request body (the ID is part of the URL, not the body)
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({ "properties": self.properties })
    }
}

/// Network rule set as returned by ARM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRuleSet {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub properties: NetworkRuleSetProperties,
}

/// OAuth2 token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
