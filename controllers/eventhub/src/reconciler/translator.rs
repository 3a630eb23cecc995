//! Desired spec to ARM request translation.
//!
//! Pure and deterministic: rule order is preserved and the same spec always
//! serializes to the same request bytes.

use azure_client::{
    IpRuleAction, NetworkDefaultAction, NetworkRuleSetId, NetworkRuleSetProperties,
    NetworkRuleSetRequest, NwRuleSetIpRule, NwRuleSetVirtualNetworkRule, SubnetRef,
};
use crds::{DefaultAction, EventhubNamespaceNetworkRuleSpec};

/// Build the create-or-update request for the namespace's rule set
pub fn translate(spec: &EventhubNamespaceNetworkRuleSpec) -> NetworkRuleSetRequest {
    let default_action = match spec.default_action {
        DefaultAction::Allow => NetworkDefaultAction::Allow,
        DefaultAction::Deny => NetworkDefaultAction::Deny,
    };

    let ip_rules = spec
        .ip_rules
        .iter()
        .flatten()
        .map(|rule| NwRuleSetIpRule {
            ip_mask: rule.ip_mask.clone(),
            action: IpRuleAction::Allow,
        })
        .collect();

    let virtual_network_rules = spec
        .virtual_network_rules
        .iter()
        .flatten()
        .map(|rule| NwRuleSetVirtualNetworkRule {
            subnet: SubnetRef { id: rule.subnet_id.clone() },
            ignore_missing_vnet_service_endpoint: rule.ignore_missing_service_endpoint,
        })
        .collect();

    NetworkRuleSetRequest {
        id: NetworkRuleSetId::new(spec.resource_group.clone(), spec.namespace.clone()),
        properties: NetworkRuleSetProperties {
            default_action,
            ip_rules,
            virtual_network_rules,
        },
    }
}
