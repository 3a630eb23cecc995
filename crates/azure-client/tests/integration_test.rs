//! Integration tests for the Azure client
//!
//! Runs `AzureClient` against a local wiremock server standing in for ARM.

use azure_client::{
    AzureClient, AzureError, EventHubClientTrait, IpRuleAction, NetworkDefaultAction, NetworkRuleSetId,
    NetworkRuleSetProperties, NetworkRuleSetRequest, NwRuleSetIpRule, ServicePrincipalTokenProvider, SkuTier,
    StaticToken, TokenProvider,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUB: &str = "sub-1";
const RULE_SET_PATH: &str =
    "/subscriptions/sub-1/resourceGroups/rg-test/providers/Microsoft.EventHub/namespaces/ns-dev-eh/networkRuleSets/default";

fn client(server: &MockServer) -> AzureClient {
    AzureClient::with_token_provider(
        server.uri(),
        SUB.to_string(),
        Arc::new(StaticToken("test-token".to_string())),
        Duration::from_secs(5),
    )
    .expect("client should build")
}

#[tokio::test]
async fn test_get_namespace_sends_bearer_and_api_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/resourceGroups/rg-test/providers/Microsoft.EventHub/namespaces/ns-dev-eh"))
        .and(query_param("api-version", "2021-11-01"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "/subscriptions/sub-1/resourceGroups/rg-test/providers/Microsoft.EventHub/namespaces/ns-dev-eh",
            "name": "ns-dev-eh",
            "location": "westus",
            "sku": {"name": "Standard", "tier": "Standard", "capacity": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ns = client(&server).get_namespace("rg-test", "ns-dev-eh").await.unwrap();
    assert_eq!(ns.name, "ns-dev-eh");
    assert_eq!(ns.sku.effective_tier(), SkuTier::Standard);
}

#[tokio::test]
async fn test_missing_resource_group_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/resourcegroups/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "ResourceGroupNotFound", "message": "Resource group 'gone' could not be found."}
        })))
        .mount(&server)
        .await;

    let err = client(&server).get_resource_group("gone").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code(), Some("ResourceGroupNotFound"));
}

#[tokio::test]
async fn test_create_or_update_puts_properties() {
    let server = MockServer::start().await;
    let properties = NetworkRuleSetProperties {
        default_action: NetworkDefaultAction::Deny,
        ip_rules: vec![NwRuleSetIpRule {
            ip_mask: "1.1.1.1".to_string(),
            action: IpRuleAction::Allow,
        }],
        virtual_network_rules: Vec::new(),
    };
    Mock::given(method("PUT"))
        .and(path(RULE_SET_PATH))
        .and(query_param("api-version", "2021-11-01"))
        .and(body_json(json!({
            "properties": {
                "defaultAction": "Deny",
                "ipRules": [{"ipMask": "1.1.1.1", "action": "Allow"}],
                "virtualNetworkRules": []
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": RULE_SET_PATH,
            "name": "default",
            "properties": {
                "defaultAction": "Deny",
                "ipRules": [{"ipMask": "1.1.1.1", "action": "Allow"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = NetworkRuleSetRequest {
        id: NetworkRuleSetId::new("rg-test", "ns-dev-eh"),
        properties: properties.clone(),
    };
    let rule_set = client(&server).create_or_update_network_rule_set(&request).await.unwrap();
    assert_eq!(rule_set.properties, properties);
}

#[tokio::test]
async fn test_basic_tier_rejection_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(RULE_SET_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "BadRequest", "message": "Not supported on Basic tier."}
        })))
        .mount(&server)
        .await;

    let request = NetworkRuleSetRequest {
        id: NetworkRuleSetId::new("rg-test", "ns-dev-eh"),
        properties: NetworkRuleSetProperties::open(),
    };
    let err = client(&server).create_or_update_network_rule_set(&request).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.code(), Some("BadRequest"));
}

#[tokio::test]
async fn test_throttling_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/resourcegroups/rg-test"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "17")
                .set_body_json(json!({"error": {"code": "TooManyRequests", "message": "slow down"}})),
        )
        .mount(&server)
        .await;

    let err = client(&server).get_resource_group("rg-test").await.unwrap_err();
    assert!(matches!(err, AzureError::Api { status: 429, .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(17)));
}

#[tokio::test]
async fn test_delete_resets_rule_set_to_open() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(RULE_SET_PATH))
        .and(body_json(json!({
            "properties": {"defaultAction": "Allow", "ipRules": [], "virtualNetworkRules": []}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"defaultAction": "Allow"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .delete_network_rule_set(&NetworkRuleSetId::new("rg-test", "ns-dev-eh"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_validate_credentials_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let err = client(&server).validate_credentials().await.unwrap_err();
    assert!(matches!(err, AzureError::Authentication(_)));
}

#[tokio::test]
async fn test_client_timeout_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/resourcegroups/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = AzureClient::with_token_provider(
        server.uri(),
        SUB.to_string(),
        Arc::new(StaticToken("t".to_string())),
        Duration::from_millis(100),
    )
    .unwrap();
    let err = client.get_resource_group("slow").await.unwrap_err();
    assert!(matches!(err, AzureError::Http(ref e) if e.is_timeout()));
}

#[tokio::test]
async fn test_token_scope_matches_management_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("scope=https%3A%2F%2Fmanagement.usgovcloudapi.net%2F.default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "gov-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = ServicePrincipalTokenProvider::new(
        reqwest::Client::new(),
        server.uri(),
        "https://management.usgovcloudapi.net/",
        "tenant-1".to_string(),
        "client-1".to_string(),
        "secret".to_string(),
    );
    assert_eq!(tokens.token().await.unwrap(), "gov-token");
    // Served from cache
    assert_eq!(tokens.token().await.unwrap(), "gov-token");
}
