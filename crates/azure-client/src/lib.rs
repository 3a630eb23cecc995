//! Azure Resource Manager Client
//!
//! A Rust client library for the slice of the Azure Resource Manager API used
//! to manage Event Hubs namespace network rule sets.
//!
//! # Example
//!
//! ```no_run
//! use azure_client::{AzureClient, AzureClientConfig, EventHubClientTrait, NetworkRuleSetId};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AzureClient::new(AzureClientConfig {
//!     subscription_id: "00000000-0000-0000-0000-000000000000".to_string(),
//!     tenant_id: "tenant".to_string(),
//!     client_id: "client".to_string(),
//!     client_secret: "secret".to_string(),
//!     management_url: "https://management.azure.com".to_string(),
//!     login_url: "https://login.microsoftonline.com".to_string(),
//!     timeout: Duration::from_secs(30),
//! })?;
//!
//! let namespace = client.get_namespace("rg-test", "ns-dev-eh").await?;
//! println!("tier: {:?}", namespace.sku.effective_tier());
//!
//! client.delete_network_rule_set(&NetworkRuleSetId::new("rg-test", "ns-dev-eh")).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod common;
pub mod error;
#[path = "trait.rs"]
pub mod eventhub_trait;
pub mod models;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use auth::{ServicePrincipalTokenProvider, StaticToken, TokenProvider};
pub use client::{AzureClient, AzureClientConfig};
pub use common::HttpClient;
pub use error::AzureError;
pub use eventhub_trait::EventHubClientTrait;
pub use models::*;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockAzureClient, MockCall, MockFailure, MockOperation};
