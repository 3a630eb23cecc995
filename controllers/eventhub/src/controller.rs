//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Azure client,
//! the Kubernetes status store and the reconciler together and runs the
//! EventhubNamespaceNetworkRule watcher.

use crate::config::Config;
use crate::error::ControllerError;
use crate::reconciler::{Reconciler, ReconcilerSettings};
use crate::store::{KubeStore, ResourceStore};
use crate::watcher::Watcher;
use azure_client::{AzureClient, AzureClientConfig, EventHubClientTrait};
use crds::EventhubNamespaceNetworkRule;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Main controller for Event Hub network rule management.
#[derive(Debug)]
pub struct Controller {
    network_rule_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing Event Hub Controller");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        // Create Azure client
        let azure_client = AzureClient::new(AzureClientConfig {
            subscription_id: config.subscription_id.clone(),
            tenant_id: config.tenant_id.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            management_url: config.management_url.clone(),
            login_url: config.login_url.clone(),
            timeout: config.provider_timeout,
        })?;

        // Validate credentials and connectivity before proceeding
        info!("Validating Azure credentials and connectivity...");
        azure_client.validate_credentials().await.map_err(|e| {
            error!("Failed to validate Azure credentials: {}", e);
            error!("Please ensure:");
            error!("  1. AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET are correct");
            error!("  2. The service principal has access to subscription {}", config.subscription_id);
            error!("  3. Azure Resource Manager is reachable at {}", config.management_url);
            ControllerError::Azure(e)
        })?;
        info!("Azure credentials validated for subscription {}", config.subscription_id);

        let api: Api<EventhubNamespaceNetworkRule> = match config.watch_namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };

        let client: Arc<dyn EventHubClientTrait> = Arc::new(azure_client);
        let store: Arc<dyn ResourceStore> = Arc::new(KubeStore::new(kube_client));
        let reconciler = Arc::new(Reconciler::new(client, store, ReconcilerSettings::from_config(&config)));

        let watcher = Watcher::new(reconciler, api, config.concurrency);
        let network_rule_watcher = tokio::spawn(async move { watcher.watch_network_rules().await });

        Ok(Self { network_rule_watcher })
    }

    /// Runs the controller until the watcher exits.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Event Hub Controller running");

        self.network_rule_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("EventhubNamespaceNetworkRule watcher panicked: {}", e)))??;

        info!("Event Hub Controller stopped");
        Ok(())
    }
}
