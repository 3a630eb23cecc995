//! Kubernetes resource watcher.
//!
//! Watches EventhubNamespaceNetworkRule objects and drives the reconciler
//! through `kube_runtime::Controller`, which reconnects on watch failures and
//! never runs two passes for the same object at once.

use crate::error::ControllerError;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crds::EventhubNamespaceNetworkRule;
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Map a pass outcome to the controller's requeue action
pub fn action_for(outcome: &ReconcileOutcome) -> Action {
    match outcome.requeue_after {
        Some(after) => Action::requeue(after),
        None => Action::await_change(),
    }
}

/// Watches EventhubNamespaceNetworkRule resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    api: Api<EventhubNamespaceNetworkRule>,
    concurrency: u16,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, api: Api<EventhubNamespaceNetworkRule>, concurrency: u16) -> Self {
        Self { reconciler, api, concurrency }
    }

    /// Watches network rules until the watch stream ends.
    pub async fn watch_network_rules(&self) -> Result<(), ControllerError> {
        info!("Starting EventhubNamespaceNetworkRule watcher");

        // Failures here are Kubernetes write failures; provider failures are
        // already turned into an outcome by the reconciler
        let error_policy = |rule: Arc<EventhubNamespaceNetworkRule>, error: &ControllerError, ctx: Arc<Reconciler>| {
            let retry = ctx.settings().backoff.delay(0);
            error!("Reconciliation error for EventhubNamespaceNetworkRule {}: {}, retrying in {:?}", rule.name_any(), error, retry);
            Action::requeue(retry)
        };

        let reconcile = |rule: Arc<EventhubNamespaceNetworkRule>, ctx: Arc<Reconciler>| async move {
            debug!("Reconciling EventhubNamespaceNetworkRule {}", rule.name_any());
            let outcome = ctx.reconcile(&rule).await?;
            debug!("EventhubNamespaceNetworkRule {} -> {:?}", rule.name_any(), outcome);
            Ok::<Action, ControllerError>(action_for(&outcome))
        };

        // Short debounce: status writes of one pass arrive as a burst of events
        let controller_config = ControllerConfig::default()
            .debounce(Duration::from_millis(500))
            .concurrency(self.concurrency);

        Controller::new(self.api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled {}", obj.name),
                    Err(e) => error!("Controller error for EventhubNamespaceNetworkRule: {}", e),
                }
            })
            .await;

        info!("EventhubNamespaceNetworkRule watcher stopped");
        Ok(())
    }
}
