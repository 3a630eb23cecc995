//! Test utilities for unit testing the reconciler
//!
//! `MemoryStore` keeps status and finalizer writes in memory and publishes a
//! version counter over a `tokio::sync::watch` channel, so tests can wait for
//! a state without polling.

use crate::backoff::ExponentialBackoff;
use crate::error::ControllerError;
use crate::reconciler::{Phase, ReconcileOutcome, Reconciler, ReconcilerSettings};
use crate::store::ResourceStore;
use azure_client::MockAzureClient;
use crds::*;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory `ResourceStore`
#[derive(Debug)]
pub struct MemoryStore {
    statuses: Mutex<HashMap<String, EventhubNamespaceNetworkRuleStatus>>,
    finalizers: Mutex<HashMap<String, Vec<String>>>,
    status_writes: Mutex<Vec<(String, EventhubNamespaceNetworkRuleStatus)>>,
    finalizer_writes: Mutex<usize>,
    version: watch::Sender<u64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            statuses: Mutex::new(HashMap::new()),
            finalizers: Mutex::new(HashMap::new()),
            status_writes: Mutex::new(Vec::new()),
            finalizer_writes: Mutex::new(0),
            version,
        }
    }

    pub fn status(&self, key: &str) -> Option<EventhubNamespaceNetworkRuleStatus> {
        lock(&self.statuses).get(key).cloned()
    }

    pub fn finalizers(&self, key: &str) -> Option<Vec<String>> {
        lock(&self.finalizers).get(key).cloned()
    }

    /// Every status written for `key`, oldest first
    pub fn status_history(&self, key: &str) -> Vec<EventhubNamespaceNetworkRuleStatus> {
        lock(&self.status_writes)
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn status_writes(&self) -> usize {
        lock(&self.status_writes).len()
    }

    pub fn finalizer_writes(&self) -> usize {
        *lock(&self.finalizer_writes)
    }

    /// Copy what the store holds for `rule` onto it, as the next watch event would
    pub fn refresh(&self, rule: &mut EventhubNamespaceNetworkRule) {
        let key = key_of(rule);
        if let Some(status) = self.status(&key) {
            rule.status = Some(status);
        }
        if let Some(finalizers) = self.finalizers(&key) {
            rule.metadata.finalizers = Some(finalizers);
        }
    }

    /// Wait until the status of `key` satisfies `predicate`, or `timeout` passes
    pub async fn wait_for_status<P>(
        &self,
        key: &str,
        timeout: Duration,
        predicate: P,
    ) -> Option<EventhubNamespaceNetworkRuleStatus>
    where
        P: Fn(&EventhubNamespaceNetworkRuleStatus) -> bool,
    {
        let mut changes = self.version.subscribe();
        let wait = async {
            loop {
                if let Some(status) = self.status(key).filter(|s| predicate(s)) {
                    return Some(status);
                }
                if changes.changed().await.is_err() {
                    return None;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[async_trait::async_trait]
impl ResourceStore for MemoryStore {
    async fn patch_status(
        &self,
        rule: &EventhubNamespaceNetworkRule,
        status: &EventhubNamespaceNetworkRuleStatus,
    ) -> Result<(), ControllerError> {
        let key = key_of(rule);
        lock(&self.statuses).insert(key.clone(), status.clone());
        lock(&self.status_writes).push((key, status.clone()));
        self.bump();
        Ok(())
    }

    async fn set_finalizers(
        &self,
        rule: &EventhubNamespaceNetworkRule,
        finalizers: Vec<String>,
    ) -> Result<(), ControllerError> {
        lock(&self.finalizers).insert(key_of(rule), finalizers);
        *lock(&self.finalizer_writes) += 1;
        self.bump();
        Ok(())
    }
}

/// `namespace/name` of a rule
pub fn key_of(rule: &EventhubNamespaceNetworkRule) -> String {
    format!("{}/{}", rule.namespace().unwrap_or_default(), rule.name_any())
}

/// Helper to create a test EventhubNamespaceNetworkRule in namespace "default"
pub fn create_test_rule(name: &str, resource_group: &str, namespace: &str) -> EventhubNamespaceNetworkRule {
    EventhubNamespaceNetworkRule {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            generation: Some(1),
            ..Default::default()
        },
        spec: EventhubNamespaceNetworkRuleSpec {
            namespace: namespace.to_string(),
            resource_group: resource_group.to_string(),
            default_action: DefaultAction::Allow,
            virtual_network_rules: None,
            ip_rules: None,
        },
        status: None,
    }
}

/// Mark `rule` as deleted, bumping its generation like the API server does
pub fn mark_deleted(rule: &mut EventhubNamespaceNetworkRule) {
    let marked: ObjectMeta = serde_json::from_value(serde_json::json!({
        "deletionTimestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }))
    .unwrap();
    rule.metadata.deletion_timestamp = marked.deletion_timestamp;
    rule.metadata.generation = rule.metadata.generation.map(|g| g + 1);
}

/// Settings with millisecond backoff so retries never wait in tests
pub fn test_settings() -> ReconcilerSettings {
    ReconcilerSettings {
        provider_timeout: Duration::from_secs(2),
        backoff: ExponentialBackoff::new(Duration::from_millis(10), Duration::from_millis(100)),
        unknown_max_attempts: 3,
    }
}

/// Reconciler wired to `mock` and a fresh `MemoryStore`
pub fn create_test_reconciler(mock: &MockAzureClient) -> (Reconciler, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let sink: Arc<dyn ResourceStore> = store.clone();
    let reconciler = Reconciler::new(Arc::new(mock.clone()), sink, test_settings());
    (reconciler, store)
}

/// Reconcile `rule` until it settles or `max_passes` runs out, feeding each
/// pass's writes into the next one; returns every outcome
pub async fn drive(
    reconciler: &Reconciler,
    store: &MemoryStore,
    rule: &mut EventhubNamespaceNetworkRule,
    max_passes: usize,
) -> Vec<ReconcileOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..max_passes {
        let outcome = match reconciler.reconcile(rule).await {
            Ok(outcome) => outcome,
            Err(e) => panic!("reconcile failed: {}", e),
        };
        outcomes.push(outcome);
        store.refresh(rule);
        if outcome.requeue_after.is_none() || outcome.phase == Phase::Gone {
            break;
        }
    }
    outcomes
}
