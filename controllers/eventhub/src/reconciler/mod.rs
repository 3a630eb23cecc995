//! Reconciliation logic for EventhubNamespaceNetworkRule.
//!
//! One pass takes a rule from whatever state it is in one step closer to its
//! desired state:
//! - `resolver`: checks that the resource group and namespace exist
//! - `translator`: turns the spec into the ARM request
//! - `classifier`: maps provider failures to an error kind and retry policy
//! - `finalizer`: guards deletion of the rule set in Azure
//! - `status`: builds and writes the resulting status
//!
//! Passes are safe to repeat. Each performs at most one write to Azure and at
//! most one status write. All retry state is kept in the rule's status.

pub mod classifier;
pub mod finalizer;
pub mod resolver;
pub mod status;
pub mod translator;

use crate::backoff::ExponentialBackoff;
use crate::config::Config;
use crate::error::ControllerError;
use crate::store::ResourceStore;
use azure_client::{AzureError, EventHubClientTrait, NetworkRuleSetId};
use chrono::Utc;
use classifier::{classify, Classification, RetryDisposition};
use crds::{EventhubNamespaceNetworkRule, EventhubNamespaceNetworkRuleStatus, ProviderErrorKind, RuleState};
use finalizer::DeleteOutcome;
use kube::ResourceExt;
use resolver::Resolution;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Passes arriving this close to a scheduled retry run it instead of waiting
const RETRY_SLACK: Duration = Duration::from_secs(1);

/// Run a provider call with an upper bound on its duration
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, AzureError>
where
    F: Future<Output = Result<T, AzureError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(AzureError::Timeout(limit)))
}

/// Tunables of the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerSettings {
    pub provider_timeout: Duration,
    pub backoff: ExponentialBackoff,
    pub unknown_max_attempts: u32,
}

impl ReconcilerSettings {
    /// Settings from the controller configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            provider_timeout: config.provider_timeout,
            backoff: ExponentialBackoff::new(config.backoff_base, config.backoff_max),
            unknown_max_attempts: config.unknown_max_attempts.max(1),
        }
    }
}

/// Lifecycle event a watched object represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Created or updated; generation tells the two apart
    Applied,
    /// Deletion requested
    Deleted,
}

impl LifecycleEvent {
    /// Event represented by the current state of `rule`
    pub fn of(rule: &EventhubNamespaceNetworkRule) -> Self {
        if rule.is_being_deleted() {
            LifecycleEvent::Deleted
        } else {
            LifecycleEvent::Applied
        }
    }
}

/// Phase a rule is in after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Ready,
    Failed,
    Deleting,
    /// The finalizer is released; Kubernetes removes the object
    Gone,
}

impl From<RuleState> for Phase {
    fn from(state: RuleState) -> Self {
        match state {
            RuleState::Pending => Phase::Pending,
            RuleState::Ready => Phase::Ready,
            RuleState::Failed => Phase::Failed,
            RuleState::Deleting => Phase::Deleting,
        }
    }
}

/// Result of a reconcile pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub phase: Phase,
    /// When to run the next pass; `None` waits for the next change
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    fn settled(phase: Phase) -> Self {
        Self { phase, requeue_after: None }
    }

    fn requeue(phase: Phase, after: Duration) -> Self {
        Self { phase, requeue_after: Some(after) }
    }
}

/// What to do after a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryDecision {
    RetryIn(Duration),
    GiveUp,
}

/// Reconciles EventhubNamespaceNetworkRule resources.
pub struct Reconciler {
    client: Arc<dyn EventHubClientTrait>,
    store: Arc<dyn ResourceStore>,
    settings: ReconcilerSettings,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("subscription_id", &self.client.subscription_id())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler
    pub fn new(
        client: Arc<dyn EventHubClientTrait>,
        store: Arc<dyn ResourceStore>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self { client, store, settings }
    }

    /// Settings this reconciler runs with
    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Run one reconcile pass for `rule`
    pub async fn reconcile(&self, rule: &EventhubNamespaceNetworkRule) -> Result<ReconcileOutcome, ControllerError> {
        let key = resource_key(rule)?;
        match LifecycleEvent::of(rule) {
            LifecycleEvent::Applied => self.reconcile_applied(rule, &key).await,
            LifecycleEvent::Deleted => self.reconcile_deleted(rule, &key).await,
        }
    }

    async fn reconcile_applied(
        &self,
        rule: &EventhubNamespaceNetworkRule,
        key: &str,
    ) -> Result<ReconcileOutcome, ControllerError> {
        let generation = rule.metadata.generation;
        let current = rule.status.as_ref().filter(|s| is_current(s, generation));

        if let Some(status) = current {
            match status.state {
                RuleState::Ready | RuleState::Failed => {
                    debug!("EventhubNamespaceNetworkRule {} unchanged since generation {:?} ({})", key, generation, status.state);
                    return Ok(ReconcileOutcome::settled(status.state.into()));
                }
                RuleState::Pending => {
                    if let Some(wait) = retry_not_due(status) {
                        debug!("EventhubNamespaceNetworkRule {} retry not due for {:?}", key, wait);
                        return Ok(ReconcileOutcome::requeue(Phase::Pending, wait));
                    }
                }
                RuleState::Deleting => {}
            }
        }
        let attempts = current.map_or(0, |s| s.attempts);

        let spec = &rule.spec;
        if spec.namespace.trim().is_empty() || spec.resource_group.trim().is_empty() {
            let failure = Classification::new(
                ProviderErrorKind::BadRequest,
                "spec.namespace and spec.resourceGroup are required",
            );
            error!("EventhubNamespaceNetworkRule {} is invalid: {}", key, failure.message);
            status::project(self.store.as_ref(), rule, &status::failed(generation, &failure, attempts)).await?;
            return Ok(ReconcileOutcome::settled(Phase::Failed));
        }

        let resolution = resolver::resolve(self.client.as_ref(), spec, self.settings.provider_timeout).await;
        let namespace = match resolution {
            Ok(Resolution::Satisfied(namespace)) => namespace,
            Ok(Resolution::MissingResourceGroup(parent)) => {
                let failure = Classification::new(
                    ProviderErrorKind::ResourceGroupNotFound,
                    format!("{} not found", parent),
                );
                return self.record_failure(rule, key, RuleState::Pending, failure, attempts).await;
            }
            Ok(Resolution::MissingParentNamespace(parent)) => {
                let failure = Classification::new(ProviderErrorKind::ParentNotFound, format!("{} not found", parent));
                return self.record_failure(rule, key, RuleState::Pending, failure, attempts).await;
            }
            Err(e) => return self.record_failure(rule, key, RuleState::Pending, classify(&e), attempts).await,
        };
        debug!(
            "EventhubNamespaceNetworkRule {}: namespace {} resolved (tier {:?})",
            key,
            namespace.name,
            namespace.sku.effective_tier()
        );

        finalizer::ensure_marker(self.store.as_ref(), rule).await?;

        let request = translator::translate(spec);
        let applied = with_timeout(
            self.settings.provider_timeout,
            self.client.create_or_update_network_rule_set(&request),
        )
        .await;

        match applied {
            Ok(_) => {
                let written = status::project(self.store.as_ref(), rule, &status::ready(generation)).await?;
                if written {
                    info!("EventhubNamespaceNetworkRule {} is Ready", key);
                }
                Ok(ReconcileOutcome::settled(Phase::Ready))
            }
            Err(e) => self.record_failure(rule, key, RuleState::Pending, classify(&e), attempts).await,
        }
    }

    async fn reconcile_deleted(
        &self,
        rule: &EventhubNamespaceNetworkRule,
        key: &str,
    ) -> Result<ReconcileOutcome, ControllerError> {
        if !rule.has_finalizer() {
            debug!("EventhubNamespaceNetworkRule {} deleted without finalizer, nothing to clean up", key);
            return Ok(ReconcileOutcome::settled(Phase::Gone));
        }

        let generation = rule.metadata.generation;
        let current = rule
            .status
            .as_ref()
            .filter(|s| is_current(s, generation) && s.state == RuleState::Deleting);
        if let Some(wait) = current.and_then(retry_not_due) {
            debug!("EventhubNamespaceNetworkRule {} delete retry not due for {:?}", key, wait);
            return Ok(ReconcileOutcome::requeue(Phase::Deleting, wait));
        }
        let attempts = current.map_or(0, |s| s.attempts);

        let spec = &rule.spec;
        if !spec.namespace.trim().is_empty() && !spec.resource_group.trim().is_empty() {
            let id = NetworkRuleSetId::new(spec.resource_group.clone(), spec.namespace.clone());
            match finalizer::ensure_deleted(self.client.as_ref(), &id, self.settings.provider_timeout).await {
                Ok(DeleteOutcome::Deleted) => info!("EventhubNamespaceNetworkRule {}: rule set removed", key),
                Ok(DeleteOutcome::AlreadyAbsent) => info!("EventhubNamespaceNetworkRule {}: rule set already absent", key),
                Err(e) => return self.record_failure(rule, key, RuleState::Deleting, classify(&e), attempts).await,
            }
            status::project(self.store.as_ref(), rule, &status::deleting(generation)).await?;
        }

        finalizer::release(self.store.as_ref(), rule).await?;
        info!("EventhubNamespaceNetworkRule {} finalizer released", key);
        Ok(ReconcileOutcome::settled(Phase::Gone))
    }

    /// Record a classified failure in status and decide when to try again
    async fn record_failure(
        &self,
        rule: &EventhubNamespaceNetworkRule,
        key: &str,
        state: RuleState,
        failure: Classification,
        attempts: u32,
    ) -> Result<ReconcileOutcome, ControllerError> {
        let generation = rule.metadata.generation;
        // The streak restarts whenever the kind of failure changes
        let last_kind = rule.status.as_ref().and_then(|s| s.last_error_kind);
        let attempts = if last_kind == Some(failure.kind) { attempts } else { 0 };
        let next_attempts = attempts.saturating_add(1);

        let (desired, outcome) = match (self.decide(&failure, attempts), state) {
            (RetryDecision::RetryIn(wait), _) => {
                warn!(
                    "EventhubNamespaceNetworkRule {} {} failed ({}), retry {} in {:?}: {}",
                    key,
                    verb(state),
                    failure.kind,
                    next_attempts,
                    wait,
                    failure.message
                );
                (
                    status::retrying(state, generation, &failure, next_attempts, wait),
                    ReconcileOutcome::requeue(state.into(), wait),
                )
            }
            // A rule set that cannot be deleted keeps its finalizer and is retried at the slowest rate
            (RetryDecision::GiveUp, RuleState::Deleting) => {
                let wait = self.settings.backoff.max();
                error!(
                    "EventhubNamespaceNetworkRule {} delete failed ({}), retrying in {:?}: {}",
                    key, failure.kind, wait, failure.message
                );
                (
                    status::retrying(RuleState::Deleting, generation, &failure, next_attempts, wait),
                    ReconcileOutcome::requeue(Phase::Deleting, wait),
                )
            }
            (RetryDecision::GiveUp, _) => {
                error!(
                    "EventhubNamespaceNetworkRule {} failed ({}), not retrying until the spec changes: {}",
                    key, failure.kind, failure.message
                );
                (
                    status::failed(generation, &failure, next_attempts),
                    ReconcileOutcome::settled(Phase::Failed),
                )
            }
        };

        status::project(self.store.as_ref(), rule, &desired).await?;
        Ok(outcome)
    }

    fn decide(&self, failure: &Classification, attempts: u32) -> RetryDecision {
        let backoff = &self.settings.backoff;
        match failure.disposition {
            RetryDisposition::Terminal => RetryDecision::GiveUp,
            RetryDisposition::Backoff => RetryDecision::RetryIn(backoff.delay(attempts)),
            RetryDisposition::ImmediateOnce if attempts == 0 => RetryDecision::RetryIn(Duration::ZERO),
            RetryDisposition::ImmediateOnce => RetryDecision::RetryIn(backoff.delay(attempts)),
            RetryDisposition::HonorProviderDelay => {
                RetryDecision::RetryIn(failure.retry_after.unwrap_or_else(|| backoff.delay(attempts)))
            }
            RetryDisposition::CappedBackoff if attempts.saturating_add(1) >= self.settings.unknown_max_attempts => {
                RetryDecision::GiveUp
            }
            RetryDisposition::CappedBackoff => RetryDecision::RetryIn(backoff.delay(attempts)),
        }
    }
}

fn verb(state: RuleState) -> &'static str {
    match state {
        RuleState::Deleting => "delete",
        _ => "apply",
    }
}

/// `namespace/name` of a rule, used in logs
fn resource_key(rule: &EventhubNamespaceNetworkRule) -> Result<String, ControllerError> {
    let name = rule
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| ControllerError::InvalidObject("EventhubNamespaceNetworkRule without a name".to_string()))?;
    Ok(format!("{}/{}", rule.namespace().unwrap_or_default(), name))
}

/// Whether `status` was computed from the object's current generation
fn is_current(status: &EventhubNamespaceNetworkRuleStatus, generation: Option<i64>) -> bool {
    generation.is_some() && status.observed_generation == generation
}

/// Time left until a scheduled retry, if it is not due yet
fn retry_not_due(status: &EventhubNamespaceNetworkRuleStatus) -> Option<Duration> {
    let remaining = (status.next_retry_at? - Utc::now()).to_std().ok()?;
    (remaining > RETRY_SLACK).then_some(remaining)
}
