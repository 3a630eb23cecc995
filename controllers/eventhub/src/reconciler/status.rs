//! Status projection.
//!
//! Builds the status a pass ends in and writes it, unless the object already
//! carries exactly that status. Skipping identical writes matters: every
//! write produces a watch event, which would otherwise start another pass.

use super::classifier::{category, Classification};
use crate::error::ControllerError;
use crate::store::ResourceStore;
use chrono::Utc;
use crds::{EventhubNamespaceNetworkRule, EventhubNamespaceNetworkRuleStatus, RuleState};
use std::time::Duration;
use tracing::debug;

/// Status of a rule whose rule set is applied
pub fn ready(generation: Option<i64>) -> EventhubNamespaceNetworkRuleStatus {
    EventhubNamespaceNetworkRuleStatus {
        state: RuleState::Ready,
        ready: true,
        observed_generation: generation,
        message: Some("Network rule set applied".to_string()),
        ..Default::default()
    }
}

/// Status of a rule that will be retried after `retry_in`
pub fn retrying(
    state: RuleState,
    generation: Option<i64>,
    failure: &Classification,
    attempts: u32,
    retry_in: Duration,
) -> EventhubNamespaceNetworkRuleStatus {
    let next_retry_at = if retry_in.is_zero() {
        None
    } else {
        chrono::Duration::from_std(retry_in).ok().map(|d| Utc::now() + d)
    };

    EventhubNamespaceNetworkRuleStatus {
        state,
        ready: false,
        observed_generation: generation,
        last_error_kind: Some(failure.kind),
        error_category: Some(category(failure.kind)),
        message: Some(failure.message.clone()),
        requeue_after_seconds: Some(retry_in.as_secs()),
        attempts,
        next_retry_at,
    }
}

/// Status of a rule that will not be retried until its spec changes
pub fn failed(
    generation: Option<i64>,
    failure: &Classification,
    attempts: u32,
) -> EventhubNamespaceNetworkRuleStatus {
    EventhubNamespaceNetworkRuleStatus {
        state: RuleState::Failed,
        ready: false,
        observed_generation: generation,
        last_error_kind: Some(failure.kind),
        error_category: Some(category(failure.kind)),
        message: Some(failure.message.clone()),
        requeue_after_seconds: None,
        attempts,
        next_retry_at: None,
    }
}

/// Status of a rule whose rule set is being removed
pub fn deleting(generation: Option<i64>) -> EventhubNamespaceNetworkRuleStatus {
    EventhubNamespaceNetworkRuleStatus {
        state: RuleState::Deleting,
        ready: false,
        observed_generation: generation,
        message: Some("Removing network rule set".to_string()),
        ..Default::default()
    }
}

/// Whether `desired` differs from what the object currently shows
pub fn status_needs_update(
    current: Option<&EventhubNamespaceNetworkRuleStatus>,
    desired: &EventhubNamespaceNetworkRuleStatus,
) -> bool {
    current != Some(desired)
}

/// Write `desired` unless it is already the current status; returns whether a write happened
pub async fn project(
    store: &dyn ResourceStore,
    rule: &EventhubNamespaceNetworkRule,
    desired: &EventhubNamespaceNetworkRuleStatus,
) -> Result<bool, ControllerError> {
    if !status_needs_update(rule.status.as_ref(), desired) {
        debug!("Status unchanged ({}), skipping write", desired.state);
        return Ok(false);
    }
    store.patch_status(rule, desired).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{ErrorCategory, ProviderErrorKind};

    #[test]
    fn test_ready_clears_error() {
        let status = ready(Some(3));
        assert!(status.ready);
        assert_eq!(status.last_error_kind, None);
        assert_eq!(status.error_category, None);
        assert_eq!(status.observed_generation, Some(3));
        assert_eq!(status.attempts, 0);
    }

    #[test]
    fn test_retrying_schedules_next_attempt() {
        let failure = Classification::new(ProviderErrorKind::ParentNotFound, "namespace missing");
        let before = Utc::now();
        let status = retrying(RuleState::Pending, Some(1), &failure, 2, Duration::from_secs(20));

        assert_eq!(status.state, RuleState::Pending);
        assert_eq!(status.error_category, Some(ErrorCategory::DependencyMissingNamespace));
        assert_eq!(status.requeue_after_seconds, Some(20));
        assert_eq!(status.attempts, 2);
        let at = status.next_retry_at.unwrap();
        assert!(at >= before + chrono::Duration::seconds(20));
    }

    #[test]
    fn test_immediate_retry_has_no_deadline() {
        let failure = Classification::new(ProviderErrorKind::Conflict, "busy");
        let status = retrying(RuleState::Pending, Some(1), &failure, 1, Duration::ZERO);
        assert_eq!(status.next_retry_at, None);
        assert_eq!(status.requeue_after_seconds, Some(0));
    }

    #[test]
    fn test_needs_update() {
        let desired = ready(Some(1));
        assert!(status_needs_update(None, &desired));
        assert!(!status_needs_update(Some(&ready(Some(1))), &desired));
        assert!(status_needs_update(Some(&ready(Some(2))), &desired));
    }
}
