//! Controller-specific error types.
//!
//! Provider failures that the reconciler classifies and records in status
//! never surface here; these are the failures of the controller itself
//! (configuration, Kubernetes API, startup checks).

use azure_client::AzureError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Event Hub Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Azure API error outside of a reconcile pass (client setup, credential check)
    #[error("Azure error: {0}")]
    Azure(#[from] AzureError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Object is missing metadata the controller needs (name, namespace)
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
