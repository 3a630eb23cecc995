//! Event Hub Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the Event Hub network rule controller.

pub mod eventhub_network_rule;
pub mod references;

pub use eventhub_network_rule::*;
pub use references::*;
