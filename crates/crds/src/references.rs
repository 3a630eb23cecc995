//! Parent references for network rule CRDs
//!
//! A network rule never owns its parents. It names them, and the controller
//! resolves those names against Azure before provisioning anything.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of parent entity a network rule depends on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum ParentKind {
    /// Azure resource group
    ResourceGroup,
    /// Event Hubs namespace (scoped to a resource group)
    Namespace,
}

impl fmt::Display for ParentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentKind::ResourceGroup => write!(f, "ResourceGroup"),
            ParentKind::Namespace => write!(f, "Namespace"),
        }
    }
}

/// Reference to a parent entity: `(kind, name, scope)`.
///
/// `scope` is the enclosing resource group for a namespace reference and
/// `None` for a resource group reference.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    /// Kind of the referenced entity
    pub kind: ParentKind,

    /// Name of the referenced entity in Azure
    pub name: String,

    /// Enclosing scope, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl ParentRef {
    /// Reference to a resource group by name
    pub fn resource_group(name: impl Into<String>) -> Self {
        Self {
            kind: ParentKind::ResourceGroup,
            name: name.into(),
            scope: None,
        }
    }

    /// Reference to an Event Hubs namespace inside `resource_group`
    pub fn namespace(name: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            kind: ParentKind::Namespace,
            name: name.into(),
            scope: Some(resource_group.into()),
        }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{} {}/{}", self.kind, scope, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}
