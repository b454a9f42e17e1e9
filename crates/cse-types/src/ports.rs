//! # Collaborator Ports
//!
//! Trait definitions for the external collaborators the core consumes. The
//! actual CRUD semantics, wire encodings, and delivery mechanics live behind
//! these seams; the core only depends on the contracts below.

use crate::envelope::ResultEnvelope;
use crate::errors::CseError;
use crate::operation::Operation;
use crate::request::CseRequest;
use crate::resource::{Resource, ResourceType};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Search predicate for [`ResourceStore::search`].
///
/// All populated conditions must hold (conjunction).
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    /// Match a resource type.
    pub ty: Option<ResourceType>,
    /// Match a direct parent.
    pub parent: Option<String>,
    /// Match a string attribute by equality.
    pub attribute: Option<(String, String)>,
    /// Match resources whose `et` lies strictly before this timestamp.
    pub expired_before: Option<String>,
}

impl ResourceFilter {
    #[must_use]
    pub fn by_type(ty: ResourceType) -> Self {
        Self {
            ty: Some(ty),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_attribute(ty: ResourceType, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            ty: Some(ty),
            attribute: Some((name.into(), value.into())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn expired_before(now: impl Into<String>) -> Self {
        Self {
            expired_before: Some(now.into()),
            ..Self::default()
        }
    }

    /// Whether a resource satisfies every populated condition. Store
    /// implementations may evaluate this directly.
    #[must_use]
    pub fn matches(&self, resource: &Resource) -> bool {
        if let Some(ty) = self.ty {
            if resource.ty != ty {
                return false;
            }
        }
        if let Some(parent) = &self.parent {
            if resource.pi.as_deref() != Some(parent.as_str()) {
                return false;
            }
        }
        if let Some((name, value)) = &self.attribute {
            if resource.attr_str(name) != Some(value.as_str()) {
                return false;
            }
        }
        if let Some(now) = &self.expired_before {
            match resource.expiration() {
                Some(et) if et < now.as_str() => {}
                _ => return false,
            }
        }
        true
    }
}

/// Durable resource state. The store is the sole writer of persisted
/// resources and serializes writes per resource id internally.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Persist a new resource; the resource id must be unused.
    async fn create(&self, resource: Resource) -> Result<Resource, CseError>;

    /// Fetch a resource by id.
    async fn retrieve(&self, ri: &str) -> Result<Resource, CseError>;

    /// Replace a stored resource.
    async fn update(&self, resource: Resource) -> Result<Resource, CseError>;

    /// Delete a resource and, cascading, its subtree.
    async fn delete(&self, ri: &str) -> Result<(), CseError>;

    /// All resources satisfying the filter.
    async fn search(&self, filter: ResourceFilter) -> Result<Vec<Resource>, CseError>;

    /// Direct children of a parent, optionally narrowed by type.
    async fn direct_children(
        &self,
        parent: &str,
        ty: Option<ResourceType>,
    ) -> Result<Vec<Resource>, CseError>;
}

/// Performs the actual CRUD/discovery semantics and access-control checks for
/// an operation against a locally-hosted resource.
#[async_trait]
pub trait LocalExecutor: Send + Sync {
    /// Execute `op` locally; must be safe to call from any task.
    async fn process(&self, op: Operation, request: &CseRequest) -> ResultEnvelope;
}

/// Sends a serialized request to a remote CSE and returns its result
/// envelope. Encoding, timeouts, and reachability are its concern; a timeout
/// comes back as `TargetNotReachable`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        op: Operation,
        url: &str,
        originator: &str,
        content: Option<&Value>,
        params: &BTreeMap<String, String>,
    ) -> ResultEnvelope;
}

/// Best-effort notification delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `payload` to every target. Errors are logged by callers and
    /// never propagated to the original requester.
    async fn deliver(&self, targets: &[String], payload: &Value) -> Result<(), CseError>;
}
