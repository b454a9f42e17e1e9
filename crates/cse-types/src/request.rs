//! The admitted request primitive.

use crate::operation::{FilterCriteria, FilterUsage, Operation, ResponseType};
use crate::resource::ResourceType;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// An inbound request, immutable once admitted by the coordinator.
///
/// Field names follow the oneM2M request primitive short names where they
/// exist (`to`, `fr`, `rqi`, `rvi`, `rt`, `rtu`, `ty`, `pc`, `rqet`, `rset`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CseRequest {
    /// Requested operation.
    pub operation: Operation,
    /// Target id, in any of the three addressing schemes.
    pub to: String,
    /// Originator the request is made on behalf of.
    pub originator: String,
    /// Request identifier; also names the actor for deferred execution.
    pub request_identifier: String,
    /// Release version indicator.
    pub release_version: Option<String>,
    /// Requested response handling.
    pub response_type: ResponseType,
    /// Explicit notification targets for asynchronous responses.
    pub response_target_uris: Vec<String>,
    /// Filter criteria; passed through unchanged on transit.
    pub filter_criteria: FilterCriteria,
    /// Resource type for CREATE requests.
    pub resource_type: Option<ResourceType>,
    /// Primitive content.
    pub content: Option<Value>,
    /// Request expiration timestamp.
    pub request_expiration: Option<String>,
    /// Result expiration timestamp.
    pub result_expiration: Option<String>,
}

impl CseRequest {
    /// A blocking request with a fresh request identifier.
    #[must_use]
    pub fn new(operation: Operation, to: impl Into<String>, originator: impl Into<String>) -> Self {
        Self {
            operation,
            to: to.into(),
            originator: originator.into(),
            request_identifier: Uuid::new_v4().simple().to_string(),
            release_version: None,
            response_type: ResponseType::Blocking,
            response_target_uris: Vec::new(),
            filter_criteria: FilterCriteria::default(),
            resource_type: None,
            content: None,
            request_expiration: None,
            result_expiration: None,
        }
    }

    #[must_use]
    pub fn with_response_type(mut self, rt: ResponseType) -> Self {
        self.response_type = rt;
        self
    }

    #[must_use]
    pub fn with_content(mut self, ty: ResourceType, content: Value) -> Self {
        self.resource_type = Some(ty);
        self.content = Some(content);
        self
    }

    #[must_use]
    pub fn with_request_identifier(mut self, rqi: impl Into<String>) -> Self {
        self.request_identifier = rqi.into();
        self
    }

    #[must_use]
    pub fn with_filter_criteria(mut self, fc: FilterCriteria) -> Self {
        self.filter_criteria = fc;
        self
    }

    #[must_use]
    pub fn with_response_targets(mut self, rtu: Vec<String>) -> Self {
        self.response_target_uris = rtu;
        self
    }

    /// The operation after applying the discovery selection rule: a retrieval
    /// whose filter usage indicates discovery criteria is a Discovery.
    #[must_use]
    pub fn effective_operation(&self) -> Operation {
        match (self.operation, self.filter_criteria.filter_usage) {
            (Operation::Retrieve, Some(FilterUsage::DiscoveryCriteria)) => Operation::Discovery,
            (op, _) => op,
        }
    }

    /// Meta-information echo persisted into a `<request>` resource (`mi`).
    #[must_use]
    pub fn meta_info(&self) -> Value {
        json!({
            "op": self.effective_operation(),
            "to": self.to,
            "fr": self.originator,
            "rqi": self.request_identifier,
            "rt": self.response_type,
            "rvi": self.release_version,
        })
    }
}
