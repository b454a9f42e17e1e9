//! Operations, response types, and filter criteria.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The operations a CSE can perform on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Retrieve a single resource.
    Retrieve,
    /// Create a new resource under a parent.
    Create,
    /// Update attributes of an existing resource.
    Update,
    /// Delete a resource (and its subtree).
    Delete,
    /// Retrieval variant selected when filter usage indicates discovery.
    Discovery,
    /// Deliver a notification to a target.
    Notify,
}

impl Operation {
    /// True for operations that carry primitive content.
    #[must_use]
    pub const fn requires_content(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}

/// How the caller wants the response delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// Execute inline, answer with the final result.
    Blocking,
    /// Accept immediately; the caller polls the `<request>` resource.
    NonBlockingSync,
    /// Accept immediately; the result is pushed as a notification.
    NonBlockingAsync,
    /// Resolved to Blocking or NonBlockingAsync by node configuration.
    FlexBlocking,
}

/// Filter usage accompanying retrieval requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterUsage {
    /// The request is a discovery of matching resource addresses.
    DiscoveryCriteria,
    /// The filter conditions gate an ordinary retrieval.
    ConditionalRetrieval,
}

/// Filter criteria attached to a request.
///
/// The attribute map is opaque to the coordinator: for transit requests it is
/// passed through as query parameters unchanged, for local requests it is
/// handed to the local executor untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Filter usage indicator (`fu`).
    pub filter_usage: Option<FilterUsage>,
    /// Remaining filter conditions, keyed by their short names.
    pub attributes: BTreeMap<String, String>,
}

impl FilterCriteria {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filter_usage.is_none() && self.attributes.is_empty()
    }

    /// Render the criteria as query parameters for transit forwarding.
    ///
    /// The attribute map is copied verbatim; `fu` is added as its numeric
    /// wire value when present.
    #[must_use]
    pub fn query_params(&self) -> BTreeMap<String, String> {
        let mut params = self.attributes.clone();
        if let Some(fu) = self.filter_usage {
            let value = match fu {
                FilterUsage::DiscoveryCriteria => "1",
                FilterUsage::ConditionalRetrieval => "2",
            };
            params.insert("fu".to_string(), value.to_string());
        }
        params
    }
}
