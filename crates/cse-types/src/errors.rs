//! # Error Taxonomy
//!
//! The workspace-wide error taxonomy. Each variant maps onto exactly one
//! [`ResponseStatusCode`], so any error can be turned into a
//! [`crate::ResultEnvelope`] at the boundary where it stops propagating.

use crate::envelope::ResponseStatusCode;
use thiserror::Error;

/// Errors shared across the CSE subsystems.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CseError {
    /// Unknown target id, or no known forwarding path for it.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation not permitted on this target (transit disabled, CSE-base
    /// mutation, recall of a non-terminal request).
    #[error("operation not allowed: {0}")]
    OperationNotAllowed(String),

    /// Missing content, malformed target id, malformed filter criteria.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Duplicate registration or announcement.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An AE with this originator is already registered.
    #[error("originator has already registered: {0}")]
    AlreadyRegistered(String),

    /// Transport timeout or failure while forwarding.
    #[error("target not reachable: {0}")]
    TargetNotReachable(String),

    /// Unexpected failure caught at an internal boundary.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CseError {
    /// The response status code this error maps to.
    #[must_use]
    pub const fn status_code(&self) -> ResponseStatusCode {
        match self {
            Self::NotFound(_) => ResponseStatusCode::NotFound,
            Self::OperationNotAllowed(_) => ResponseStatusCode::OperationNotAllowed,
            Self::BadRequest(_) => ResponseStatusCode::BadRequest,
            Self::Conflict(_) => ResponseStatusCode::Conflict,
            Self::AlreadyRegistered(_) => ResponseStatusCode::OriginatorHasAlreadyRegistered,
            Self::TargetNotReachable(_) => ResponseStatusCode::TargetNotReachable,
            Self::Internal(_) => ResponseStatusCode::InternalServerError,
        }
    }
}
