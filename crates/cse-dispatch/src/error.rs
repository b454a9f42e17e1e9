//! Dispatch error types.

use cse_types::{CseError, ResponseStatusCode};
use thiserror::Error;

/// Errors produced by the coordinator and the registration hooks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The originator does not match the required pattern.
    #[error("invalid originator: {0}")]
    InvalidOriginator(String),

    /// An AE with this originator is already registered.
    #[error("originator has already registered: {0}")]
    AlreadyRegistered(String),

    /// A required attribute is missing or malformed.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Duplicate registration or announcement.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A `<request>` may only be recalled once it reached a final status.
    #[error("unable to recall request: {0}")]
    RecallNotAllowed(String),

    /// A shared-taxonomy error crossing the dispatch boundary.
    #[error(transparent)]
    Cse(#[from] CseError),
}

impl DispatchError {
    /// The response status code this error maps to.
    #[must_use]
    pub fn status_code(&self) -> ResponseStatusCode {
        match self {
            Self::InvalidOriginator(_) | Self::InvalidAttribute(_) => {
                ResponseStatusCode::BadRequest
            }
            Self::AlreadyRegistered(_) => ResponseStatusCode::OriginatorHasAlreadyRegistered,
            Self::Conflict(_) => ResponseStatusCode::Conflict,
            Self::RecallNotAllowed(_) => ResponseStatusCode::OperationNotAllowed,
            Self::Cse(err) => err.status_code(),
        }
    }
}
