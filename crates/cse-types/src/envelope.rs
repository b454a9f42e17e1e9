//! # Result Envelope
//!
//! The universal result wrapper for every internal operation. Components
//! return a [`ResultEnvelope`] instead of raising; exceptions exist only at
//! the outermost task boundaries where they are converted to
//! `INTERNAL_SERVER_ERROR`.

use crate::errors::CseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// oneM2M response status codes carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseStatusCode {
    /// 1001 — accepted for non-blocking synchronous handling.
    AcceptedNonBlockingSync,
    /// 1002 — accepted for non-blocking asynchronous handling.
    AcceptedNonBlockingAsync,
    /// 2000 — retrieval/notify succeeded.
    Ok,
    /// 2001 — resource created.
    Created,
    /// 2002 — resource deleted.
    Deleted,
    /// 2004 — resource updated.
    Updated,
    /// 4000 — malformed or incomplete request.
    BadRequest,
    /// 4004 — target resource or forwarding path unknown.
    NotFound,
    /// 4005 — operation not permitted on this target.
    OperationNotAllowed,
    /// 4105 — conflicting registration or announcement.
    Conflict,
    /// 4117 — an AE with this originator is already registered.
    OriginatorHasAlreadyRegistered,
    /// 5000 — unexpected failure at an internal boundary.
    InternalServerError,
    /// 5103 — transit target did not answer within the transport timeout.
    TargetNotReachable,
}

impl ResponseStatusCode {
    /// Numeric wire value of the code.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::AcceptedNonBlockingSync => 1001,
            Self::AcceptedNonBlockingAsync => 1002,
            Self::Ok => 2000,
            Self::Created => 2001,
            Self::Deleted => 2002,
            Self::Updated => 2004,
            Self::BadRequest => 4000,
            Self::NotFound => 4004,
            Self::OperationNotAllowed => 4005,
            Self::Conflict => 4105,
            Self::OriginatorHasAlreadyRegistered => 4117,
            Self::InternalServerError => 5000,
            Self::TargetNotReachable => 5103,
        }
    }

    /// Accepted (1xxx) and successful (2xxx) codes count as success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.code() < 4000
    }

    /// Reverse mapping from the numeric wire value.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1001 => Self::AcceptedNonBlockingSync,
            1002 => Self::AcceptedNonBlockingAsync,
            2000 => Self::Ok,
            2001 => Self::Created,
            2002 => Self::Deleted,
            2004 => Self::Updated,
            4000 => Self::BadRequest,
            4004 => Self::NotFound,
            4005 => Self::OperationNotAllowed,
            4105 => Self::Conflict,
            4117 => Self::OriginatorHasAlreadyRegistered,
            5000 => Self::InternalServerError,
            5103 => Self::TargetNotReachable,
            _ => return None,
        })
    }
}

/// Result of any internal operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Response status code.
    pub rsc: ResponseStatusCode,
    /// Result content, when the operation produced any.
    pub content: Option<Value>,
    /// Human-readable diagnostic, never parsed by callers.
    pub debug: Option<String>,
    /// Request identifier of the originating request.
    pub request_identifier: String,
}

impl ResultEnvelope {
    /// Successful envelope with optional content.
    #[must_use]
    pub fn success(rsc: ResponseStatusCode, rqi: impl Into<String>, content: Option<Value>) -> Self {
        Self {
            rsc,
            content,
            debug: None,
            request_identifier: rqi.into(),
        }
    }

    /// Failure envelope with a diagnostic message.
    #[must_use]
    pub fn error(rsc: ResponseStatusCode, rqi: impl Into<String>, debug: impl Into<String>) -> Self {
        Self {
            rsc,
            content: None,
            debug: Some(debug.into()),
            request_identifier: rqi.into(),
        }
    }

    /// Envelope for a [`CseError`], mapping the taxonomy to its status code.
    #[must_use]
    pub fn from_error(err: &CseError, rqi: impl Into<String>) -> Self {
        Self::error(err.status_code(), rqi, err.to_string())
    }

    /// True when the status code is an accepted or success code.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.rsc.is_success()
    }
}
