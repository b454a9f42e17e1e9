//! Federation error types.

use thiserror::Error;

/// Errors produced by federation lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FederationError {
    /// The CSE-ID is not in the table and no registrar covers it.
    #[error("no known path to CSE {0}")]
    UnknownCse(String),

    /// A link exists but carries no usable point of access.
    #[error("no point of access for CSE {0}")]
    NoPointOfAccess(String),
}
