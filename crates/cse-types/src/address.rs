//! # Structured Resource Addressing
//!
//! Target ids arrive in three schemes:
//!
//! - CSE-relative: `someAe/container`
//! - SP-relative: `/id-in/someAe/container`
//! - Absolute: `//sp.example.org/id-in/someAe/container`
//!
//! [`ResourceAddress::parse`] is the only place raw id strings are sliced;
//! all routing logic consumes the parsed variant.

use crate::errors::CseError;
use serde::{Deserialize, Serialize};

/// A parsed target id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceAddress {
    /// Path relative to the receiving CSE, always local.
    CseRelative {
        /// Resource path under the local CSE base (may name the base itself).
        path: String,
    },
    /// `/cse-id/path` — hosted by the named CSE.
    SpRelative {
        /// CSE-ID including its leading slash, as `csi` is spelled.
        cse_id: String,
        /// Path under that CSE's base; empty targets the base itself.
        path: String,
    },
    /// `//sp-id/cse-id/path` — fully qualified across service providers.
    Absolute {
        /// Service provider id, without the leading double slash.
        sp_id: String,
        /// CSE-ID including its leading slash.
        cse_id: String,
        /// Path under that CSE's base; empty targets the base itself.
        path: String,
    },
}

impl ResourceAddress {
    /// Parse a raw target id into its addressing scheme.
    pub fn parse(id: &str) -> Result<Self, CseError> {
        if id.is_empty() {
            return Err(CseError::BadRequest("empty target id".into()));
        }

        if let Some(rest) = id.strip_prefix("//") {
            let (sp_id, remainder) = match rest.split_once('/') {
                Some((sp, r)) => (sp, r),
                None => (rest, ""),
            };
            if sp_id.is_empty() {
                return Err(CseError::BadRequest(format!("malformed absolute id: {id}")));
            }
            let (cse_id, path) = split_cse_segment(remainder, id)?;
            return Ok(Self::Absolute {
                sp_id: sp_id.to_string(),
                cse_id,
                path,
            });
        }

        if let Some(rest) = id.strip_prefix('/') {
            let (cse_id, path) = split_cse_segment(rest, id)?;
            return Ok(Self::SpRelative { cse_id, path });
        }

        Ok(Self::CseRelative {
            path: id.to_string(),
        })
    }

    /// The embedded CSE-ID, if the scheme names one.
    #[must_use]
    pub fn cse_id(&self) -> Option<&str> {
        match self {
            Self::CseRelative { .. } => None,
            Self::SpRelative { cse_id, .. } | Self::Absolute { cse_id, .. } => Some(cse_id),
        }
    }

    /// The resource path under the addressed CSE base.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::CseRelative { path }
            | Self::SpRelative { path, .. }
            | Self::Absolute { path, .. } => path,
        }
    }

    /// Whether the address names a resource hosted by `local_cse_id`.
    ///
    /// CSE-relative ids are local by construction.
    #[must_use]
    pub fn is_local(&self, local_cse_id: &str) -> bool {
        match self.cse_id() {
            None => true,
            Some(cse_id) => cse_id == local_cse_id,
        }
    }

    /// The SP-relative spelling (`/cse-id/path`) used when composing forward
    /// URLs; CSE-relative addresses are qualified with `local_cse_id`.
    #[must_use]
    pub fn sp_relative_form(&self, local_cse_id: &str) -> String {
        let (cse_id, path) = match self {
            Self::CseRelative { path } => (local_cse_id, path.as_str()),
            Self::SpRelative { cse_id, path } | Self::Absolute { cse_id, path, .. } => {
                (cse_id.as_str(), path.as_str())
            }
        };
        if path.is_empty() {
            cse_id.to_string()
        } else {
            format!("{cse_id}/{path}")
        }
    }
}

/// Split `cse-id[/path]` (no leading slash on input) into the slash-prefixed
/// CSE-ID and the remaining path.
fn split_cse_segment(rest: &str, original: &str) -> Result<(String, String), CseError> {
    let (cse, path) = match rest.split_once('/') {
        Some((cse, path)) => (cse, path),
        None => (rest, ""),
    };
    if cse.is_empty() {
        return Err(CseError::BadRequest(format!(
            "malformed target id: {original}"
        )));
    }
    Ok((format!("/{cse}"), path.to_string()))
}
