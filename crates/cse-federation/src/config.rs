//! Federation configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration of the local CSE's federation behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// CSE-ID of the local node, with its leading slash (e.g. `/id-in`).
    pub cse_id: String,
    /// Resource id of the local `<CSEBase>`.
    pub cse_base_ri: String,
    /// Resource name of the local `<CSEBase>`.
    pub cse_base_rn: String,
    /// Points of access other CSEs can reach this node at.
    pub points_of_access: Vec<String>,
    /// Upstream registrar; `None` for a topmost (IN) CSE.
    pub registrar: Option<RegistrarConfig>,
    /// Whether the monitor probes registree liveliness each tick.
    pub liveliness_enabled: bool,
    /// Connection-monitor tick interval.
    pub monitor_interval: Duration,
}

/// The registrar this CSE registers into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrarConfig {
    /// Network address of the registrar (its point of access).
    pub address: String,
    /// CSE-ID of the registrar, with its leading slash.
    pub cse_id: String,
    /// Resource name of the registrar's `<CSEBase>`.
    pub cse_base_rn: String,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            cse_id: "/id-in".to_string(),
            cse_base_ri: "cse-in".to_string(),
            cse_base_rn: "cse-in".to_string(),
            points_of_access: vec!["http://127.0.0.1:8080".to_string()],
            registrar: None,
            liveliness_enabled: true,
            monitor_interval: Duration::from_secs(30),
        }
    }
}

/// Configuration validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cse_id must start with '/': {0}")]
    MalformedCseId(String),
    #[error("cse_base_ri must not be empty")]
    EmptyCseBaseRi,
    #[error("monitor_interval must be non-zero")]
    ZeroInterval,
    #[error("registrar address must not be empty")]
    EmptyRegistrarAddress,
    #[error("registrar cse_id must start with '/': {0}")]
    MalformedRegistrarCseId(String),
}

impl FederationConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cse_id.starts_with('/') || self.cse_id.len() < 2 {
            return Err(ConfigError::MalformedCseId(self.cse_id.clone()));
        }
        if self.cse_base_ri.is_empty() {
            return Err(ConfigError::EmptyCseBaseRi);
        }
        if self.monitor_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if let Some(registrar) = &self.registrar {
            if registrar.address.is_empty() {
                return Err(ConfigError::EmptyRegistrarAddress);
            }
            if !registrar.cse_id.starts_with('/') || registrar.cse_id.len() < 2 {
                return Err(ConfigError::MalformedRegistrarCseId(registrar.cse_id.clone()));
            }
        }
        Ok(())
    }

    /// SP-relative address of the local `<CSEBase>` (`/cse-id/rn`), the `cb`
    /// value pushed upstream in the self `<CSR>`.
    #[must_use]
    pub fn cse_base_address(&self) -> String {
        format!("{}/{}", self.cse_id, self.cse_base_rn)
    }
}
