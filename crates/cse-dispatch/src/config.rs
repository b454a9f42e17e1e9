//! Coordinator configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// How FLEX_BLOCKING requests are resolved on this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlexBlockingPolicy {
    /// Execute inline and answer with the final result.
    Blocking,
    /// Accept immediately and push the result as a notification.
    NonBlockingAsync,
}

/// Configuration of the request coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// CSE-ID of the local node, with its leading slash.
    pub cse_id: String,
    /// Resource id of the local `<CSEBase>`.
    pub cse_base_ri: String,
    /// Resource name of the local `<CSEBase>`.
    pub cse_base_rn: String,
    /// Whether requests targeting other CSEs are forwarded.
    pub transit_enabled: bool,
    /// Resolution of FLEX_BLOCKING requests.
    pub flex_blocking: FlexBlockingPolicy,
    /// Expiration-sweep tick interval.
    pub sweep_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cse_id: "/id-in".to_string(),
            cse_base_ri: "cse-in".to_string(),
            cse_base_rn: "cse-in".to_string(),
            transit_enabled: true,
            flex_blocking: FlexBlockingPolicy::Blocking,
            sweep_interval: Duration::from_secs(60),
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
    #[error("sweep_interval must be non-zero")]
    ZeroInterval,
}

impl CoordinatorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cse_id.starts_with('/') || self.cse_id.len() < 2 {
            return Err(ConfigError::MalformedCseId(self.cse_id.clone()));
        }
        if self.cse_base_ri.is_empty() {
            return Err(ConfigError::EmptyCseBaseRi);
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}
