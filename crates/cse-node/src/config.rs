//! Node configuration combining the subsystem configs.

use cse_dispatch::CoordinatorConfig;
use cse_federation::FederationConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Full configuration of one CSE node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Federation manager configuration.
    pub federation: FederationConfig,
    /// Request coordinator configuration.
    pub coordinator: CoordinatorConfig,
}

/// Node configuration validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NodeConfigError {
    #[error(transparent)]
    Federation(#[from] cse_federation::config::ConfigError),
    #[error(transparent)]
    Coordinator(#[from] cse_dispatch::config::ConfigError),
    /// Both subsystems must agree on the local identity.
    #[error("federation and coordinator disagree on the local CSE: {federation} vs {coordinator}")]
    CseIdMismatch {
        federation: String,
        coordinator: String,
    },
}

impl NodeConfig {
    /// A node with the given identity, consistent across both subsystems.
    #[must_use]
    pub fn with_identity(cse_id: &str, cse_base_ri: &str, cse_base_rn: &str) -> Self {
        let mut config = Self::default();
        config.federation.cse_id = cse_id.to_string();
        config.federation.cse_base_ri = cse_base_ri.to_string();
        config.federation.cse_base_rn = cse_base_rn.to_string();
        config.coordinator.cse_id = cse_id.to_string();
        config.coordinator.cse_base_ri = cse_base_ri.to_string();
        config.coordinator.cse_base_rn = cse_base_rn.to_string();
        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), NodeConfigError> {
        self.federation.validate()?;
        self.coordinator.validate()?;
        if self.federation.cse_id != self.coordinator.cse_id
            || self.federation.cse_base_ri != self.coordinator.cse_base_ri
        {
            return Err(NodeConfigError::CseIdMismatch {
                federation: self.federation.cse_id.clone(),
                coordinator: self.coordinator.cse_id.clone(),
            });
        }
        Ok(())
    }
}
