//! # Federation and Lifecycle Events
//!
//! Everything the core announces to the rest of the node. Subscribers must
//! tolerate events for state they have never seen (a registree may register
//! and expire between two polls of a slow consumer).

use cse_types::{RemoteCseLink, ResourceType};
use serde::{Deserialize, Serialize};

/// All events published to the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CseEvent {
    /// The local CSE completed registration at its registrar.
    RegistrarRegistered(RemoteCseLink),

    /// The registrar relationship was torn down (remote mirror vanished or
    /// explicit deregistration).
    RegistrarDeregistered(RemoteCseLink),

    /// A downstream CSE registered here.
    RegistreeRegistered(RemoteCseLink),

    /// A downstream CSE deregistered, or failed its liveliness check.
    RegistreeDeregistered {
        /// CSE-ID of the removed registree.
        cse_id: String,
    },

    /// A registree updated its registration (new descendant list).
    RegistreeUpdated {
        /// CSE-ID of the updated registree.
        cse_id: String,
        /// The registree's refreshed descendant list.
        descendant_cse_ids: Vec<String>,
    },

    /// A resource passed its expiration time and was removed by the sweep.
    ResourceExpired {
        /// Resource id of the expired resource.
        ri: String,
        /// Type of the expired resource.
        ty: ResourceType,
    },
}

impl CseEvent {
    /// Short name used in log lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RegistrarRegistered(_) => "registrar_registered",
            Self::RegistrarDeregistered(_) => "registrar_deregistered",
            Self::RegistreeRegistered(_) => "registree_registered",
            Self::RegistreeDeregistered { .. } => "registree_deregistered",
            Self::RegistreeUpdated { .. } => "registree_updated",
            Self::ResourceExpired { .. } => "resource_expired",
        }
    }
}
