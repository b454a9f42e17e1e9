//! # Federation Manager Service
//!
//! Owns the federation table and the registrar relationship. All table
//! mutations go through this type; every read-modify-write sequence holds
//! the single table-wide lock for its whole duration, and I/O (upstream
//! propagation, store access) happens strictly outside the lock.

use crate::config::{FederationConfig, RegistrarConfig};
use crate::domain::table::FederationTable;
use crate::error::FederationError;
use cse_bus::{CseEvent, EventPublisher};
use cse_scheduler::Scheduler;
use cse_types::{Operation, RemoteCseLink, ResourceStore, Transport};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the scheduler worker driving [`FederationManager::run_monitor_once`].
pub const MONITOR_WORKER: &str = "federation.monitor";

/// Registrar relationship states.
///
/// `Unregistered → AttemptingRegistration → Registered → (Stale →
/// AttemptingRegistration)`; teardown returns to `Unregistered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    AttemptingRegistration,
    Registered,
    Stale,
}

pub(crate) struct RegistrarState {
    pub state: RegistrationState,
    pub link: Option<RemoteCseLink>,
}

/// Tracks the local CSE's registrar and registree links and resolves
/// arbitrary CSE-IDs to a forwarding link.
pub struct FederationManager {
    pub(crate) config: FederationConfig,
    pub(crate) table: Mutex<FederationTable>,
    pub(crate) registrar: Mutex<RegistrarState>,
    pub(crate) store: Arc<dyn ResourceStore>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) bus: Arc<dyn EventPublisher>,
}

impl FederationManager {
    #[must_use]
    pub fn new(
        config: FederationConfig,
        store: Arc<dyn ResourceStore>,
        transport: Arc<dyn Transport>,
        bus: Arc<dyn EventPublisher>,
    ) -> Self {
        let table = FederationTable::new(config.cse_id.clone());
        Self {
            config,
            table: Mutex::new(table),
            registrar: Mutex::new(RegistrarState {
                state: RegistrationState::Unregistered,
                link: None,
            }),
            store,
            transport,
            bus,
        }
    }

    /// CSE-ID of the local node.
    #[must_use]
    pub fn local_cse_id(&self) -> &str {
        &self.config.cse_id
    }

    #[must_use]
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Current registrar relationship state.
    #[must_use]
    pub fn registration_state(&self) -> RegistrationState {
        self.registrar.lock().state
    }

    /// Link to the registrar, once registered.
    #[must_use]
    pub fn registrar_link(&self) -> Option<RemoteCseLink> {
        self.registrar.lock().link.clone()
    }

    /// Resolve a CSE-ID to the nearest concrete link.
    ///
    /// Unknown CSE-IDs fall back to the registrar link when one is
    /// registered: everything not below this node lives somewhere above it
    /// in the registration tree.
    pub fn get_link(&self, cse_id: &str) -> Result<RemoteCseLink, FederationError> {
        let resolved = self.table.lock().resolve(cse_id);
        match resolved {
            Ok(link) => Ok(link),
            Err(FederationError::UnknownCse(_)) => {
                let registrar = self.registrar.lock();
                match (&registrar.state, &registrar.link) {
                    (RegistrationState::Registered | RegistrationState::Stale, Some(link))
                        if link.first_point_of_access().is_some() =>
                    {
                        debug!(cse_id, via = %link.cse_id, "routing unknown CSE-ID via registrar");
                        Ok(link.clone())
                    }
                    _ => Err(FederationError::UnknownCse(cse_id.to_string())),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Every CSE-ID currently known below this node.
    #[must_use]
    pub fn known_descendants(&self) -> Vec<String> {
        self.table.lock().aggregate_descendants()
    }

    /// A downstream CSE registered here (CSR created).
    pub async fn on_registree_registered(&self, link: RemoteCseLink) {
        info!(cse_id = %link.cse_id, descendants = link.descendant_cse_ids.len(),
            "registree registered");
        self.table.lock().insert_registree(link.clone());
        self.bus.publish(CseEvent::RegistreeRegistered(link)).await;
        self.push_descendants_upstream().await;
    }

    /// A downstream CSE deregistered (CSR deleted or liveliness failure).
    pub async fn on_registree_deregistered(&self, cse_id: &str) {
        let removed = self.table.lock().remove_subtree(cse_id);
        if removed.is_empty() {
            debug!(cse_id, "deregistration for unknown registree ignored");
            return;
        }
        info!(cse_id, removed = removed.len(), "registree deregistered");
        self.bus
            .publish(CseEvent::RegistreeDeregistered {
                cse_id: cse_id.to_string(),
            })
            .await;
        self.push_descendants_upstream().await;
    }

    /// A downstream CSE refreshed its registration (new descendant list).
    pub async fn on_registree_updated(&self, cse_id: &str, descendants: &[String]) {
        {
            let mut table = self.table.lock();
            if !table.contains(cse_id) {
                debug!(cse_id, "update for unknown registree ignored");
                return;
            }
            table.replace_descendants(cse_id, descendants);
        }
        info!(cse_id, descendants = descendants.len(), "registree updated");
        self.bus
            .publish(CseEvent::RegistreeUpdated {
                cse_id: cse_id.to_string(),
                descendant_cse_ids: descendants.to_vec(),
            })
            .await;
        self.push_descendants_upstream().await;
    }

    /// Register the connection monitor with the scheduler.
    pub async fn spawn_monitor(self: &Arc<Self>, scheduler: &Scheduler) {
        let manager = Arc::clone(self);
        scheduler
            .start_worker(
                MONITOR_WORKER,
                self.config.monitor_interval,
                true,
                move || {
                    let manager = Arc::clone(&manager);
                    async move {
                        manager.run_monitor_once().await;
                        true
                    }
                },
            )
            .await;
    }

    /// Push the refreshed aggregate descendant list into the self `<CSR>`
    /// on the registrar. Failures are absorbed; the monitor re-synchronizes
    /// on its next tick.
    pub(crate) async fn push_descendants_upstream(&self) {
        let Some(registrar) = self.config.registrar.clone() else {
            return;
        };
        if self.registration_state() != RegistrationState::Registered {
            return;
        }
        let descendants = self.known_descendants();
        let count = descendants.len();
        let content = json!({
            "dcse": descendants,
            "poa": self.config.points_of_access,
            "lt": cse_types::now_timestamp(),
        });
        let result = self
            .transport
            .send(
                Operation::Update,
                &self.own_csr_url(&registrar),
                &self.config.cse_id,
                Some(&content),
                &BTreeMap::new(),
            )
            .await;
        if result.ok() {
            debug!(descendants = count, "pushed descendant list upstream");
        } else {
            warn!(rsc = ?result.rsc, "failed to push descendant list upstream");
        }
    }

    /// URL of the registrar's `<CSEBase>`.
    pub(crate) fn registrar_base_url(&self, registrar: &RegistrarConfig) -> String {
        format!("{}/~{}", registrar.address, registrar.cse_id)
    }

    /// URL of the local CSE's own `<CSR>` hosted on the registrar.
    pub(crate) fn own_csr_url(&self, registrar: &RegistrarConfig) -> String {
        format!(
            "{}/~{}/{}",
            registrar.address,
            registrar.cse_id,
            self.config.cse_id.trim_start_matches('/')
        )
    }

    /// Resource id under which the registrar's mirror `<CSR>` is stored
    /// locally.
    pub(crate) fn registrar_mirror_ri(&self, registrar: &RegistrarConfig) -> String {
        registrar.cse_id.trim_start_matches('/').to_string()
    }

    /// The `<CSR>` representation of the local CSE pushed to the registrar.
    pub(crate) fn own_csr_representation(&self) -> serde_json::Value {
        json!({
            "ty": cse_types::ResourceType::Csr.type_id(),
            "ri": self.config.cse_id.trim_start_matches('/'),
            "rn": self.config.cse_base_rn,
            "csi": self.config.cse_id,
            "cb": self.config.cse_base_address(),
            "poa": self.config.points_of_access,
            "dcse": self.known_descendants(),
            "rr": true,
            "lt": cse_types::now_timestamp(),
        })
    }
}
