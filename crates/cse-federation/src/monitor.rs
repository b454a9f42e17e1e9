//! # Connection Monitor
//!
//! One reconciliation pass per scheduler tick: registrar bootstrap or drift
//! sync, then registree liveliness. Every failure is absorbed and retried on
//! the next tick; nothing here surfaces synchronously to a caller.

use crate::config::RegistrarConfig;
use crate::manager::{FederationManager, RegistrarState, RegistrationState};
use cse_bus::CseEvent;
use cse_types::{
    attr, now_timestamp, Operation, RemoteCseLink, Resource, ResourceType, ResponseStatusCode,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

impl FederationManager {
    /// One monitor pass. Driven by the scheduler worker registered in
    /// [`FederationManager::spawn_monitor`]; also callable directly in tests.
    pub async fn run_monitor_once(&self) {
        if let Some(registrar) = self.config.registrar.clone() {
            self.reconcile_registrar(&registrar).await;
        }
        if self.config.liveliness_enabled {
            self.check_registrees().await;
        }
    }

    /// Reconcile the upstream relationship: bootstrap when the local mirror
    /// of the registrar is missing, otherwise dirty-check both directions.
    async fn reconcile_registrar(&self, registrar: &RegistrarConfig) {
        let mirror_ri = self.registrar_mirror_ri(registrar);
        match self.store.retrieve(&mirror_ri).await {
            Err(_) => self.bootstrap_registration(registrar).await,
            Ok(mirror) => self.synchronize_registration(registrar, mirror).await,
        }
    }

    /// Full bootstrap: create our `<CSR>` on the registrar (an existing one
    /// counts as success), mirror the registrar's base locally, announce.
    async fn bootstrap_registration(&self, registrar: &RegistrarConfig) {
        self.set_registrar_state(RegistrationState::AttemptingRegistration, None);

        let own_csr = self.own_csr_representation();
        let created = self
            .transport
            .send(
                Operation::Create,
                &self.registrar_base_url(registrar),
                &self.config.cse_id,
                Some(&own_csr),
                &BTreeMap::new(),
            )
            .await;
        let already_there = matches!(
            created.rsc,
            ResponseStatusCode::Conflict | ResponseStatusCode::OriginatorHasAlreadyRegistered
        );
        if !created.ok() && !already_there {
            warn!(registrar = %registrar.cse_id, rsc = ?created.rsc,
                "CSR creation on registrar failed, retrying next tick");
            return;
        }

        let base = self
            .transport
            .send(
                Operation::Retrieve,
                &self.registrar_base_url(registrar),
                &self.config.cse_id,
                None,
                &BTreeMap::new(),
            )
            .await;
        if !base.ok() {
            warn!(registrar = %registrar.cse_id, rsc = ?base.rsc,
                "registrar base retrieval failed, retrying next tick");
            return;
        }

        let mirror = self.build_registrar_mirror(registrar, base.content.as_ref());
        let stored = match self.store.create(mirror.clone()).await {
            Ok(stored) => stored,
            Err(cse_types::CseError::Conflict(_)) => match self.store.update(mirror).await {
                Ok(stored) => stored,
                Err(err) => {
                    warn!(error = %err, "storing registrar mirror failed");
                    return;
                }
            },
            Err(err) => {
                warn!(error = %err, "storing registrar mirror failed");
                return;
            }
        };

        let Some(link) = RemoteCseLink::from_csr(&stored) else {
            warn!(ri = %stored.ri, "registrar mirror is not a usable CSR");
            return;
        };
        info!(registrar = %registrar.cse_id, "registered at registrar");
        self.set_registrar_state(RegistrationState::Registered, Some(link.clone()));
        self.bus.publish(CseEvent::RegistrarRegistered(link)).await;
    }

    /// Registered steady state: probe our `<CSR>` on the registrar, tear
    /// down when it vanished, otherwise push/pull whichever side is stale.
    async fn synchronize_registration(&self, registrar: &RegistrarConfig, mirror: Resource) {
        let probe = self
            .transport
            .send(
                Operation::Retrieve,
                &self.own_csr_url(registrar),
                &self.config.cse_id,
                None,
                &BTreeMap::new(),
            )
            .await;

        if probe.rsc == ResponseStatusCode::NotFound {
            // Our registration vanished remotely; drop local state and start
            // over on the next tick.
            info!(registrar = %registrar.cse_id, "remote CSR vanished, tearing down registration");
            if let Err(err) = self.store.delete(&mirror.ri).await {
                debug!(error = %err, "registrar mirror already gone");
            }
            let link = self
                .registrar_link()
                .or_else(|| RemoteCseLink::from_csr(&mirror));
            self.set_registrar_state(RegistrationState::Unregistered, None);
            if let Some(link) = link {
                self.bus.publish(CseEvent::RegistrarDeregistered(link)).await;
            }
            return;
        }
        if !probe.ok() {
            warn!(registrar = %registrar.cse_id, rsc = ?probe.rsc,
                "registrar probe failed, retrying next tick");
            return;
        }

        // A restart may leave a persisted mirror with no in-memory link.
        if self.registrar_link().is_none() {
            if let Some(link) = RemoteCseLink::from_csr(&mirror) {
                self.set_registrar_state(RegistrationState::Registered, Some(link));
            }
        }

        self.push_if_local_newer(registrar, probe.content.as_ref()).await;
        self.pull_if_remote_newer(registrar, mirror).await;
    }

    /// Push our `<CSR>` upstream when the local base changed after the
    /// remote copy was last written.
    async fn push_if_local_newer(&self, registrar: &RegistrarConfig, remote_csr: Option<&Value>) {
        let remote_lt = remote_csr
            .and_then(|v| v.get(attr::LT))
            .and_then(Value::as_str)
            .map(str::to_string);
        let local_lt = match self.store.retrieve(&self.config.cse_base_ri).await {
            Ok(base) => base.last_modified().map(str::to_string),
            Err(err) => {
                warn!(error = %err, "local CSE base unavailable for drift check");
                return;
            }
        };
        let stale = match (&local_lt, &remote_lt) {
            (Some(local), Some(remote)) => local > remote,
            (Some(_), None) => true,
            _ => false,
        };
        if !stale {
            return;
        }

        debug!(registrar = %registrar.cse_id, "remote CSR stale, pushing update");
        self.set_registrar_state_only(RegistrationState::Stale);
        let content = json!({
            "poa": self.config.points_of_access,
            "dcse": self.known_descendants(),
            "lt": local_lt,
        });
        let updated = self
            .transport
            .send(
                Operation::Update,
                &self.own_csr_url(registrar),
                &self.config.cse_id,
                Some(&content),
                &BTreeMap::new(),
            )
            .await;
        if updated.ok() {
            self.set_registrar_state_only(RegistrationState::Registered);
        } else {
            warn!(rsc = ?updated.rsc, "pushing stale CSR upstream failed, retrying next tick");
        }
    }

    /// Refresh the local mirror when the registrar's base changed after the
    /// mirror was last written.
    async fn pull_if_remote_newer(&self, registrar: &RegistrarConfig, mirror: Resource) {
        let base = self
            .transport
            .send(
                Operation::Retrieve,
                &self.registrar_base_url(registrar),
                &self.config.cse_id,
                None,
                &BTreeMap::new(),
            )
            .await;
        if !base.ok() {
            warn!(rsc = ?base.rsc, "registrar base retrieval failed during drift check");
            return;
        }
        let remote_lt = base
            .content
            .as_ref()
            .and_then(|v| v.get(attr::LT))
            .and_then(Value::as_str);
        let stale = match (mirror.last_modified(), remote_lt) {
            (Some(local), Some(remote)) => remote > local,
            (None, Some(_)) => true,
            _ => false,
        };
        if !stale {
            return;
        }

        debug!(registrar = %registrar.cse_id, "local mirror stale, pulling registrar base");
        let refreshed = self.build_registrar_mirror(registrar, base.content.as_ref());
        match self.store.update(refreshed).await {
            Ok(stored) => {
                if let Some(link) = RemoteCseLink::from_csr(&stored) {
                    self.set_registrar_state(RegistrationState::Registered, Some(link));
                }
            }
            Err(err) => warn!(error = %err, "updating registrar mirror failed"),
        }
    }

    /// Probe every direct registree for our own `<CSR>` mirror on their
    /// side; a failed probe removes the registree and its whole subtree.
    async fn check_registrees(&self) {
        let links = self.table.lock().direct_links();
        for link in links {
            let Some(poa) = link.first_point_of_access() else {
                warn!(cse_id = %link.cse_id, "registree has no point of access, removing");
                self.drop_registree(&link).await;
                continue;
            };
            let url = format!(
                "{}/~{}/{}",
                poa,
                link.cse_id,
                self.config.cse_id.trim_start_matches('/')
            );
            let probe = self
                .transport
                .send(
                    Operation::Retrieve,
                    &url,
                    &self.config.cse_id,
                    None,
                    &BTreeMap::new(),
                )
                .await;
            if probe.ok() {
                debug!(cse_id = %link.cse_id, "registree alive");
            } else {
                info!(cse_id = %link.cse_id, rsc = ?probe.rsc,
                    "registree liveliness check failed, removing");
                self.drop_registree(&link).await;
            }
        }
    }

    async fn drop_registree(&self, link: &RemoteCseLink) {
        if let Err(err) = self.store.delete(&link.resource_id).await {
            debug!(error = %err, "registree CSR already gone from store");
        }
        self.on_registree_deregistered(&link.cse_id).await;
    }

    /// Build the local `<CSR>` mirror of the registrar from its retrieved
    /// base representation (absent fields fall back to configuration).
    fn build_registrar_mirror(
        &self,
        registrar: &RegistrarConfig,
        base: Option<&Value>,
    ) -> Resource {
        let poa = base
            .and_then(|v| v.get(attr::POA))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|poa| !poa.is_empty())
            .unwrap_or_else(|| vec![registrar.address.clone()]);
        let lt = base
            .and_then(|v| v.get(attr::LT))
            .and_then(Value::as_str)
            .map_or_else(now_timestamp, str::to_string);

        Resource::new(
            ResourceType::Csr,
            self.registrar_mirror_ri(registrar),
            registrar.cse_base_rn.clone(),
            Some(self.config.cse_base_ri.clone()),
        )
        .with_attr(attr::CSI, registrar.cse_id.clone())
        .with_attr(
            attr::CB,
            format!("{}/{}", registrar.cse_id, registrar.cse_base_rn),
        )
        .with_attr(attr::POA, json!(poa))
        .with_attr(attr::LT, lt)
    }

    fn set_registrar_state(&self, state: RegistrationState, link: Option<RemoteCseLink>) {
        let mut registrar = self.registrar.lock();
        *registrar = RegistrarState { state, link };
    }

    fn set_registrar_state_only(&self, state: RegistrationState) {
        self.registrar.lock().state = state;
    }
}
