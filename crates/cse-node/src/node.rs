//! Node wiring and lifecycle.

use crate::config::{NodeConfig, NodeConfigError};
use anyhow::Context;
use cse_bus::InMemoryEventBus;
use cse_dispatch::{ExpirationSweeper, RegistrationHooks, RequestCoordinator};
use cse_federation::FederationManager;
use cse_scheduler::Scheduler;
use cse_types::{
    attr, now_timestamp, CseError, LocalExecutor, Notifier, Resource, ResourceStore, ResourceType,
    Transport,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber, filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// One wired CSE node.
///
/// The embedder supplies the four collaborator ports; the node owns the
/// bus, the scheduler, and the subsystem services built on top of them.
pub struct CseNode {
    config: NodeConfig,
    store: Arc<dyn ResourceStore>,
    bus: Arc<InMemoryEventBus>,
    scheduler: Arc<Scheduler>,
    federation: Arc<FederationManager>,
    coordinator: Arc<RequestCoordinator>,
    hooks: Arc<RegistrationHooks>,
    sweeper: Arc<ExpirationSweeper>,
}

impl CseNode {
    /// Wire a node from its configuration and ports.
    pub fn new(
        config: NodeConfig,
        store: Arc<dyn ResourceStore>,
        executor: Arc<dyn LocalExecutor>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, NodeConfigError> {
        config.validate()?;

        let bus = Arc::new(InMemoryEventBus::new());
        let scheduler = Arc::new(Scheduler::new());
        let federation = Arc::new(FederationManager::new(
            config.federation.clone(),
            store.clone(),
            transport.clone(),
            bus.clone(),
        ));
        let hooks = Arc::new(RegistrationHooks::new(store.clone(), federation.clone()));
        let coordinator = Arc::new(RequestCoordinator::new(
            config.coordinator.clone(),
            federation.clone(),
            executor,
            store.clone(),
            transport,
            notifier,
            scheduler.clone(),
        ));
        let sweeper = Arc::new(ExpirationSweeper::new(
            store.clone(),
            hooks.clone(),
            bus.clone(),
            config.coordinator.sweep_interval,
        ));

        Ok(Self {
            config,
            store,
            bus,
            scheduler,
            federation,
            coordinator,
            hooks,
            sweeper,
        })
    }

    /// Start the node: seed the `<CSEBase>` if missing, then spawn the
    /// connection monitor and the expiration sweep.
    pub async fn start(&self) -> anyhow::Result<()> {
        info!(cse_id = %self.config.federation.cse_id, "starting CSE node");
        self.ensure_cse_base()
            .await
            .context("initializing the CSE base")?;
        self.federation.spawn_monitor(&self.scheduler).await;
        self.sweeper.spawn(&self.scheduler).await;
        info!("CSE node running");
        Ok(())
    }

    /// Stop every scheduled worker and actor, joining in-flight work.
    pub async fn shutdown(&self) {
        info!(cse_id = %self.config.federation.cse_id, "shutting down CSE node");
        self.scheduler.shutdown().await;
        info!("shutdown complete");
    }

    async fn ensure_cse_base(&self) -> Result<(), CseError> {
        let federation = &self.config.federation;
        if self.store.retrieve(&federation.cse_base_ri).await.is_ok() {
            return Ok(());
        }
        let now = now_timestamp();
        let base = Resource::new(
            ResourceType::CseBase,
            federation.cse_base_ri.clone(),
            federation.cse_base_rn.clone(),
            None,
        )
        .with_attr(attr::CSI, federation.cse_id.clone())
        .with_attr(attr::POA, json!(federation.points_of_access))
        .with_attr(attr::CT, now.clone())
        .with_attr(attr::LT, now);
        info!(ri = %base.ri, "created CSE base");
        self.store.create(base).await.map(|_| ())
    }

    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<RequestCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn federation(&self) -> &Arc<FederationManager> {
        &self.federation
    }

    #[must_use]
    pub fn hooks(&self) -> &Arc<RegistrationHooks> {
        &self.hooks
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    #[must_use]
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cse_types::testing::{
        InMemoryResourceStore, RecordingNotifier, RecordingTransport, ScriptedExecutor,
    };
    use cse_types::{CseRequest, Operation};

    fn node() -> (CseNode, Arc<InMemoryResourceStore>) {
        let store = Arc::new(InMemoryResourceStore::new());
        let node = CseNode::new(
            NodeConfig::default(),
            store.clone(),
            Arc::new(ScriptedExecutor::new()),
            Arc::new(RecordingTransport::new()),
            Arc::new(RecordingNotifier::new()),
        )
        .unwrap();
        (node, store)
    }

    #[tokio::test]
    async fn start_seeds_the_base_and_spawns_the_workers() {
        let (node, store) = node();
        node.start().await.unwrap();

        let base = store.retrieve("cse-in").await.unwrap();
        assert_eq!(base.ty, ResourceType::CseBase);
        assert_eq!(base.attr_str(attr::CSI), Some("/id-in"));

        let scheduler = node.scheduler();
        assert!(scheduler.is_running(cse_federation::manager::MONITOR_WORKER).await);
        assert!(scheduler.is_running(cse_dispatch::sweeper::SWEEP_WORKER).await);

        node.shutdown().await;
        assert_eq!(scheduler.active_count().await, 0);
    }

    #[tokio::test]
    async fn starting_twice_keeps_the_existing_base() {
        let (node, store) = node();
        node.start().await.unwrap();
        let before = store.retrieve("cse-in").await.unwrap();
        node.start().await.unwrap();
        assert_eq!(store.retrieve("cse-in").await.unwrap(), before);
        node.shutdown().await;
    }

    #[tokio::test]
    async fn a_wired_node_handles_requests() {
        let (node, _store) = node();
        node.start().await.unwrap();

        let request = CseRequest::new(Operation::Retrieve, "someAe", "CmyAe");
        let envelope = node.coordinator().handle(&request).await;
        assert!(envelope.ok());

        node.shutdown().await;
    }

    #[test]
    fn invalid_configuration_is_rejected_at_wiring() {
        let mut config = NodeConfig::default();
        config.coordinator.cse_id = "/id-other".into();
        let result = CseNode::new(
            config,
            Arc::new(InMemoryResourceStore::new()),
            Arc::new(ScriptedExecutor::new()),
            Arc::new(RecordingTransport::new()),
            Arc::new(RecordingNotifier::new()),
        );
        assert!(matches!(result, Err(NodeConfigError::CseIdMismatch { .. })));
    }
}
