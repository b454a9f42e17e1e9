//! Test doubles with real semantics: a store-backed executor that runs the
//! registration hooks, and a transport that bridges coordinators in-process
//! so multi-CSE scenarios run without a network.

use async_trait::async_trait;
use cse_dispatch::{RegistrationHooks, RequestCoordinator};
use cse_types::{
    attr, CseRequest, FilterCriteria, FilterUsage, LocalExecutor, Operation, RequestStatus,
    Resource, ResourceAddress, ResourceStore, ResourceType, ResponseStatusCode, ResultEnvelope,
    Transport,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A [`LocalExecutor`] performing actual CRUD against a store, with the
/// registration hooks applied around every write.
///
/// Target paths address resources by their id: the last path segment is the
/// resource id, an empty path the CSE base. That is all the multi-CSE
/// scenarios need.
pub struct StoreExecutor {
    store: Arc<dyn ResourceStore>,
    hooks: Arc<RegistrationHooks>,
    cse_base_ri: String,
}

impl StoreExecutor {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        hooks: Arc<RegistrationHooks>,
        cse_base_ri: impl Into<String>,
    ) -> Self {
        Self {
            store,
            hooks,
            cse_base_ri: cse_base_ri.into(),
        }
    }

    fn target_ri(&self, to: &str) -> Result<String, cse_types::CseError> {
        let address = ResourceAddress::parse(to)?;
        let segment = address.path().rsplit('/').next().unwrap_or_default();
        if segment.is_empty() {
            Ok(self.cse_base_ri.clone())
        } else {
            Ok(segment.to_string())
        }
    }

    async fn create(&self, request: &CseRequest, parent_ri: String) -> ResultEnvelope {
        let rqi = request.request_identifier.clone();
        let (Some(ty), Some(content)) = (request.resource_type, request.content.as_ref()) else {
            return ResultEnvelope::error(ResponseStatusCode::BadRequest, rqi, "incomplete CREATE");
        };
        let Some(rn) = content.get("rn").and_then(Value::as_str) else {
            return ResultEnvelope::error(ResponseStatusCode::BadRequest, rqi, "rn required");
        };

        let mut resource = Resource::new(ty, rn, rn, Some(parent_ri));
        if let Some(map) = content.as_object() {
            for (key, value) in map {
                if !matches!(key.as_str(), "ty" | "ri" | "rn" | "pi") {
                    resource.set_attr(key, value.clone());
                }
            }
            if let Some(ri) = map.get("ri").and_then(Value::as_str) {
                resource.ri = ri.to_string();
            }
        }

        match self
            .hooks
            .on_resource_will_be_created(&mut resource, &request.originator)
            .await
        {
            Ok(_originator) => {}
            Err(err) => return ResultEnvelope::error(err.status_code(), rqi, err.to_string()),
        }
        if let Err(err) = self.store.create(resource.clone()).await {
            return ResultEnvelope::from_error(&err, rqi);
        }
        self.hooks.on_resource_created(&resource).await;
        ResultEnvelope::success(ResponseStatusCode::Created, rqi, Some(resource.to_value()))
    }

    async fn update(&self, request: &CseRequest, ri: String) -> ResultEnvelope {
        let rqi = request.request_identifier.clone();
        let Some(content) = request.content.as_ref() else {
            return ResultEnvelope::error(ResponseStatusCode::BadRequest, rqi, "content required");
        };
        let mut resource = match self.store.retrieve(&ri).await {
            Ok(resource) => resource,
            Err(err) => return ResultEnvelope::from_error(&err, rqi),
        };
        if let Some(map) = content.as_object() {
            for (key, value) in map {
                if !matches!(key.as_str(), "ty" | "ri" | "rn" | "pi") {
                    resource.set_attr(key, value.clone());
                }
            }
        }
        if let Err(err) = self.store.update(resource.clone()).await {
            return ResultEnvelope::from_error(&err, rqi);
        }
        self.hooks.on_resource_updated(&resource).await;
        ResultEnvelope::success(ResponseStatusCode::Updated, rqi, Some(resource.to_value()))
    }

    async fn delete(&self, request: &CseRequest, ri: String) -> ResultEnvelope {
        let rqi = request.request_identifier.clone();
        let resource = match self.store.retrieve(&ri).await {
            Ok(resource) => resource,
            Err(err) => return ResultEnvelope::from_error(&err, rqi),
        };
        if let Err(err) = self
            .hooks
            .on_resource_will_be_deleted(&resource, &request.originator)
        {
            return ResultEnvelope::error(err.status_code(), rqi, err.to_string());
        }
        if let Err(err) = self.store.delete(&ri).await {
            return ResultEnvelope::from_error(&err, rqi);
        }
        self.hooks.on_resource_deleted(&resource).await;
        ResultEnvelope::success(ResponseStatusCode::Deleted, rqi, None)
    }
}

#[async_trait]
impl LocalExecutor for StoreExecutor {
    async fn process(&self, op: Operation, request: &CseRequest) -> ResultEnvelope {
        let rqi = request.request_identifier.clone();
        let target = match self.target_ri(&request.to) {
            Ok(target) => target,
            Err(err) => return ResultEnvelope::from_error(&err, rqi),
        };
        match op {
            Operation::Create => self.create(request, target).await,
            Operation::Retrieve | Operation::Discovery => {
                match self.store.retrieve(&target).await {
                    Ok(resource) => ResultEnvelope::success(
                        ResponseStatusCode::Ok,
                        rqi,
                        Some(resource.to_value()),
                    ),
                    Err(err) => ResultEnvelope::from_error(&err, rqi),
                }
            }
            Operation::Update => self.update(request, target).await,
            Operation::Delete => self.delete(request, target).await,
            Operation::Notify => ResultEnvelope::success(ResponseStatusCode::Ok, rqi, None),
        }
    }
}

/// A [`Transport`] delivering forwarded requests straight into the
/// coordinator registered for the matching point of access.
#[derive(Default)]
pub struct BridgeTransport {
    routes: Mutex<Vec<(String, Arc<RequestCoordinator>)>>,
}

impl BridgeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every URL under `poa` into `coordinator`.
    pub fn connect(&self, poa: &str, coordinator: Arc<RequestCoordinator>) {
        self.routes.lock().push((poa.to_string(), coordinator));
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn send(
        &self,
        op: Operation,
        url: &str,
        originator: &str,
        content: Option<&Value>,
        params: &BTreeMap<String, String>,
    ) -> ResultEnvelope {
        let route = self
            .routes
            .lock()
            .iter()
            .find(|(poa, _)| url.starts_with(poa.as_str()))
            .cloned();
        let Some((poa, coordinator)) = route else {
            return ResultEnvelope::error(
                ResponseStatusCode::TargetNotReachable,
                "",
                format!("no route to {url}"),
            );
        };
        let Some(to) = url[poa.len()..].strip_prefix("/~") else {
            return ResultEnvelope::error(
                ResponseStatusCode::BadRequest,
                "",
                format!("unsupported url: {url}"),
            );
        };

        let mut request = CseRequest::new(op, to, originator);
        if let Some(content) = content {
            request.resource_type = content
                .get("ty")
                .and_then(Value::as_u64)
                .and_then(|ty| u16::try_from(ty).ok())
                .map(ResourceType::from_type_id);
            request.content = Some(content.clone());
        }
        let mut criteria = FilterCriteria::default();
        for (key, value) in params {
            match (key.as_str(), value.as_str()) {
                ("fu", "1") => criteria.filter_usage = Some(FilterUsage::DiscoveryCriteria),
                ("fu", "2") => criteria.filter_usage = Some(FilterUsage::ConditionalRetrieval),
                _ => {
                    criteria.attributes.insert(key.clone(), value.clone());
                }
            }
        }
        request.filter_criteria = criteria;

        coordinator.handle(&request).await
    }
}

/// One fully wired CSE over in-memory ports, addressable through a
/// [`BridgeTransport`].
pub struct TestCse {
    pub store: Arc<cse_types::testing::InMemoryResourceStore>,
    pub federation: Arc<cse_federation::FederationManager>,
    pub hooks: Arc<RegistrationHooks>,
    pub coordinator: Arc<RequestCoordinator>,
    pub notifier: Arc<cse_types::testing::RecordingNotifier>,
    pub bus: Arc<cse_bus::InMemoryEventBus>,
    pub scheduler: Arc<cse_scheduler::Scheduler>,
}

/// Build a CSE and connect it to the bridge under its first point of access.
pub fn test_cse(
    cse_id: &str,
    base_ri: &str,
    poa: &str,
    bridge: &Arc<BridgeTransport>,
    registrar: Option<cse_federation::RegistrarConfig>,
) -> TestCse {
    let store = Arc::new(cse_types::testing::InMemoryResourceStore::new());
    store.seed(cse_base(cse_id, base_ri, &[poa]));
    let bus = Arc::new(cse_bus::InMemoryEventBus::new());
    let scheduler = Arc::new(cse_scheduler::Scheduler::new());
    let notifier = Arc::new(cse_types::testing::RecordingNotifier::new());

    let mut federation_config = cse_federation::FederationConfig::default();
    federation_config.cse_id = cse_id.to_string();
    federation_config.cse_base_ri = base_ri.to_string();
    federation_config.cse_base_rn = base_ri.to_string();
    federation_config.points_of_access = vec![poa.to_string()];
    federation_config.registrar = registrar;
    // Liveliness probing is exercised separately; keep scenarios deterministic.
    federation_config.liveliness_enabled = false;
    let federation = Arc::new(cse_federation::FederationManager::new(
        federation_config,
        store.clone(),
        bridge.clone(),
        bus.clone(),
    ));
    let hooks = Arc::new(RegistrationHooks::new(store.clone(), federation.clone()));
    let executor = Arc::new(StoreExecutor::new(store.clone(), hooks.clone(), base_ri));

    let mut coordinator_config = cse_dispatch::CoordinatorConfig::default();
    coordinator_config.cse_id = cse_id.to_string();
    coordinator_config.cse_base_ri = base_ri.to_string();
    coordinator_config.cse_base_rn = base_ri.to_string();
    let coordinator = Arc::new(RequestCoordinator::new(
        coordinator_config,
        federation.clone(),
        executor,
        store.clone(),
        bridge.clone(),
        notifier.clone(),
        scheduler.clone(),
    ));
    bridge.connect(poa, coordinator.clone());

    TestCse {
        store,
        federation,
        hooks,
        coordinator,
        notifier,
        bus,
        scheduler,
    }
}

/// Wait until the `<request>` resource reaches a terminal status.
pub async fn await_request_completion<S: ResourceStore + ?Sized>(
    store: &S,
    request_ri: &str,
) -> Resource {
    for _ in 0..100 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        if let Ok(resource) = store.retrieve(request_ri).await {
            if resource
                .request_status()
                .is_some_and(RequestStatus::is_terminal)
            {
                return resource;
            }
        }
    }
    panic!("request {request_ri} never reached a terminal status");
}

/// The `<CSEBase>` resource of a node, as seeded on startup.
pub fn cse_base(cse_id: &str, ri: &str, poa: &[&str]) -> Resource {
    Resource::new(ResourceType::CseBase, ri, ri, None)
        .with_attr(attr::CSI, cse_id)
        .with_attr(attr::POA, serde_json::json!(poa))
        .with_attr(attr::LT, cse_types::now_timestamp())
}
