//! # Request Coordination
//!
//! `handle` is the single entry point for admitted request primitives. It
//! guards the CSE base, validates content expectations, decides between
//! transit forwarding and local execution, and runs the non-blocking
//! `<request>` lifecycle through the scheduler.

use crate::config::{CoordinatorConfig, FlexBlockingPolicy};
use cse_federation::{FederationError, FederationManager};
use cse_scheduler::Scheduler;
use cse_types::{
    attr, now_timestamp, CseRequest, LocalExecutor, Notifier, Operation, RequestStatus, Resource,
    ResourceAddress, ResourceFilter, ResourceStore, ResourceType, ResponseStatusCode,
    ResponseType, ResultEnvelope, Transport,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Coordinates request handling for one CSE.
pub struct RequestCoordinator {
    config: CoordinatorConfig,
    federation: Arc<FederationManager>,
    transport: Arc<dyn Transport>,
    scheduler: Arc<Scheduler>,
    /// Cloned into each deferred-execution actor.
    runner: Arc<DeferredRunner>,
}

/// The slice of coordinator state a deferred actor needs: it outlives the
/// `handle` call that scheduled it.
struct DeferredRunner {
    cse_id: String,
    executor: Arc<dyn LocalExecutor>,
    store: Arc<dyn ResourceStore>,
    notifier: Arc<dyn Notifier>,
}

impl RequestCoordinator {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CoordinatorConfig,
        federation: Arc<FederationManager>,
        executor: Arc<dyn LocalExecutor>,
        store: Arc<dyn ResourceStore>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        let runner = Arc::new(DeferredRunner {
            cse_id: config.cse_id.clone(),
            executor,
            store,
            notifier,
        });
        Self {
            config,
            federation,
            transport,
            scheduler,
            runner,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Handle one admitted request and produce its immediate response.
    ///
    /// For non-blocking response types the immediate response is an
    /// `ACCEPTED_*` envelope referencing the `<request>` resource; the actual
    /// operation runs on a scheduler actor named by the request identifier.
    pub async fn handle(&self, request: &CseRequest) -> ResultEnvelope {
        let rqi = request.request_identifier.clone();

        let address = match ResourceAddress::parse(&request.to) {
            Ok(address) => address,
            Err(err) => return ResultEnvelope::from_error(&err, rqi),
        };

        // The CSE base itself is immutable, regardless of originator.
        if matches!(request.operation, Operation::Update | Operation::Delete)
            && self.targets_local_base(&address)
        {
            return ResultEnvelope::error(
                ResponseStatusCode::OperationNotAllowed,
                rqi,
                "the CSE base cannot be modified or deleted",
            );
        }

        if request.operation.requires_content() && request.content.is_none() {
            return ResultEnvelope::error(
                ResponseStatusCode::BadRequest,
                rqi,
                "operation requires content",
            );
        }
        if request.operation == Operation::Create && request.resource_type.is_none() {
            return ResultEnvelope::error(
                ResponseStatusCode::BadRequest,
                rqi,
                "CREATE requires a resource type",
            );
        }

        if !address.is_local(&self.config.cse_id) {
            return self.forward(request, &address).await;
        }

        match request.response_type {
            ResponseType::Blocking => self.execute_blocking(request).await,
            ResponseType::NonBlockingSync => self.admit_non_blocking(request, false).await,
            ResponseType::NonBlockingAsync => self.admit_non_blocking(request, true).await,
            ResponseType::FlexBlocking => match self.config.flex_blocking {
                FlexBlockingPolicy::Blocking => self.execute_blocking(request).await,
                FlexBlockingPolicy::NonBlockingAsync => {
                    self.admit_non_blocking(request, true).await
                }
            },
        }
    }

    /// Run the operation inline on the local executor.
    async fn execute_blocking(&self, request: &CseRequest) -> ResultEnvelope {
        self.runner
            .executor
            .process(request.effective_operation(), request)
            .await
    }

    /// Whether the address names the local `<CSEBase>` in any spelling.
    fn targets_local_base(&self, address: &ResourceAddress) -> bool {
        if !address.is_local(&self.config.cse_id) {
            return false;
        }
        let path = address.path();
        (path.is_empty() && address.cse_id().is_some())
            || path == self.config.cse_base_ri
            || path == self.config.cse_base_rn
    }

    /// Forward a request hosted by another CSE along the registration tree.
    async fn forward(&self, request: &CseRequest, address: &ResourceAddress) -> ResultEnvelope {
        let rqi = request.request_identifier.clone();
        if !self.config.transit_enabled {
            return ResultEnvelope::error(
                ResponseStatusCode::OperationNotAllowed,
                rqi,
                "transit forwarding is disabled",
            );
        }

        // A non-local address always embeds a CSE-ID.
        let cse_id = address.cse_id().unwrap_or_default();
        let link = match self.federation.get_link(cse_id) {
            Ok(link) => link,
            Err(FederationError::UnknownCse(id)) => {
                return ResultEnvelope::error(
                    ResponseStatusCode::NotFound,
                    rqi,
                    format!("no known path to {id}"),
                )
            }
            Err(FederationError::NoPointOfAccess(id)) => {
                return ResultEnvelope::error(
                    ResponseStatusCode::TargetNotReachable,
                    rqi,
                    format!("no point of access for {id}"),
                )
            }
        };
        let Some(poa) = link.first_point_of_access() else {
            return ResultEnvelope::error(
                ResponseStatusCode::TargetNotReachable,
                rqi,
                format!("no point of access for {}", link.cse_id),
            );
        };

        let url = format!(
            "{}/~{}",
            poa,
            address.sp_relative_form(&self.config.cse_id)
        );
        let params = request.filter_criteria.query_params();
        debug!(target = %request.to, via = %link.cse_id, url = %url, "forwarding request");

        let mut envelope = self
            .transport
            .send(
                request.operation,
                &url,
                &request.originator,
                request.content.as_ref(),
                &params,
            )
            .await;
        // The remote status code passes through verbatim.
        envelope.request_identifier = rqi;
        envelope
    }

    /// Persist the `<request>` resource, schedule the deferred execution, and
    /// answer with the accepted envelope referencing it.
    async fn admit_non_blocking(&self, request: &CseRequest, asynchronous: bool) -> ResultEnvelope {
        let rqi = request.request_identifier.clone();
        let now = now_timestamp();
        let request_ri = format!("req-{rqi}");

        let mut resource = Resource::new(
            ResourceType::Req,
            request_ri.clone(),
            request_ri.clone(),
            Some(self.config.cse_base_ri.clone()),
        )
        .with_attr(attr::MI, request.meta_info())
        .with_attr(attr::ORG, request.originator.clone())
        .with_attr(attr::CR, request.originator.clone())
        .with_attr(attr::CT, now.clone())
        .with_attr(attr::LT, now);
        if let Some(et) = &request.result_expiration {
            resource.set_attr(attr::ET, et.clone());
        }
        resource.set_request_status(RequestStatus::Pending);

        if let Err(err) = self.runner.store.create(resource).await {
            return ResultEnvelope::from_error(&err, rqi);
        }

        let runner = Arc::clone(&self.runner);
        let deferred = request.clone();
        let deferred_ri = request_ri.clone();
        self.scheduler
            .start_actor(&rqi, Duration::ZERO, move || async move {
                runner
                    .execute_deferred(deferred, deferred_ri, asynchronous)
                    .await;
            })
            .await;

        let rsc = if asynchronous {
            ResponseStatusCode::AcceptedNonBlockingAsync
        } else {
            ResponseStatusCode::AcceptedNonBlockingSync
        };
        ResultEnvelope::success(rsc, rqi, Some(json!({ "m2m:uri": request_ri })))
    }
}

impl DeferredRunner {
    /// Run a deferred operation and finalize its `<request>` resource with
    /// the operation result and a terminal status, exactly once.
    async fn execute_deferred(&self, request: CseRequest, request_ri: String, asynchronous: bool) {
        let envelope = self
            .executor
            .process(request.effective_operation(), &request)
            .await;
        let status = if envelope.ok() {
            RequestStatus::Completed
        } else {
            RequestStatus::Failed
        };
        let operation_result = json!({
            "rsc": envelope.rsc.code(),
            "rqi": request.request_identifier,
            "pc": envelope.content,
            "to": request.originator,
            "fr": self.cse_id,
            "rvi": request.release_version,
        });

        match self.store.retrieve(&request_ri).await {
            Ok(mut resource) => {
                if resource
                    .request_status()
                    .is_some_and(RequestStatus::is_terminal)
                {
                    warn!(ri = %request_ri, "request already finalized, result discarded");
                } else {
                    resource.set_attr(attr::ORS, operation_result.clone());
                    resource.set_request_status(status);
                    resource.set_attr(attr::LT, now_timestamp());
                    if let Err(err) = self.store.update(resource).await {
                        warn!(error = %err, ri = %request_ri, "failed to finalize request");
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, ri = %request_ri, "request resource vanished before completion");
            }
        }

        if asynchronous {
            self.notify_result(&request, &operation_result).await;
        }
    }

    /// Deliver an asynchronous operation result, best effort.
    async fn notify_result(&self, request: &CseRequest, operation_result: &Value) {
        let targets = if request.response_target_uris.is_empty() {
            self.originator_points_of_access(&request.originator).await
        } else {
            request.response_target_uris.clone()
        };
        if targets.is_empty() {
            warn!(originator = %request.originator,
                "no notification target for asynchronous result");
            return;
        }
        let payload = json!({ "m2m:rsp": operation_result });
        if let Err(err) = self.notifier.deliver(&targets, &payload).await {
            warn!(error = %err, originator = %request.originator,
                "asynchronous result notification failed");
        }
    }

    /// Points of access of the originator's registered entity: an AE by its
    /// `aei`, a CSE by its `csi`.
    async fn originator_points_of_access(&self, originator: &str) -> Vec<String> {
        let filter = if originator.starts_with('/') {
            ResourceFilter::by_attribute(ResourceType::Csr, attr::CSI, originator)
        } else {
            ResourceFilter::by_attribute(ResourceType::Ae, attr::AEI, originator)
        };
        match self.store.search(filter).await {
            Ok(found) => found
                .first()
                .map(|resource| resource.string_list(attr::POA))
                .unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, originator, "originator lookup failed");
                Vec::new()
            }
        }
    }
}
