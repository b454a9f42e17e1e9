//! # Expiration Sweep
//!
//! Periodic worker removing resources whose expiration time has passed.
//! Deletion goes through the registration hooks so an expired `<CSR>` also
//! deregisters its CSE from the federation table.

use crate::hooks::RegistrationHooks;
use cse_bus::{CseEvent, EventPublisher};
use cse_scheduler::Scheduler;
use cse_types::{now_timestamp, ResourceFilter, ResourceStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the scheduler worker driving [`ExpirationSweeper::sweep_once`].
pub const SWEEP_WORKER: &str = "dispatch.expiration";

/// Removes expired resources on a fixed interval.
pub struct ExpirationSweeper {
    store: Arc<dyn ResourceStore>,
    hooks: Arc<RegistrationHooks>,
    bus: Arc<dyn EventPublisher>,
    interval: Duration,
}

impl ExpirationSweeper {
    #[must_use]
    pub fn new(
        store: Arc<dyn ResourceStore>,
        hooks: Arc<RegistrationHooks>,
        bus: Arc<dyn EventPublisher>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            hooks,
            bus,
            interval,
        }
    }

    /// Register the sweep worker with the scheduler.
    pub async fn spawn(self: &Arc<Self>, scheduler: &Scheduler) {
        let sweeper = Arc::clone(self);
        scheduler
            .start_worker(SWEEP_WORKER, self.interval, false, move || {
                let sweeper = Arc::clone(&sweeper);
                async move {
                    sweeper.sweep_once().await;
                    true
                }
            })
            .await;
    }

    /// One sweep pass: delete every resource expired as of now.
    pub async fn sweep_once(&self) {
        let now = now_timestamp();
        let expired = match self.store.search(ResourceFilter::expired_before(&now)).await {
            Ok(expired) => expired,
            Err(err) => {
                warn!(error = %err, "expiration search failed, retrying next tick");
                return;
            }
        };
        if expired.is_empty() {
            return;
        }
        debug!(count = expired.len(), "sweeping expired resources");

        for resource in expired {
            // An earlier cascade in this pass may have removed it already.
            if self.store.retrieve(&resource.ri).await.is_err() {
                continue;
            }
            if let Err(err) = self.store.delete(&resource.ri).await {
                warn!(error = %err, ri = %resource.ri, "failed to delete expired resource");
                continue;
            }
            self.hooks.on_resource_deleted(&resource).await;
            info!(ri = %resource.ri, ty = ?resource.ty, "resource expired");
            self.bus
                .publish(CseEvent::ResourceExpired {
                    ri: resource.ri.clone(),
                    ty: resource.ty,
                })
                .await;
        }
    }
}
