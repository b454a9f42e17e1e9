//! Port doubles for tests: an in-memory resource store, a scripted local
//! executor, a recording transport, and a recording notifier.
//!
//! These live here (feature-gated) so every subsystem crate and the unified
//! test suite share one set of doubles.

use crate::envelope::{ResponseStatusCode, ResultEnvelope};
use crate::errors::CseError;
use crate::operation::Operation;
use crate::ports::{LocalExecutor, Notifier, ResourceFilter, ResourceStore, Transport};
use crate::request::CseRequest;
use crate::resource::{Resource, ResourceType};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory [`ResourceStore`] with cascading delete.
#[derive(Default)]
pub struct InMemoryResourceStore {
    resources: Mutex<HashMap<String, Resource>>,
}

impl InMemoryResourceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a resource without going through `create` semantics.
    pub fn seed(&self, resource: Resource) {
        self.resources.lock().insert(resource.ri.clone(), resource);
    }

    /// Number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.lock().is_empty()
    }

    fn collect_subtree(resources: &HashMap<String, Resource>, root: &str) -> Vec<String> {
        let mut doomed = vec![root.to_string()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor].clone();
            for res in resources.values() {
                if res.pi.as_deref() == Some(parent.as_str()) {
                    doomed.push(res.ri.clone());
                }
            }
            cursor += 1;
        }
        doomed
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn create(&self, resource: Resource) -> Result<Resource, CseError> {
        let mut resources = self.resources.lock();
        if resources.contains_key(&resource.ri) {
            return Err(CseError::Conflict(format!(
                "resource already exists: {}",
                resource.ri
            )));
        }
        resources.insert(resource.ri.clone(), resource.clone());
        Ok(resource)
    }

    async fn retrieve(&self, ri: &str) -> Result<Resource, CseError> {
        self.resources
            .lock()
            .get(ri)
            .cloned()
            .ok_or_else(|| CseError::NotFound(format!("resource not found: {ri}")))
    }

    async fn update(&self, resource: Resource) -> Result<Resource, CseError> {
        let mut resources = self.resources.lock();
        if !resources.contains_key(&resource.ri) {
            return Err(CseError::NotFound(format!(
                "resource not found: {}",
                resource.ri
            )));
        }
        resources.insert(resource.ri.clone(), resource.clone());
        Ok(resource)
    }

    async fn delete(&self, ri: &str) -> Result<(), CseError> {
        let mut resources = self.resources.lock();
        if !resources.contains_key(ri) {
            return Err(CseError::NotFound(format!("resource not found: {ri}")));
        }
        for doomed in Self::collect_subtree(&resources, ri) {
            resources.remove(&doomed);
        }
        Ok(())
    }

    async fn search(&self, filter: ResourceFilter) -> Result<Vec<Resource>, CseError> {
        Ok(self
            .resources
            .lock()
            .values()
            .filter(|res| filter.matches(res))
            .cloned()
            .collect())
    }

    async fn direct_children(
        &self,
        parent: &str,
        ty: Option<ResourceType>,
    ) -> Result<Vec<Resource>, CseError> {
        Ok(self
            .resources
            .lock()
            .values()
            .filter(|res| {
                res.pi.as_deref() == Some(parent) && ty.map_or(true, |ty| res.ty == ty)
            })
            .cloned()
            .collect())
    }
}

/// Scripted [`LocalExecutor`]: pops queued envelopes, falling back to an
/// operation-appropriate success. Records every call.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<ResultEnvelope>>,
    calls: Mutex<Vec<(Operation, CseRequest)>>,
}

impl ScriptedExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response.
    pub fn push_response(&self, envelope: ResultEnvelope) {
        self.responses.lock().push_back(envelope);
    }

    /// Every `(operation, request)` pair processed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(Operation, CseRequest)> {
        self.calls.lock().clone()
    }

    fn default_success(op: Operation, request: &CseRequest) -> ResultEnvelope {
        let rsc = match op {
            Operation::Create => ResponseStatusCode::Created,
            Operation::Update => ResponseStatusCode::Updated,
            Operation::Delete => ResponseStatusCode::Deleted,
            _ => ResponseStatusCode::Ok,
        };
        ResultEnvelope::success(rsc, request.request_identifier.clone(), request.content.clone())
    }
}

#[async_trait]
impl LocalExecutor for ScriptedExecutor {
    async fn process(&self, op: Operation, request: &CseRequest) -> ResultEnvelope {
        self.calls.lock().push((op, request.clone()));
        match self.responses.lock().pop_front() {
            Some(mut envelope) => {
                envelope.request_identifier = request.request_identifier.clone();
                envelope
            }
            None => Self::default_success(op, request),
        }
    }
}

/// A request captured by [`RecordingTransport`].
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub op: Operation,
    pub url: String,
    pub originator: String,
    pub content: Option<Value>,
    pub params: BTreeMap<String, String>,
}

type TransportHandler = Box<dyn Fn(&SentRequest) -> ResultEnvelope + Send + Sync>;

/// Recording [`Transport`] with optional scripted responses and a fallback
/// handler; defaults to answering `2000 OK`.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<ResultEnvelope>>,
    handler: Mutex<Option<TransportHandler>>,
    sent: Mutex<Vec<SentRequest>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response; queued responses win over the handler.
    pub fn push_response(&self, envelope: ResultEnvelope) {
        self.responses.lock().push_back(envelope);
    }

    /// Install a fallback handler deciding responses per request.
    pub fn set_handler(
        &self,
        handler: impl Fn(&SentRequest) -> ResultEnvelope + Send + Sync + 'static,
    ) {
        *self.handler.lock() = Some(Box::new(handler));
    }

    /// Every request sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        op: Operation,
        url: &str,
        originator: &str,
        content: Option<&Value>,
        params: &BTreeMap<String, String>,
    ) -> ResultEnvelope {
        let request = SentRequest {
            op,
            url: url.to_string(),
            originator: originator.to_string(),
            content: content.cloned(),
            params: params.clone(),
        };
        self.sent.lock().push(request.clone());

        if let Some(envelope) = self.responses.lock().pop_front() {
            return envelope;
        }
        if let Some(handler) = self.handler.lock().as_ref() {
            return handler(&request);
        }
        ResultEnvelope::success(ResponseStatusCode::Ok, "", None)
    }
}

/// Recording [`Notifier`]; can be switched into a failing mode.
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<(Vec<String>, Value)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every `(targets, payload)` delivered so far.
    #[must_use]
    pub fn deliveries(&self) -> Vec<(Vec<String>, Value)> {
        self.deliveries.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, targets: &[String], payload: &Value) -> Result<(), CseError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CseError::TargetNotReachable(
                "notification targets unreachable".into(),
            ));
        }
        self.deliveries
            .lock()
            .push((targets.to_vec(), payload.clone()));
        Ok(())
    }
}
