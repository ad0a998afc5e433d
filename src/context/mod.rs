/*!
 * Sandbox Context
 * Per-plugin session state: identity, log sink, globals and outbound requests
 *
 * Request completions are queued and delivered only when the owning session
 * pumps them, so callbacks always run on the caller's thread.
 */

mod globals;
mod request;
mod sink;

pub use globals::Globals;
pub use request::{RequestHandler, RequestRouter, RequestTransport, WebRequest};
pub use sink::{LogSink, MemorySink, TracingSink};

use crate::audit::{AuditEvent, AuditKind, MediationAudit};
use crate::core::errors::{RequestError, RequestResult, SandboxError, SandboxResult};
use crate::core::{MediatorConfig, NodeId, SessionId};
use crate::policy::{CreationPolicy, ResourceNamer};
use crate::tree::EventKind;
use ahash::RandomState;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Receives the outcome of one outbound request; failures arrive as `RequestFailure`
pub type RequestCallback = Box<dyn FnOnce(SandboxResult<String>) + Send>;

struct Completion {
    path: String,
    callback: RequestCallback,
    result: RequestResult<String>,
}

/// Shared collaborators a context is built from
#[derive(Clone)]
pub struct ContextDeps {
    pub config: MediatorConfig,
    pub sink: Arc<dyn LogSink>,
    pub transport: Arc<dyn RequestTransport>,
    pub audit: Arc<MediationAudit>,
}

impl ContextDeps {
    pub fn new(transport: Arc<dyn RequestTransport>) -> Self {
        Self {
            config: MediatorConfig::default(),
            sink: Arc::new(TracingSink),
            transport,
            audit: Arc::new(MediationAudit::new()),
        }
    }
}

pub struct SandboxContext {
    id: SessionId,
    name: String,
    globals: Globals,
    sink: Arc<dyn LogSink>,
    transport: Arc<dyn RequestTransport>,
    audit: Arc<MediationAudit>,
    config: MediatorConfig,
    policy: CreationPolicy,
    static_namer: ResourceNamer,
    request_namer: ResourceNamer,
    /// Held shared while queueing a completion, exclusively by `end`
    live: Arc<RwLock<bool>>,
    in_flight: AtomicUsize,
    completions_tx: flume::Sender<Completion>,
    completions_rx: flume::Receiver<Completion>,
    bindings: Mutex<HashSet<(NodeId, EventKind), RandomState>>,
}

impl SandboxContext {
    pub fn new(name: &str, deps: ContextDeps) -> Arc<Self> {
        let (completions_tx, completions_rx) = flume::unbounded();
        let context = Self {
            id: SessionId::new(),
            name: name.to_string(),
            globals: Globals::new(),
            sink: deps.sink,
            transport: deps.transport,
            audit: deps.audit,
            policy: deps.config.creation_policy(),
            static_namer: deps.config.static_namer(),
            request_namer: deps.config.request_namer(),
            config: deps.config,
            live: Arc::new(RwLock::new(true)),
            in_flight: AtomicUsize::new(0),
            completions_tx,
            completions_rx,
            bindings: Mutex::new(HashSet::with_hasher(RandomState::new())),
        };
        info!(plugin = %context.name, session = %context.id, "Sandbox context created");
        Arc::new(context)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Plugin identity; fixed for the life of the context
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    pub fn policy(&self) -> &CreationPolicy {
        &self.policy
    }

    pub fn static_namer(&self) -> &ResourceNamer {
        &self.static_namer
    }

    pub fn request_namer(&self) -> &ResourceNamer {
        &self.request_namer
    }

    pub fn audit(&self) -> &Arc<MediationAudit> {
        &self.audit
    }

    /// Write a plugin message to the host's sink
    pub fn log(&self, message: &str) {
        self.sink.log(&self.name, message);
    }

    /// A plugin write to a context field; every field is read-only
    pub fn assign(&self, property: &str, value: &str) -> SandboxResult<()> {
        let error = match property {
            "name" | "globals" => SandboxError::ReadOnlyPropertyViolation {
                property: property.to_string(),
            },
            _ => SandboxError::UnknownProperty {
                property: property.to_string(),
            },
        };
        warn!(
            plugin = %self.name,
            property = %property,
            attempted = %value,
            "Rejected write to context field"
        );
        self.audit_error(&error);
        Err(error)
    }

    pub fn is_live(&self) -> bool {
        *self.live.read()
    }

    pub(crate) fn ensure_live(&self) -> SandboxResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(SandboxError::SessionEnded(self.name.clone()))
        }
    }

    pub(crate) fn record(&self, kind: AuditKind) {
        self.audit.record(AuditEvent::new(&self.name, kind));
    }

    /// Record a mediation error if it is an auditable one
    pub(crate) fn audit_error(&self, error: &SandboxError) {
        if let Some(kind) = AuditKind::from_error(error) {
            self.record(kind);
        }
    }

    pub(crate) fn track_binding(&self, node: NodeId, event: EventKind) {
        self.bindings.lock().insert((node, event));
    }

    pub(crate) fn untrack_binding(&self, node: NodeId, event: EventKind) {
        self.bindings.lock().remove(&(node, event));
    }

    // =========================================================================
    // Outbound requests
    // =========================================================================

    /// Issue a namespaced request; `callback` runs on a later `pump`
    ///
    /// Returns immediately. Without an ambient tokio runtime the request
    /// completes with `NoRuntime`.
    pub fn request(&self, path: &str, callback: RequestCallback) -> SandboxResult<()> {
        self.ensure_live()?;
        let full = self.request_namer.rewrite(&self.name, path);
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        debug!(plugin = %self.name, path = %full, "Outbound request");

        let tx = self.completions_tx.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let fetch = self.transport.fetch(&full);
                let timeout = self.config.request_timeout();
                let live = self.live.clone();
                handle.spawn(async move {
                    let result = match tokio::time::timeout(timeout, fetch).await {
                        Ok(result) => result,
                        Err(_) => Err(RequestError::TimedOut {
                            path: full.clone(),
                            timeout_ms: timeout.as_millis() as u64,
                        }),
                    };
                    let completion = Completion {
                        path: full,
                        callback,
                        result,
                    };
                    enqueue(&live, &tx, completion);
                });
            }
            Err(_) => {
                let result = Err(RequestError::NoRuntime(full.clone()));
                let completion = Completion {
                    path: full,
                    callback,
                    result,
                };
                enqueue(&self.live, &tx, completion);
            }
        }
        Ok(())
    }

    /// Requests issued but not yet delivered
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Deliver every completion that has already arrived
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.deliver(completion) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Deliver completions until no request is outstanding
    ///
    /// Callbacks that issue further requests extend the wait.
    pub async fn settle(&self) -> usize {
        let mut delivered = self.pump();
        while self.pending() > 0 && self.is_live() {
            match self.completions_rx.recv_async().await {
                Ok(completion) => {
                    if self.deliver(completion) {
                        delivered += 1;
                    }
                }
                Err(_) => break,
            }
        }
        delivered
    }

    fn deliver(&self, completion: Completion) -> bool {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        if !self.is_live() {
            return false;
        }
        if let Err(err) = &completion.result {
            warn!(plugin = %self.name, path = %completion.path, error = %err, "Request failed");
            self.record(AuditKind::RequestFailure {
                path: completion.path.clone(),
                reason: err.to_string(),
            });
        }
        (completion.callback)(completion.result.map_err(SandboxError::from));
        true
    }

    /// End the session; returns the listener bindings the caller must detach
    pub(crate) fn end(&self) -> Vec<(NodeId, EventKind)> {
        {
            let mut live = self.live.write();
            if !*live {
                return Vec::new();
            }
            *live = false;
        }
        // No sender can queue past the gate now. Queued callbacks may own
        // capabilities, which own this context.
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            drop(completion);
        }
        self.globals.clear();
        let bindings: Vec<_> = self.bindings.lock().drain().collect();
        info!(
            plugin = %self.name,
            session = %self.id,
            detached = bindings.len(),
            "Sandbox context ended"
        );
        bindings
    }
}

/// Queue a completion unless the session has ended
///
/// The check and the send happen under the same shared guard, so `end` can
/// never drain between them.
fn enqueue(live: &RwLock<bool>, tx: &flume::Sender<Completion>, completion: Completion) {
    let live = live.read();
    if *live {
        let _ = tx.send(completion);
    }
}

impl fmt::Debug for SandboxContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SandboxContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("live", &self.is_live())
            .field("pending", &self.pending())
            .finish()
    }
}
