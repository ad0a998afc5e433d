/*!
 * Sandbox Mediator Library
 * Capability mediation between untrusted plugin code and a host node tree
 */

pub mod audit;
pub mod binder;
pub mod capability;
pub mod context;
pub mod core;
pub mod monitoring;
pub mod policy;
pub mod script;
pub mod session;
pub mod tree;

// Re-exports
pub use audit::{AuditEvent, AuditKind, AuditSeverity, MediationAudit};
pub use binder::{CompiledHandler, EventBinder};
pub use capability::{NodeCapability, Property, StyleHandle};
pub use context::{
    Globals, LogSink, MemorySink, RequestHandler, RequestRouter, RequestTransport,
    SandboxContext, TracingSink, WebRequest,
};
pub use crate::core::errors::{RequestError, RequestResult, SandboxError, SandboxResult};
pub use crate::core::{MediatorConfig, NodeId, SessionId};
pub use monitoring::init_tracing;
pub use policy::{CreationPolicy, ResourceNamer};
pub use script::{ScriptError, Value};
pub use session::{SandboxHost, Session};
pub use tree::{EventKind, HostTree, NodeKind, NodeSnapshot};
