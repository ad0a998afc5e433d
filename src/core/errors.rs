/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::id::NodeId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export ScriptError from the script module
pub use crate::script::ScriptError;

/// Mediation operation result
///
/// # Must Use
/// Mediation failures are signals the plugin is expected to observe
#[must_use = "mediation operations can fail and must be handled"]
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Outbound request result
#[must_use = "request operations can fail and must be handled"]
pub type RequestResult<T> = Result<T, RequestError>;

/// Failures raised at the mediation boundary
///
/// Every variant is contained locally: none of them end the plugin session.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SandboxError {
    #[error("Sandboxed script attempted to create a {kind} element")]
    #[diagnostic(
        code(sandbox::forbidden_node_kind),
        help("Script and iframe elements cannot be created from plugin code.")
    )]
    ForbiddenNodeKind { kind: String },

    #[error("Property '{property}' is read-only")]
    #[diagnostic(
        code(sandbox::read_only_property),
        help("Context identity is fixed by the loader and cannot be reassigned.")
    )]
    ReadOnlyPropertyViolation { property: String },

    #[error("Property '{property}' is not exposed")]
    #[diagnostic(
        code(sandbox::unknown_property),
        help("Only style, src, alt, class, type, value, height, width and on* handlers are reachable.")
    )]
    UnknownProperty { property: String },

    #[error("Failed to compile {event} handler: {reason}")]
    #[diagnostic(
        code(sandbox::compilation_failure),
        help("The binding was left unset. Fix the handler source and assign it again.")
    )]
    CompilationFailure { event: String, reason: String },

    #[error("Request failed: {0}")]
    #[diagnostic(transparent)]
    RequestFailure(#[from] RequestError),

    #[error("Session '{0}' has ended")]
    #[diagnostic(
        code(sandbox::session_ended),
        help("Capabilities minted by an ended session can no longer be used.")
    )]
    SessionEnded(String),

    #[error("Node {0} not found in host tree")]
    #[diagnostic(code(sandbox::node_not_found))]
    NodeNotFound(NodeId),

    #[error("Invalid node operation: {0}")]
    #[diagnostic(code(sandbox::invalid_node))]
    InvalidNode(String),
}

/// Outbound request channel errors
///
/// Delivered to the completion callback, never thrown at the call site.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum RequestError {
    #[error("No handler for request '{path}'")]
    #[diagnostic(
        code(request::no_handler),
        help("Register a handler for the request prefix or install a default handler.")
    )]
    NoHandler { path: String },

    #[error("Context '{context}' already has a handler registered for \"{prefix}\" requests")]
    #[diagnostic(code(request::duplicate_handler))]
    DuplicateHandler { context: String, prefix: String },

    #[error("Malformed request path '{0}'")]
    #[diagnostic(code(request::malformed_path))]
    MalformedPath(String),

    #[error("Transport error: {0}")]
    #[diagnostic(code(request::transport))]
    Transport(String),

    #[error("Request '{path}' timed out after {timeout_ms}ms")]
    #[diagnostic(code(request::timed_out))]
    TimedOut { path: String, timeout_ms: u64 },

    #[error("No async runtime available to issue '{0}'")]
    #[diagnostic(
        code(request::no_runtime),
        help("Requests must be issued from within a tokio runtime.")
    )]
    NoRuntime(String),
}

impl SandboxError {
    /// Short kind label used by the audit trail and logs
    pub fn kind(&self) -> &'static str {
        match self {
            SandboxError::ForbiddenNodeKind { .. } => "forbidden_node_kind",
            SandboxError::ReadOnlyPropertyViolation { .. } => "read_only_property",
            SandboxError::UnknownProperty { .. } => "unknown_property",
            SandboxError::CompilationFailure { .. } => "compilation_failure",
            SandboxError::RequestFailure(_) => "request_failure",
            SandboxError::SessionEnded(_) => "session_ended",
            SandboxError::NodeNotFound(_) => "node_not_found",
            SandboxError::InvalidNode(_) => "invalid_node",
        }
    }
}
