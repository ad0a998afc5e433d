/*!
 * Event Binder
 * Compiles handler source and installs it on the host node
 *
 * Handlers see only the session globals as free names, and `this` is always
 * the capability the handler was assigned through, never the raw node.
 */

use crate::audit::AuditKind;
use crate::capability::NodeCapability;
use crate::core::errors::{SandboxError, SandboxResult};
use crate::monitoring::HandlerSpan;
use crate::script::{self, HandlerBindings, Interpreter, Program, ScriptResult, Value};
use crate::tree::{EventKind, EventListener};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A handler compiled once at assignment time
pub struct CompiledHandler {
    event: EventKind,
    source: String,
    program: Program,
}

impl CompiledHandler {
    pub fn event(&self) -> EventKind {
        self.event
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run with `receiver` as `this` and the receiver's session globals in scope
    pub fn call(&self, receiver: &NodeCapability) -> ScriptResult<Value> {
        let bindings = HandlerBindings::new(receiver.context().globals().clone());
        Interpreter::new(&bindings, Value::Node(receiver.clone())).run(&self.program)
    }
}

impl fmt::Debug for CompiledHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledHandler")
            .field("event", &self.event)
            .field("statements", &self.program.len())
            .finish()
    }
}

/// Listener installed on the host node; owns its receiver
struct HandlerAdapter {
    receiver: NodeCapability,
    handler: Arc<CompiledHandler>,
}

impl EventListener for HandlerAdapter {
    fn handle(&self, event: EventKind) {
        let context = self.receiver.context();
        // Ended sessions receive no further stimuli
        if !context.is_live() {
            return;
        }

        let span = HandlerSpan::new(context.name(), event.property());
        let _entered = span.enter();
        match self.handler.call(&self.receiver) {
            Ok(_) => span.record_result(true),
            Err(err) => {
                span.record_error(&err.to_string());
                warn!(plugin = %context.name(), event = %event, error = %err, "Event handler failed");
                context.record(AuditKind::HandlerFailure {
                    event: event.property().to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
}

pub struct EventBinder;

impl EventBinder {
    /// Compile `source` and bind it to `event` on the capability's node
    ///
    /// Compilation failure clears any previous binding for the event and is
    /// returned to the caller; nothing propagates past the assignment.
    pub fn bind(capability: &NodeCapability, event: EventKind, source: &str) -> SandboxResult<()> {
        let context = capability.context();
        context.ensure_live()?;
        let node = capability.node_id();

        let limit = context.config().max_handler_source;
        let compiled = if source.len() > limit {
            Err(format!("handler source exceeds {} bytes", limit))
        } else {
            script::compile(source).map_err(|e| e.to_string())
        };

        match compiled {
            Ok(program) => {
                let handler = Arc::new(CompiledHandler {
                    event,
                    source: source.to_string(),
                    program,
                });
                capability.cache_handler(event, handler.clone());
                let listener = HandlerAdapter {
                    receiver: capability.clone(),
                    handler,
                };
                capability
                    .tree()
                    .set_listener(node, event, Some(Arc::new(listener)))?;
                context.track_binding(node, event);
                debug!(plugin = %context.name(), node = %node, event = %event, "Bound handler");
                Ok(())
            }
            Err(reason) => {
                capability.forget_handler(event);
                capability.tree().set_listener(node, event, None)?;
                context.untrack_binding(node, event);

                let err = SandboxError::CompilationFailure {
                    event: event.property().to_string(),
                    reason,
                };
                warn!(plugin = %context.name(), node = %node, error = %err, "Handler compilation failed");
                context.audit_error(&err);
                Err(err)
            }
        }
    }

    /// Remove the binding for `event`, if any
    pub fn unbind(capability: &NodeCapability, event: EventKind) -> SandboxResult<()> {
        capability.context().ensure_live()?;
        capability.forget_handler(event);
        capability
            .tree()
            .set_listener(capability.node_id(), event, None)?;
        capability
            .context()
            .untrack_binding(capability.node_id(), event);
        Ok(())
    }
}
