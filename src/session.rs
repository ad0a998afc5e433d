/*!
 * Sessions
 * Host-side surface for starting, driving and ending plugin sessions
 */

use crate::audit::MediationAudit;
use crate::capability::NodeCapability;
use crate::context::{ContextDeps, LogSink, RequestTransport, SandboxContext};
use crate::core::errors::SandboxResult;
use crate::core::{MediatorConfig, NodeId};
use crate::script::{self, Interpreter, PluginBindings, ScriptError, Value};
use crate::tree::HostTree;
use std::sync::Arc;
use tracing::{info, warn};

/// Mints sessions over one host tree
pub struct SandboxHost {
    tree: HostTree,
    deps: ContextDeps,
}

impl SandboxHost {
    pub fn new(tree: HostTree, transport: Arc<dyn RequestTransport>) -> Self {
        Self {
            tree,
            deps: ContextDeps::new(transport),
        }
    }

    pub fn with_config(mut self, config: MediatorConfig) -> Self {
        self.deps.audit = Arc::new(MediationAudit::with_capacity(config.audit_capacity));
        self.deps.config = config;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.deps.sink = sink;
        self
    }

    pub fn with_audit(mut self, audit: Arc<MediationAudit>) -> Self {
        self.deps.audit = audit;
        self
    }

    pub fn tree(&self) -> &HostTree {
        &self.tree
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.deps.config
    }

    pub fn audit(&self) -> &Arc<MediationAudit> {
        &self.deps.audit
    }

    /// Start a session for plugin `name`, rooted at host node `mount`
    pub fn spawn(&self, name: &str, mount: NodeId) -> SandboxResult<Session> {
        let context = SandboxContext::new(name, self.deps.clone());
        let root = NodeCapability::new(mount, self.tree.clone(), context.clone())?;
        info!(plugin = %name, mount = %mount, "Plugin session started");
        Ok(Session {
            tree: self.tree.clone(),
            context,
            root,
        })
    }
}

/// One running plugin: its context and root capability
pub struct Session {
    tree: HostTree,
    context: Arc<SandboxContext>,
    root: NodeCapability,
}

impl Session {
    pub fn context(&self) -> &Arc<SandboxContext> {
        &self.context
    }

    pub fn root(&self) -> &NodeCapability {
        &self.root
    }

    /// Evaluate plugin source with `context` and `root` in scope
    ///
    /// An uncaught error is returned; the session stays usable.
    pub fn run(&self, source: &str) -> Result<Value, ScriptError> {
        self.context.ensure_live()?;
        let program = script::compile(source)?;
        let bindings = PluginBindings::new(self.context.clone(), self.root.clone());
        let result = Interpreter::new(&bindings, Value::Undefined).run(&program);
        if let Err(err) = &result {
            warn!(plugin = %self.context.name(), error = %err, "Uncaught plugin error");
        }
        result
    }

    pub fn pump(&self) -> usize {
        self.context.pump()
    }

    pub async fn settle(&self) -> usize {
        self.context.settle().await
    }

    pub fn pending(&self) -> usize {
        self.context.pending()
    }

    pub fn is_live(&self) -> bool {
        self.context.is_live()
    }

    /// End the session and detach every listener it installed
    pub fn end(&self) {
        for (node, event) in self.context.end() {
            if let Err(err) = self.tree.set_listener(node, event, None) {
                warn!(node = %node, event = %event, error = %err, "Listener already gone");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.end();
    }
}
