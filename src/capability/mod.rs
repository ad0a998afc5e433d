/*!
 * Node Capabilities
 * Restricted handles to host nodes, minted 1:1 per node by the mediation layer
 *
 * A capability wraps exactly one node plus the context that created it. It
 * never hands out raw node ids of relatives; children come back as fresh
 * capabilities and the parent is never reachable.
 */

mod property;
mod style;

pub use property::Property;
pub use style::StyleHandle;

use crate::binder::{CompiledHandler, EventBinder};
use crate::context::SandboxContext;
use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::limits::PLACEHOLDER_CLASS;
use crate::core::NodeId;
use crate::tree::{EventKind, HostTree, NodeKind};
use ahash::RandomState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

struct CapabilityInner {
    node: NodeId,
    tree: HostTree,
    context: Arc<SandboxContext>,
    handlers: Mutex<HashMap<EventKind, Arc<CompiledHandler>, RandomState>>,
}

/// Cloneable capability; clones share identity and handler cache
#[derive(Clone)]
pub struct NodeCapability {
    inner: Arc<CapabilityInner>,
}

impl NodeCapability {
    /// Mint the capability for an existing host node
    pub fn new(node: NodeId, tree: HostTree, context: Arc<SandboxContext>) -> SandboxResult<Self> {
        tree.kind(node)?;
        Ok(Self::wrap(node, tree, context))
    }

    fn wrap(node: NodeId, tree: HostTree, context: Arc<SandboxContext>) -> Self {
        Self {
            inner: Arc::new(CapabilityInner {
                node,
                tree,
                context,
                handlers: Mutex::new(HashMap::with_hasher(RandomState::new())),
            }),
        }
    }

    fn child(&self, node: NodeId) -> Self {
        Self::wrap(node, self.inner.tree.clone(), self.inner.context.clone())
    }

    pub fn node_id(&self) -> NodeId {
        self.inner.node
    }

    pub fn context(&self) -> &Arc<SandboxContext> {
        &self.inner.context
    }

    pub(crate) fn tree(&self) -> &HostTree {
        &self.inner.tree
    }

    /// Same capability, not merely the same node
    pub fn ptr_eq(&self, other: &NodeCapability) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Always absent, whatever the host node's real parent is
    pub fn parent(&self) -> Option<NodeCapability> {
        None
    }

    pub fn kind(&self) -> SandboxResult<NodeKind> {
        self.inner.context.ensure_live()?;
        self.inner.tree.kind(self.inner.node)
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Remove every child of the wrapped node
    pub fn clear(&self) -> SandboxResult<()> {
        self.inner.context.ensure_live()?;
        let removed = self.inner.tree.remove_children(self.inner.node)?;
        debug!(plugin = %self.inner.context.name(), node = %self.inner.node, removed, "Cleared node");
        Ok(())
    }

    pub fn append_text(&self, text: &str) -> SandboxResult<NodeCapability> {
        self.inner.context.ensure_live()?;
        let id = self.inner.tree.append_new_text(self.inner.node, text)?;
        Ok(self.child(id))
    }

    /// Create and append an element, subject to the creation policy
    ///
    /// Any failure, policy or structural, leaves the tree untouched.
    pub fn append_element(&self, kind: &str) -> SandboxResult<NodeCapability> {
        let context = &self.inner.context;
        context.ensure_live()?;
        if let Err(err) = context.policy().check(kind) {
            warn!(plugin = %context.name(), kind = %kind, "Blocked element creation");
            context.audit_error(&err);
            return Err(err);
        }
        let id = self.inner.tree.append_new_element(self.inner.node, kind)?;
        Ok(self.child(id))
    }

    /// Append a placeholder container and request its content
    ///
    /// Host-side only. The fill arrives as a text child on a later pump.
    pub fn append_placeholder(&self, name: &str) -> SandboxResult<NodeCapability> {
        let context = &self.inner.context;
        context.ensure_live()?;
        let id = self.inner.tree.append_new_element(self.inner.node, "span")?;
        self.inner
            .tree
            .set_attribute(id, Property::Class.name(), PLACEHOLDER_CLASS)?;
        let placeholder = self.child(id);

        let target = placeholder.clone();
        let route = format!("{}/{}", context.config().placeholder_route, name);
        context.request(
            &route,
            Box::new(move |result| {
                if let Ok(text) = result {
                    if let Err(err) = target.append_text(&text) {
                        warn!(node = %target.node_id(), error = %err, "Placeholder fill dropped");
                    }
                }
            }),
        )?;
        Ok(placeholder)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn get(&self, property: Property) -> SandboxResult<Option<String>> {
        self.inner.context.ensure_live()?;
        let tree = &self.inner.tree;
        match property {
            Property::Style => {
                let style = tree.style(self.inner.node)?;
                if style.is_empty() {
                    return Ok(None);
                }
                let text = style
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join("; ");
                Ok(Some(text))
            }
            other => tree.attribute(self.inner.node, other.name()),
        }
    }

    /// Write one property; `src` is always namespaced, `style` is read-only
    pub fn set(&self, property: Property, value: &str) -> SandboxResult<()> {
        let context = &self.inner.context;
        context.ensure_live()?;
        let value = match property {
            Property::Style => {
                let err = SandboxError::ReadOnlyPropertyViolation {
                    property: property.name().to_string(),
                };
                warn!(plugin = %context.name(), property = %property, "Rejected write to read-only property");
                context.audit_error(&err);
                return Err(err);
            }
            Property::Src => context.static_namer().rewrite(context.name(), value),
            _ => value.to_string(),
        };
        self.inner
            .tree
            .set_attribute(self.inner.node, property.name(), &value)
    }

    /// Write a property by name; unknown names are refused
    pub fn set_property(&self, name: &str, value: &str) -> SandboxResult<()> {
        match name.parse::<Property>() {
            Ok(property) => self.set(property, value),
            Err(()) => {
                let err = SandboxError::UnknownProperty {
                    property: name.to_string(),
                };
                self.inner.context.audit_error(&err);
                Err(err)
            }
        }
    }

    pub fn style(&self) -> SandboxResult<StyleHandle> {
        self.inner.context.ensure_live()?;
        Ok(StyleHandle::new(
            self.inner.node,
            self.inner.tree.clone(),
            self.inner.context.clone(),
        ))
    }

    pub fn set_src(&self, value: &str) -> SandboxResult<()> {
        self.set(Property::Src, value)
    }

    pub fn set_alt(&self, value: &str) -> SandboxResult<()> {
        self.set(Property::Alt, value)
    }

    pub fn set_class(&self, value: &str) -> SandboxResult<()> {
        self.set(Property::Class, value)
    }

    pub fn set_type(&self, value: &str) -> SandboxResult<()> {
        self.set(Property::Type, value)
    }

    pub fn set_value(&self, value: &str) -> SandboxResult<()> {
        self.set(Property::Value, value)
    }

    pub fn set_height(&self, value: &str) -> SandboxResult<()> {
        self.set(Property::Height, value)
    }

    pub fn set_width(&self, value: &str) -> SandboxResult<()> {
        self.set(Property::Width, value)
    }

    // =========================================================================
    // Event handlers
    // =========================================================================

    /// Compile `source` and bind it to `event` on this node
    pub fn set_handler(&self, event: EventKind, source: &str) -> SandboxResult<()> {
        EventBinder::bind(self, event, source)
    }

    pub fn set_onclick(&self, source: &str) -> SandboxResult<()> {
        self.set_handler(EventKind::Click, source)
    }

    pub fn set_onerror(&self, source: &str) -> SandboxResult<()> {
        self.set_handler(EventKind::Error, source)
    }

    pub fn set_onload(&self, source: &str) -> SandboxResult<()> {
        self.set_handler(EventKind::Load, source)
    }

    pub fn set_onmouseover(&self, source: &str) -> SandboxResult<()> {
        self.set_handler(EventKind::MouseOver, source)
    }

    pub fn set_onmouseout(&self, source: &str) -> SandboxResult<()> {
        self.set_handler(EventKind::MouseOut, source)
    }

    /// The compiled handler currently bound to `event`
    pub fn handler(&self, event: EventKind) -> Option<Arc<CompiledHandler>> {
        self.inner.handlers.lock().get(&event).cloned()
    }

    pub(crate) fn cache_handler(&self, event: EventKind, handler: Arc<CompiledHandler>) {
        self.inner.handlers.lock().insert(event, handler);
    }

    pub(crate) fn forget_handler(&self, event: EventKind) {
        self.inner.handlers.lock().remove(&event);
    }
}

impl fmt::Debug for NodeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCapability")
            .field("node", &self.inner.node)
            .field("plugin", &self.inner.context.name())
            .finish()
    }
}
