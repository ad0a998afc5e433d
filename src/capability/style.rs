/*!
 * Style Handle
 * Live view of one node's inline style
 */

use crate::context::SandboxContext;
use crate::core::errors::SandboxResult;
use crate::core::NodeId;
use crate::tree::HostTree;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Returned by the read-only `style` property
///
/// The property itself cannot be replaced, but the handle writes straight
/// through to the node's style entries.
#[derive(Clone)]
pub struct StyleHandle {
    node: NodeId,
    tree: HostTree,
    context: Arc<SandboxContext>,
}

impl StyleHandle {
    pub(crate) fn new(node: NodeId, tree: HostTree, context: Arc<SandboxContext>) -> Self {
        Self {
            node,
            tree,
            context,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn get(&self, name: &str) -> SandboxResult<Option<String>> {
        self.context.ensure_live()?;
        self.tree.style_property(self.node, name)
    }

    pub fn set(&self, name: &str, value: &str) -> SandboxResult<()> {
        self.context.ensure_live()?;
        self.tree.set_style_property(self.node, name, value)
    }

    pub fn entries(&self) -> SandboxResult<BTreeMap<String, String>> {
        self.context.ensure_live()?;
        self.tree.style(self.node)
    }
}
