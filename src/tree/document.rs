/*!
 * Host Document
 * Arena of raw nodes shared between the host and the mediation layer
 */

use super::node::{EventKind, EventListener, NodeKind, NodeSnapshot, RawNode};
use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::id::NodeId;
use crate::policy::normalize_kind;
use ahash::RandomState;
use log::debug;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

struct Arena {
    nodes: HashMap<NodeId, RawNode, RandomState>,
    next_id: u32,
    root: NodeId,
}

impl Arena {
    fn insert(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, RawNode::new(kind));
        id
    }

    fn get(&self, id: NodeId) -> SandboxResult<&RawNode> {
        self.nodes.get(&id).ok_or(SandboxError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> SandboxResult<&mut RawNode> {
        self.nodes.get_mut(&id).ok_or(SandboxError::NodeNotFound(id))
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(&node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn accepts_children(&self, parent: NodeId) -> SandboxResult<()> {
        match self.get(parent)?.kind {
            NodeKind::Text(_) => Err(SandboxError::InvalidNode(format!(
                "text node {} cannot have children",
                parent
            ))),
            NodeKind::Element(_) => Ok(()),
        }
    }

    /// Remove `id` and its whole subtree from the arena
    fn free_subtree(&mut self, id: NodeId, freed: &mut Vec<RawNode>) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children.iter().copied());
                freed.push(node);
            }
        }
    }

    fn detach(&mut self, child: NodeId) {
        let parent = self.nodes.get_mut(&child).and_then(|n| n.parent.take());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != child);
        }
    }
}

/// Host tree handle; clones share the same arena
#[derive(Clone)]
pub struct HostTree {
    arena: Arc<RwLock<Arena>>,
}

impl Default for HostTree {
    fn default() -> Self {
        Self::new()
    }
}

impl HostTree {
    /// Create a tree holding a single `body` root
    pub fn new() -> Self {
        let mut arena = Arena {
            nodes: HashMap::with_hasher(RandomState::new()),
            next_id: 1,
            root: NodeId(0),
        };
        arena.root = arena.insert(NodeKind::Element("body".into()));
        Self {
            arena: Arc::new(RwLock::new(arena)),
        }
    }

    pub fn document_root(&self) -> NodeId {
        self.arena.read().root
    }

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.arena
            .write()
            .insert(NodeKind::Element(normalize_kind(tag)))
    }

    /// Create a detached text node
    pub fn create_text(&self, text: &str) -> NodeId {
        self.arena.write().insert(NodeKind::Text(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, re-parenting it if needed
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> SandboxResult<()> {
        let mut arena = self.arena.write();
        arena.get(child)?;
        arena.accepts_children(parent)?;
        if arena.is_ancestor(child, parent) {
            return Err(SandboxError::InvalidNode(format!(
                "appending {} to {} would create a cycle",
                child, parent
            )));
        }

        arena.detach(child);
        arena.get_mut(child)?.parent = Some(parent);
        arena.get_mut(parent)?.children.push(child);
        debug!("Appended node {} to {}", child, parent);
        Ok(())
    }

    /// Create an element directly under `parent`
    ///
    /// Nothing is created when `parent` cannot take children.
    pub fn append_new_element(&self, parent: NodeId, tag: &str) -> SandboxResult<NodeId> {
        self.append_new(parent, NodeKind::Element(normalize_kind(tag)))
    }

    /// Create a text node directly under `parent`
    pub fn append_new_text(&self, parent: NodeId, text: &str) -> SandboxResult<NodeId> {
        self.append_new(parent, NodeKind::Text(text.to_string()))
    }

    fn append_new(&self, parent: NodeId, kind: NodeKind) -> SandboxResult<NodeId> {
        let mut arena = self.arena.write();
        arena.accepts_children(parent)?;
        let id = arena.insert(kind);
        arena.get_mut(id)?.parent = Some(parent);
        arena.get_mut(parent)?.children.push(id);
        debug!("Created node {} under {}", id, parent);
        Ok(id)
    }

    /// Remove every child of `id` from the tree and free their subtrees
    ///
    /// Returns how many direct children were removed. Ids of freed nodes
    /// resolve to `NodeNotFound` afterwards.
    pub fn remove_children(&self, id: NodeId) -> SandboxResult<usize> {
        let mut freed = Vec::new();
        let removed = {
            let mut arena = self.arena.write();
            let children = std::mem::take(&mut arena.get_mut(id)?.children);
            for child in &children {
                arena.free_subtree(*child, &mut freed);
            }
            children.len()
        };
        if removed > 0 {
            debug!("Removed {} children ({} nodes) from node {}", removed, freed.len(), id);
        }
        // Listeners may own capabilities; release them after the lock
        drop(freed);
        Ok(removed)
    }

    pub fn children(&self, id: NodeId) -> SandboxResult<Vec<NodeId>> {
        Ok(self.arena.read().get(id)?.children.clone())
    }

    pub fn parent(&self, id: NodeId) -> SandboxResult<Option<NodeId>> {
        Ok(self.arena.read().get(id)?.parent)
    }

    pub fn kind(&self, id: NodeId) -> SandboxResult<NodeKind> {
        Ok(self.arena.read().get(id)?.kind.clone())
    }

    /// Text content of a text node
    pub fn text(&self, id: NodeId) -> SandboxResult<Option<String>> {
        Ok(match &self.arena.read().get(id)?.kind {
            NodeKind::Text(text) => Some(text.clone()),
            NodeKind::Element(_) => None,
        })
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> SandboxResult<Option<String>> {
        Ok(self.arena.read().get(id)?.attributes.get(name).cloned())
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) -> SandboxResult<()> {
        self.arena
            .write()
            .get_mut(id)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn style_property(&self, id: NodeId, name: &str) -> SandboxResult<Option<String>> {
        Ok(self.arena.read().get(id)?.style.get(name).cloned())
    }

    pub fn set_style_property(&self, id: NodeId, name: &str, value: &str) -> SandboxResult<()> {
        self.arena
            .write()
            .get_mut(id)?
            .style
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn style(&self, id: NodeId) -> SandboxResult<BTreeMap<String, String>> {
        Ok(self.arena.read().get(id)?.style.clone())
    }

    /// Install or clear the listener for one event
    pub fn set_listener(
        &self,
        id: NodeId,
        event: EventKind,
        listener: Option<Arc<dyn EventListener>>,
    ) -> SandboxResult<()> {
        let mut arena = self.arena.write();
        let node = arena.get_mut(id)?;
        match listener {
            Some(listener) => {
                node.listeners.insert(event, listener);
            }
            None => {
                node.listeners.remove(&event);
            }
        }
        Ok(())
    }

    pub fn listener(
        &self,
        id: NodeId,
        event: EventKind,
    ) -> SandboxResult<Option<Arc<dyn EventListener>>> {
        Ok(self.arena.read().get(id)?.listeners.get(&event).cloned())
    }

    pub fn has_listener(&self, id: NodeId, event: EventKind) -> SandboxResult<bool> {
        Ok(self.arena.read().get(id)?.listeners.contains_key(&event))
    }

    /// Deliver a host stimulus; returns whether a listener ran
    ///
    /// The listener runs after the arena lock is released, so it may mutate
    /// the tree.
    pub fn dispatch(&self, id: NodeId, event: EventKind) -> SandboxResult<bool> {
        match self.listener(id, event)? {
            Some(listener) => {
                debug!("Dispatching {} to node {}", event, id);
                listener.handle(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of live nodes, attached or not
    pub fn len(&self) -> usize {
        self.arena.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializable copy of the subtree rooted at `id`
    pub fn snapshot(&self, id: NodeId) -> SandboxResult<NodeSnapshot> {
        let arena = self.arena.read();
        Self::snapshot_node(&arena, id)
    }

    fn snapshot_node(arena: &Arena, id: NodeId) -> SandboxResult<NodeSnapshot> {
        let node = arena.get(id)?;
        let mut listeners: Vec<EventKind> = node.listeners.keys().copied().collect();
        listeners.sort();
        let children = node
            .children
            .iter()
            .map(|child| Self::snapshot_node(arena, *child))
            .collect::<SandboxResult<Vec<_>>>()?;
        Ok(NodeSnapshot {
            id,
            kind: node.kind.clone(),
            attributes: node.attributes.clone(),
            style: node.style.clone(),
            listeners,
            children,
        })
    }

    /// HTML-like rendering of a subtree, for diagnostics
    pub fn render(&self, id: NodeId) -> SandboxResult<String> {
        let snapshot = self.snapshot(id)?;
        let mut out = String::new();
        render_into(&snapshot, &mut out);
        Ok(out)
    }
}

fn render_into(node: &NodeSnapshot, out: &mut String) {
    match &node.kind {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Element(tag) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in &node.attributes {
                let _ = write!(out, " {}=\"{}\"", name, value.replace('"', "&quot;"));
            }
            if !node.style.is_empty() {
                let style: Vec<String> = node
                    .style
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect();
                let _ = write!(out, " style=\"{}\"", style.join("; "));
            }
            out.push('>');
            for child in &node.children {
                render_into(child, out);
            }
            let _ = write!(out, "</{}>", tag);
        }
    }
}
