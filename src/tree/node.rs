/*!
 * Node Types
 * Raw node data, host events and listener seam
 */

use crate::core::id::NodeId;
use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What a raw node is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum NodeKind {
    /// Text-bearing leaf
    Text(String),
    /// Element with a lowercased tag name
    Element(String),
}

impl NodeKind {
    /// Tag name, or `#text`
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Text(_) => "#text",
            NodeKind::Element(tag) => tag,
        }
    }
}

/// Host events a node can be stimulated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Click,
    Error,
    Load,
    MouseOver,
    MouseOut,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Click,
        EventKind::Error,
        EventKind::Load,
        EventKind::MouseOver,
        EventKind::MouseOut,
    ];

    /// Event property name, e.g. `onclick`
    pub fn property(&self) -> &'static str {
        match self {
            EventKind::Click => "onclick",
            EventKind::Error => "onerror",
            EventKind::Load => "onload",
            EventKind::MouseOver => "onmouseover",
            EventKind::MouseOut => "onmouseout",
        }
    }

    /// Look up an event by its `on*` property name
    pub fn from_property(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.property() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.property())
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_property(s).ok_or(())
    }
}

/// Callback the host runs when a node receives a stimulus
pub trait EventListener: Send + Sync {
    fn handle(&self, event: EventKind);
}

impl<F> EventListener for F
where
    F: Fn(EventKind) + Send + Sync,
{
    fn handle(&self, event: EventKind) {
        self(event)
    }
}

/// One node in the host arena
pub(crate) struct RawNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attributes: BTreeMap<String, String>,
    pub style: BTreeMap<String, String>,
    pub listeners: HashMap<EventKind, Arc<dyn EventListener>, RandomState>,
}

impl RawNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            listeners: HashMap::with_hasher(RandomState::new()),
        }
    }
}

/// Serializable view of a subtree, for renderers and tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub style: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub listeners: Vec<EventKind>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// Depth-first search for every element of the given tag
    pub fn find_all(&self, tag: &str) -> Vec<&NodeSnapshot> {
        let mut found = Vec::new();
        self.collect(tag, &mut found);
        found
    }

    fn collect<'a>(&'a self, tag: &str, found: &mut Vec<&'a NodeSnapshot>) {
        if matches!(&self.kind, NodeKind::Element(t) if t == tag) {
            found.push(self);
        }
        for child in &self.children {
            child.collect(tag, found);
        }
    }
}
