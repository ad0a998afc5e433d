/*!
 * Session Globals
 * Mutable mapping shared by a plugin and its event handlers
 */

use crate::script::Value;
use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Cloneable handle over one session's globals; clones share state
#[derive(Clone, Default)]
pub struct Globals {
    inner: Arc<RwLock<HashMap<String, Value, RandomState>>>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.read().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.inner.write().insert(name.to_string(), value.into());
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.inner.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    /// Sorted key list
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Drop every entry, releasing any handles stored by the plugin
    pub fn clear(&self) {
        // Values may own capabilities; drop them outside the lock
        let drained: Vec<Value> = self.inner.write().drain().map(|(_, v)| v).collect();
        drop(drained);
    }

    pub fn ptr_eq(&self, other: &Globals) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// JSON view for host inspection
    pub fn to_json(&self) -> serde_json::Value {
        let map = self.inner.read();
        let object = map
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(object)
    }
}

impl std::fmt::Debug for Globals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Globals").field("keys", &self.keys()).finish()
    }
}
