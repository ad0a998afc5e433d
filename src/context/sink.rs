/*!
 * Log Sinks
 */

use parking_lot::Mutex;
use tracing::info;

/// Destination for plugin `context.log` output
pub trait LogSink: Send + Sync {
    fn log(&self, plugin: &str, message: &str);
}

/// Forwards plugin messages to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, plugin: &str, message: &str) {
        info!(plugin = %plugin, "{}", message);
    }
}

/// Captures plugin messages in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(String, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in arrival order, without plugin names
    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|(_, m)| m.clone()).collect()
    }

    /// `(plugin, message)` pairs in arrival order
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, plugin: &str, message: &str) {
        self.entries
            .lock()
            .push((plugin.to_string(), message.to_string()));
    }
}
