/*!
 * Mediator Configuration
 * Serde-backed settings with environment overrides
 */

use super::limits::{
    DEFAULT_PLACEHOLDER_ROUTE, DEFAULT_REQUEST_ROOT, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_STATIC_ROOT, MAX_AUDIT_EVENTS, MAX_HANDLER_SOURCE,
};
use crate::policy::{CreationPolicy, ResourceNamer};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Settings shared by every session a host spawns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MediatorConfig {
    /// Root prefixed to every rewritten `src`
    pub static_root: String,
    /// Root prefixed to every outbound request path
    pub request_root: String,
    /// Request route used by placeholder fills
    pub placeholder_route: String,
    /// Kinds denied in addition to `script` and `iframe`
    pub denied_kinds: Vec<String>,
    pub request_timeout_ms: u64,
    pub max_handler_source: usize,
    pub audit_capacity: usize,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            static_root: DEFAULT_STATIC_ROOT.to_string(),
            request_root: DEFAULT_REQUEST_ROOT.to_string(),
            placeholder_route: DEFAULT_PLACEHOLDER_ROUTE.to_string(),
            denied_kinds: Vec::new(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            max_handler_source: MAX_HANDLER_SOURCE,
            audit_capacity: MAX_AUDIT_EVENTS,
        }
    }
}

impl MediatorConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a JSON configuration file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Defaults overridden by environment variables
    ///
    /// Environment variables:
    /// - SANDBOX_STATIC_ROOT: static resource root (default: /static)
    /// - SANDBOX_REQUEST_ROOT: request root (default: /ajax)
    /// - SANDBOX_DENIED_KINDS: comma-separated extra denied kinds
    /// - SANDBOX_REQUEST_TIMEOUT_MS: request timeout in milliseconds
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("SANDBOX_STATIC_ROOT") {
            config.static_root = root;
        }
        if let Ok(root) = std::env::var("SANDBOX_REQUEST_ROOT") {
            config.request_root = root;
        }
        if let Ok(kinds) = std::env::var("SANDBOX_DENIED_KINDS") {
            config.denied_kinds = kinds
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(raw) = std::env::var("SANDBOX_REQUEST_TIMEOUT_MS") {
            match raw.parse() {
                Ok(ms) => config.request_timeout_ms = ms,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid SANDBOX_REQUEST_TIMEOUT_MS"),
            }
        }

        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Creation policy with the configured additions
    pub fn creation_policy(&self) -> CreationPolicy {
        self.denied_kinds
            .iter()
            .fold(CreationPolicy::default(), |policy, kind| policy.with_denied(kind))
    }

    pub fn static_namer(&self) -> ResourceNamer {
        ResourceNamer::new(&self.static_root)
    }

    pub fn request_namer(&self) -> ResourceNamer {
        ResourceNamer::new(&self.request_root)
    }
}
