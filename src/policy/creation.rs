/*!
 * Creation Policy
 * Denylist of node kinds a plugin may never instantiate
 */

use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::limits::DEFAULT_DENIED_KINDS;
use ahash::RandomState;
use std::collections::HashSet;

/// Canonical form a kind is compared in
///
/// Host element names are case-insensitive, so `SCRIPT` is still a script.
#[inline]
#[must_use]
pub fn normalize_kind(kind: &str) -> String {
    kind.trim().to_ascii_lowercase()
}

/// Default policy: everything except `script` and `iframe`
#[inline]
#[must_use]
pub fn allowed(kind: &str) -> bool {
    let kind = normalize_kind(kind);
    !DEFAULT_DENIED_KINDS.contains(&kind.as_str())
}

/// Configurable creation policy
#[derive(Debug, Clone)]
pub struct CreationPolicy {
    denied: HashSet<String, RandomState>,
}

impl Default for CreationPolicy {
    fn default() -> Self {
        let mut denied = HashSet::with_hasher(RandomState::new());
        denied.extend(DEFAULT_DENIED_KINDS.iter().map(|k| k.to_string()));
        Self { denied }
    }
}

impl CreationPolicy {
    /// Deny an additional kind
    pub fn with_denied(mut self, kind: &str) -> Self {
        self.denied.insert(normalize_kind(kind));
        self
    }

    #[must_use]
    pub fn allows(&self, kind: &str) -> bool {
        !self.denied.contains(&normalize_kind(kind))
    }

    /// Reject denied kinds with `ForbiddenNodeKind`
    pub fn check(&self, kind: &str) -> SandboxResult<()> {
        if self.allows(kind) {
            Ok(())
        } else {
            Err(SandboxError::ForbiddenNodeKind {
                kind: kind.to_string(),
            })
        }
    }

    /// Denied kinds, sorted
    pub fn denied(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.denied.iter().cloned().collect();
        kinds.sort();
        kinds
    }
}
