/*!
 * Resource Namer
 * Scopes plugin-supplied locators beneath the plugin's own namespace
 */

use std::fmt;

/// Rewrite `requested` to `<root>/<context>/<requested>`
///
/// Total and unconditional: already-qualified locators and `..` segments are
/// not special-cased.
#[must_use]
pub fn rewrite(root: &str, context: &str, requested: &str) -> String {
    format!("{}/{}/{}", root.trim_end_matches('/'), context, requested)
}

/// Namer bound to one root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNamer {
    root: String,
}

impl ResourceNamer {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    #[must_use]
    pub fn rewrite(&self, context: &str, requested: &str) -> String {
        rewrite(&self.root, context, requested)
    }

    /// Prefix every path rewritten for `context` starts with
    pub fn prefix_for(&self, context: &str) -> String {
        format!("{}/{}/", self.root, context)
    }
}

impl fmt::Display for ResourceNamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}
