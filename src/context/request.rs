/*!
 * Outbound Requests
 * Transport seam, request paths and the per-context handler router
 */

use crate::core::errors::{RequestError, RequestResult};
use crate::core::limits::DEFAULT_REQUEST_ROOT;
use ahash::RandomState;
use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Carries a namespaced request path to whatever serves it
///
/// The future is spawned on the ambient tokio runtime, so it must be
/// `'static`.
pub trait RequestTransport: Send + Sync {
    fn fetch(&self, path: &str) -> BoxFuture<'static, RequestResult<String>>;
}

/// A request path split into its owning context and the remaining route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebRequest {
    context: String,
    path: String,
}

impl WebRequest {
    pub fn new(context: &str, path: &str) -> Self {
        Self {
            context: context.to_string(),
            path: path.trim_matches('/').to_string(),
        }
    }

    /// Parse `<root>/<context>/<path>`
    pub fn parse(root: &str, full: &str) -> RequestResult<Self> {
        let root = root.trim_end_matches('/');
        let rest = full
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| RequestError::MalformedPath(full.to_string()))?;
        let (context, path) = rest.split_once('/').unwrap_or((rest, ""));
        if context.is_empty() {
            return Err(RequestError::MalformedPath(full.to_string()));
        }
        Ok(Self::new(context, path))
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// First path segment, used for handler dispatch
    pub fn prefix(&self) -> &str {
        self.path.split('/').next().unwrap_or("")
    }

    /// The same request with its first path segment removed
    pub fn shift(&self) -> Self {
        let rest = self.path.split_once('/').map(|(_, r)| r).unwrap_or("");
        Self::new(&self.context, rest)
    }
}

impl fmt::Display for WebRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.context, self.path)
    }
}

/// Serves one request route
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: &WebRequest) -> RequestResult<String>;
}

impl<F> RequestHandler for F
where
    F: Fn(&WebRequest) -> RequestResult<String> + Send + Sync,
{
    fn handle(&self, request: &WebRequest) -> RequestResult<String> {
        self(request)
    }
}

type HandlerTable = HashMap<String, Arc<dyn RequestHandler>, RandomState>;

/// In-process transport dispatching on `(context, prefix)`
pub struct RequestRouter {
    root: String,
    handlers: DashMap<String, HandlerTable, RandomState>,
    fallback: Option<Arc<dyn RequestHandler>>,
}

impl RequestRouter {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_REQUEST_ROOT)
    }

    pub fn with_root(root: &str) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
            handlers: DashMap::with_hasher(RandomState::new()),
            fallback: None,
        }
    }

    /// Handler of last resort for unmatched prefixes
    pub fn with_default(mut self, handler: impl RequestHandler + 'static) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Register a handler for `prefix` requests issued by `context`
    pub fn register(
        &self,
        context: &str,
        prefix: &str,
        handler: impl RequestHandler + 'static,
    ) -> RequestResult<()> {
        let mut table = self
            .handlers
            .entry(context.to_string())
            .or_insert_with(|| HashMap::with_hasher(RandomState::new()));
        if table.contains_key(prefix) {
            return Err(RequestError::DuplicateHandler {
                context: context.to_string(),
                prefix: prefix.to_string(),
            });
        }
        table.insert(prefix.to_string(), Arc::new(handler));
        info!("Registered '{}' request handler for {}", prefix, context);
        Ok(())
    }

    /// Drop every handler registered for `context`
    pub fn unload(&self, context: &str) -> usize {
        self.handlers
            .remove(context)
            .map(|(_, table)| table.len())
            .unwrap_or(0)
    }

    /// Registered prefixes for `context`, sorted
    pub fn prefixes(&self, context: &str) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .handlers
            .get(context)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default();
        prefixes.sort();
        prefixes
    }

    /// Resolve and run the handler for a full request path
    pub fn dispatch(&self, full: &str) -> RequestResult<String> {
        let request = WebRequest::parse(&self.root, full)?;
        let handler = self
            .handlers
            .get(request.context())
            .and_then(|table| table.get(request.prefix()).cloned())
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| RequestError::NoHandler {
                path: full.to_string(),
            })?;
        debug!("Dispatching request {}", request);
        handler.handle(&request.shift())
    }
}

impl Default for RequestRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTransport for RequestRouter {
    fn fetch(&self, path: &str) -> BoxFuture<'static, RequestResult<String>> {
        Box::pin(future::ready(self.dispatch(path)))
    }
}

impl<T: RequestTransport + ?Sized> RequestTransport for Arc<T> {
    fn fetch(&self, path: &str) -> BoxFuture<'static, RequestResult<String>> {
        (**self).fetch(path)
    }
}
