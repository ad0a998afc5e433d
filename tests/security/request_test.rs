/*!
 * Outbound Request Tests
 * Placeholder fills, namespaced routing and deferred delivery
 */

use futures::future::BoxFuture;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sandbox_mediator::{
    AuditKind, HostTree, MediatorConfig, NodeKind, RequestError, RequestResult, RequestRouter,
    RequestTransport, SandboxError, SandboxHost, Session, WebRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn setup(router: Arc<RequestRouter>) -> (HostTree, Session) {
    let tree = HostTree::new();
    let mount = tree.create_element("div");
    tree.append_child(tree.document_root(), mount).unwrap();
    let host = SandboxHost::new(tree.clone(), router);
    let session = host.spawn("alice", mount).unwrap();
    (tree, session)
}

/// Transport whose requests never complete
struct Stalled;

impl RequestTransport for Stalled {
    fn fetch(&self, _path: &str) -> BoxFuture<'static, RequestResult<String>> {
        Box::pin(futures::future::pending())
    }
}

#[tokio::test]
async fn test_placeholder_fills_after_settle() {
    let router = Arc::new(RequestRouter::new());
    router
        .register("alice", "fill_placeholder", |req: &WebRequest| {
            Ok(format!("hello {}", req.path()))
        })
        .unwrap();
    let (tree, session) = setup(router);

    let placeholder = session.root().append_placeholder("banner").unwrap();
    assert_eq!(
        tree.attribute(placeholder.node_id(), "class").unwrap().as_deref(),
        Some("placeholder")
    );
    // Returned immediately, content not yet there
    assert!(tree.children(placeholder.node_id()).unwrap().is_empty());
    assert_eq!(session.pending(), 1);

    assert_eq!(session.settle().await, 1);

    let children = tree.children(placeholder.node_id()).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(tree.kind(children[0]).unwrap(), NodeKind::Text("hello banner".into()));
    assert_eq!(session.pending(), 0);
}

#[tokio::test]
async fn test_requests_are_namespaced_by_context() {
    let router = Arc::new(RequestRouter::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    router
        .register("alice", "ping", move |req: &WebRequest| {
            log.lock().push(req.to_string());
            Ok("pong".to_string())
        })
        .unwrap();
    let (_tree, session) = setup(router);

    session.run("context.request('ping/1');").unwrap();
    session.settle().await;

    assert_eq!(*seen.lock(), vec!["alice/1".to_string()]);
}

#[tokio::test]
async fn test_failures_reach_the_callback() {
    let (_tree, session) = setup(Arc::new(RequestRouter::new()));
    let result = Arc::new(Mutex::new(None));
    let slot = result.clone();

    session
        .context()
        .request("missing/route", Box::new(move |r| *slot.lock() = Some(r)))
        .unwrap();
    assert_eq!(session.settle().await, 1);

    assert_eq!(
        *result.lock(),
        Some(Err(SandboxError::RequestFailure(RequestError::NoHandler {
            path: "/ajax/alice/missing/route".into()
        })))
    );
    let events = session.context().audit().for_plugin("alice", 1);
    assert!(matches!(events[0].kind, AuditKind::RequestFailure { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_requests_time_out() {
    let tree = HostTree::new();
    let mount = tree.create_element("div");
    tree.append_child(tree.document_root(), mount).unwrap();
    let config = MediatorConfig {
        request_timeout_ms: 50,
        ..MediatorConfig::default()
    };
    let host = SandboxHost::new(tree.clone(), Arc::new(Stalled)).with_config(config);
    let session = host.spawn("alice", mount).unwrap();

    let result = Arc::new(Mutex::new(None));
    let slot = result.clone();
    session
        .context()
        .request("slow", Box::new(move |r| *slot.lock() = Some(r)))
        .unwrap();
    session.settle().await;

    assert_eq!(
        *result.lock(),
        Some(Err(SandboxError::RequestFailure(RequestError::TimedOut {
            path: "/ajax/alice/slow".into(),
            timeout_ms: 50
        })))
    );
}

#[test]
fn test_without_runtime_placeholder_stays_empty() {
    let router = Arc::new(RequestRouter::new().with_default(|_: &WebRequest| Ok("x".to_string())));
    let (tree, session) = setup(router);

    let placeholder = session.root().append_placeholder("banner").unwrap();
    assert_eq!(session.pump(), 1);
    assert!(tree.children(placeholder.node_id()).unwrap().is_empty());
    assert_eq!(session.context().audit().len(), 1);
}

#[tokio::test]
async fn test_completions_wait_for_pump() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let router = Arc::new(RequestRouter::new());
    router
        .register("alice", "count", move |_: &WebRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(String::new())
        })
        .unwrap();
    let (_tree, session) = setup(router);

    let delivered = Arc::new(AtomicUsize::new(0));
    let flag = delivered.clone();
    session
        .context()
        .request("count", Box::new(move |_| {
            flag.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

    tokio::task::yield_now().await;
    assert_eq!(delivered.load(Ordering::SeqCst), 0);

    session.settle().await;
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ended_session_drops_completions() {
    let router = Arc::new(RequestRouter::new().with_default(|_: &WebRequest| Ok("late".to_string())));
    let (tree, session) = setup(router);

    let placeholder = session.root().append_placeholder("banner").unwrap();
    tokio::task::yield_now().await;
    session.end();

    assert_eq!(session.pump(), 0);
    assert!(tree.children(placeholder.node_id()).unwrap().is_empty());
}
