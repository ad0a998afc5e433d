/*!
 * Event Binder Tests
 * Handler compilation, receiver binding and failure containment
 */

use pretty_assertions::assert_eq;
use sandbox_mediator::{
    AuditKind, EventKind, HostTree, MediatorConfig, MemorySink, RequestRouter, SandboxError,
    SandboxHost, ScriptError, Session, Value,
};
use std::sync::Arc;

fn setup_with(config: MediatorConfig) -> (HostTree, Arc<MemorySink>, Session) {
    let tree = HostTree::new();
    let mount = tree.create_element("div");
    tree.append_child(tree.document_root(), mount).unwrap();
    let sink = Arc::new(MemorySink::new());
    let host = SandboxHost::new(tree.clone(), Arc::new(RequestRouter::new()))
        .with_config(config)
        .with_sink(sink.clone());
    let session = host.spawn("alice", mount).unwrap();
    (tree, sink, session)
}

fn setup() -> (HostTree, Arc<MemorySink>, Session) {
    setup_with(MediatorConfig::default())
}

#[test]
fn test_receiver_is_the_capability_not_the_raw_node() {
    let (tree, _, session) = setup();
    let img = session.root().append_element("img").unwrap();
    img.set_onerror("if (this.parentNode) seen = 'parent'; else seen = 'no parent';")
        .unwrap();

    // The raw node does have a parent
    assert!(tree.parent(img.node_id()).unwrap().is_some());

    assert!(tree.dispatch(img.node_id(), EventKind::Error).unwrap());
    assert_eq!(
        session.context().globals().get("seen"),
        Some(Value::from("no parent"))
    );
}

#[test]
fn test_receiver_survives_later_capabilities() {
    let (tree, _, session) = setup();
    let root = session.root();
    let img = root.append_element("img").unwrap();
    img.set_onclick("this.alt = 'clicked';").unwrap();

    let others: Vec<_> = (0..16).map(|_| root.append_element("span").unwrap()).collect();
    tree.dispatch(img.node_id(), EventKind::Click).unwrap();

    assert_eq!(tree.attribute(img.node_id(), "alt").unwrap().as_deref(), Some("clicked"));
    for other in others {
        assert_eq!(tree.attribute(other.node_id(), "alt").unwrap(), None);
    }
}

#[test]
fn test_handlers_see_only_globals() {
    let (tree, sink, session) = setup();
    let img = session.root().append_element("img").unwrap();
    img.set_onclick("context.log('escaped');").unwrap();

    assert!(tree.dispatch(img.node_id(), EventKind::Click).unwrap());
    assert!(sink.messages().is_empty());

    let events = session.context().audit().for_plugin("alice", 10);
    assert!(matches!(
        &events[0].kind,
        AuditKind::HandlerFailure { event, reason }
            if event == "onclick" && reason == "ReferenceError: context is not defined"
    ));
}

#[test]
fn test_globals_persist_across_invocations() {
    let (tree, _, session) = setup();
    let globals = session.context().globals();
    globals.set("clicks", 0);

    let img = session.root().append_element("img").unwrap();
    img.set_onclick("clicks++;").unwrap();
    img.set_onmouseover("seen = clicks;").unwrap();

    for _ in 0..3 {
        tree.dispatch(img.node_id(), EventKind::Click).unwrap();
    }
    tree.dispatch(img.node_id(), EventKind::MouseOver).unwrap();

    assert_eq!(globals.get("clicks"), Some(Value::from(3)));
    assert_eq!(globals.get("seen"), Some(Value::from(3)));
}

#[test]
fn test_compilation_failure_is_local() {
    let (tree, _, session) = setup();
    let img = session.root().append_element("img").unwrap();

    img.set_onload("loaded = true;").unwrap();
    assert!(tree.has_listener(img.node_id(), EventKind::Load).unwrap());

    let err = img.set_onload("loaded = ;").unwrap_err();
    assert!(matches!(
        err,
        SandboxError::CompilationFailure { ref event, .. } if event == "onload"
    ));
    // The previous binding is gone, not silently kept
    assert!(!tree.has_listener(img.node_id(), EventKind::Load).unwrap());
    assert!(img.handler(EventKind::Load).is_none());

    // Other operations keep working
    img.set_onload("loaded = 'again';").unwrap();
    tree.dispatch(img.node_id(), EventKind::Load).unwrap();
    assert_eq!(
        session.context().globals().get("loaded"),
        Some(Value::from("again"))
    );
}

#[test]
fn test_deeply_nested_handler_fails_to_compile() {
    let (tree, _, session) = setup();
    let img = session.root().append_element("img").unwrap();
    let source = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
    assert!(source.len() < MediatorConfig::default().max_handler_source);

    let err = img.set_handler(EventKind::Click, &source).unwrap_err();
    assert!(matches!(
        err,
        SandboxError::CompilationFailure { ref event, .. } if event == "onclick"
    ));
    assert!(!tree.has_listener(img.node_id(), EventKind::Click).unwrap());
    assert!(session.is_live());
    assert!(matches!(
        session.context().audit().for_plugin("alice", 1)[0].kind,
        AuditKind::CompilationFailure { .. }
    ));

    // Same from plugin code: the assignment is swallowed, the script goes on
    let script = format!("root.onclick = '{}x'; return 'done';", "!".repeat(20_000));
    assert_eq!(session.run(&script).unwrap(), Value::from("done"));
    assert!(!tree.has_listener(session.root().node_id(), EventKind::Click).unwrap());

    img.set_onclick("clicked = true;").unwrap();
    tree.dispatch(img.node_id(), EventKind::Click).unwrap();
    assert_eq!(session.context().globals().get("clicked"), Some(Value::from(true)));
}

#[test]
fn test_deeply_nested_plugin_source_is_a_syntax_error() {
    let (_, _, session) = setup();
    let source = format!("x = {}1{};", "(".repeat(50_000), ")".repeat(50_000));

    assert!(matches!(session.run(&source), Err(ScriptError::Syntax { .. })));
    assert!(session.is_live());
    assert_eq!(session.run("return 1 + 1;").unwrap(), Value::from(2));
}

#[test]
fn test_handlers_cached_per_event() {
    let (_, _, session) = setup();
    let img = session.root().append_element("img").unwrap();
    img.set_onclick("a = 1;").unwrap();
    img.set_onmouseout("b = 2;").unwrap();

    assert_eq!(img.handler(EventKind::Click).unwrap().source(), "a = 1;");
    assert_eq!(img.handler(EventKind::MouseOut).unwrap().source(), "b = 2;");
    assert!(img.handler(EventKind::Error).is_none());
}

#[test]
fn test_oversized_source_is_rejected() {
    let config = MediatorConfig {
        max_handler_source: 8,
        ..MediatorConfig::default()
    };
    let (tree, _, session) = setup_with(config);
    let img = session.root().append_element("img").unwrap();

    assert!(img.set_onclick("a = 'far too long';").is_err());
    assert!(!tree.has_listener(img.node_id(), EventKind::Click).unwrap());
}

#[test]
fn test_ended_session_stops_stimuli() {
    let (tree, _, session) = setup();
    let img = session.root().append_element("img").unwrap();
    img.set_onclick("clicked = true;").unwrap();

    session.end();

    assert!(!tree.has_listener(img.node_id(), EventKind::Click).unwrap());
    assert!(!tree.dispatch(img.node_id(), EventKind::Click).unwrap());
    assert!(session.context().globals().is_empty());
}
