/*!
 * Node Capability Tests
 * Mediated structure and property access on the host tree
 */

use pretty_assertions::assert_eq;
use sandbox_mediator::{
    EventKind, HostTree, NodeKind, Property, RequestRouter, SandboxError, SandboxHost, Session,
};
use std::sync::Arc;

fn setup(name: &str) -> (HostTree, Session) {
    let tree = HostTree::new();
    let mount = tree.create_element("div");
    tree.append_child(tree.document_root(), mount).unwrap();
    let host = SandboxHost::new(tree.clone(), Arc::new(RequestRouter::new()));
    let session = host.spawn(name, mount).unwrap();
    (tree, session)
}

#[test]
fn test_forbidden_kinds_leave_tree_unchanged() {
    let (tree, session) = setup("alice");
    let root = session.root();
    let nodes_before = tree.len();

    for kind in ["script", "iframe", "SCRIPT"] {
        assert_eq!(
            root.append_element(kind).unwrap_err(),
            SandboxError::ForbiddenNodeKind { kind: kind.into() }
        );
    }

    assert_eq!(tree.len(), nodes_before);
    assert!(tree.children(root.node_id()).unwrap().is_empty());
    assert_eq!(session.context().audit().denial_count("alice"), 3);
}

#[test]
fn test_allowed_kinds_affect_only_the_new_child() {
    let (tree, session) = setup("alice");
    let root = session.root();

    for kind in ["div", "img", "span"] {
        let child = root.append_element(kind).unwrap();
        assert_eq!(child.kind().unwrap(), NodeKind::Element(kind.into()));
        child.set_alt(kind).unwrap();
        assert_eq!(tree.attribute(child.node_id(), "alt").unwrap().as_deref(), Some(kind));
    }

    assert_eq!(tree.attribute(root.node_id(), "alt").unwrap(), None);
    assert_eq!(tree.children(root.node_id()).unwrap().len(), 3);
}

#[test]
fn test_src_is_always_namespaced() {
    let (tree, session) = setup("alice");
    let img = session.root().append_element("img").unwrap();

    img.set_src("logo.png").unwrap();
    assert_eq!(
        tree.attribute(img.node_id(), "src").unwrap().as_deref(),
        Some("/static/alice/logo.png")
    );

    img.set_src("http://evil.example/x.png").unwrap();
    assert_eq!(
        img.get(Property::Src).unwrap().as_deref(),
        Some("/static/alice/http://evil.example/x.png")
    );
}

#[test]
fn test_pass_through_properties() {
    let (tree, session) = setup("alice");
    let input = session.root().append_element("input").unwrap();

    input.set_type("text").unwrap();
    input.set_value("hello").unwrap();
    input.set_class("wide").unwrap();
    input.set_height("10").unwrap();
    input.set_width("200").unwrap();

    let snapshot = tree.snapshot(input.node_id()).unwrap();
    assert_eq!(snapshot.attributes.get("type").map(String::as_str), Some("text"));
    assert_eq!(snapshot.attributes.get("value").map(String::as_str), Some("hello"));
    assert_eq!(snapshot.attributes.get("class").map(String::as_str), Some("wide"));
    assert_eq!(snapshot.attributes.get("height").map(String::as_str), Some("10"));
    assert_eq!(snapshot.attributes.get("width").map(String::as_str), Some("200"));
}

#[test]
fn test_root_never_exposes_parent() {
    let (tree, session) = setup("alice");
    let root = session.root();

    assert_eq!(tree.parent(root.node_id()).unwrap(), Some(tree.document_root()));
    assert!(root.parent().is_none());
    assert!(root.append_text("x").unwrap().parent().is_none());
}

#[test]
fn test_append_text_and_clear() {
    let (tree, session) = setup("alice");
    let root = session.root();

    let text = root.append_text("hello").unwrap();
    root.append_text("world").unwrap();
    assert_eq!(text.kind().unwrap(), NodeKind::Text("hello".into()));
    assert_eq!(tree.children(root.node_id()).unwrap().len(), 2);

    root.clear().unwrap();
    assert!(tree.children(root.node_id()).unwrap().is_empty());
    // Idempotent
    root.clear().unwrap();
    assert_eq!(text.kind().unwrap_err(), SandboxError::NodeNotFound(text.node_id()));
}

#[test]
fn test_failed_append_under_text_creates_nothing() {
    let (tree, session) = setup("alice");
    let leaf = session.root().append_text("leaf").unwrap();
    let nodes_before = tree.len();

    assert!(matches!(
        leaf.append_element("div"),
        Err(SandboxError::InvalidNode(_))
    ));
    assert!(matches!(
        leaf.append_text("more"),
        Err(SandboxError::InvalidNode(_))
    ));
    assert!(leaf.append_placeholder("banner").is_err());

    assert_eq!(tree.len(), nodes_before);
    assert_eq!(session.pending(), 0);
}

#[test]
fn test_repeated_clear_does_not_grow_the_tree() {
    let (tree, session) = setup("alice");
    let root = session.root();
    let nodes_before = tree.len();

    for _ in 0..1_000 {
        root.append_element("p").unwrap().append_text("x").unwrap();
        root.clear().unwrap();
    }

    assert_eq!(tree.len(), nodes_before);
}

#[test]
fn test_clear_releases_handlers_of_removed_nodes() {
    let (tree, session) = setup("alice");
    let root = session.root();
    let button = root.append_element("button").unwrap();
    button.set_onclick("clicks++;").unwrap();
    let node = button.node_id();
    drop(button);

    root.clear().unwrap();
    assert!(tree.dispatch(node, EventKind::Click).is_err());
    assert_eq!(session.context().globals().get("clicks"), None);
    // Ending the session after the node is gone is harmless
    session.end();
    assert!(!session.is_live());
}

#[test]
fn test_style_handle_is_live_but_property_read_only() {
    let (tree, session) = setup("alice");
    let root = session.root();

    assert_eq!(
        root.set(Property::Style, "display: none"),
        Err(SandboxError::ReadOnlyPropertyViolation {
            property: "style".into()
        })
    );

    let style = root.style().unwrap();
    style.set("opacity", "0.5").unwrap();
    assert_eq!(
        tree.style_property(root.node_id(), "opacity").unwrap().as_deref(),
        Some("0.5")
    );
    assert_eq!(style.get("opacity").unwrap().as_deref(), Some("0.5"));
}

#[test]
fn test_unknown_properties_are_unreachable() {
    let (tree, session) = setup("alice");
    let div = session.root().append_element("div").unwrap();

    assert_eq!(
        div.set_property("innerHTML", "<script></script>"),
        Err(SandboxError::UnknownProperty {
            property: "innerHTML".into()
        })
    );
    assert_eq!(tree.attribute(div.node_id(), "innerHTML").unwrap(), None);
}

#[test]
fn test_ended_session_disables_capabilities() {
    let (_tree, session) = setup("alice");
    let root = session.root().clone();
    session.end();

    assert_eq!(
        root.append_text("late").unwrap_err(),
        SandboxError::SessionEnded("alice".into())
    );
    assert!(root.style().is_err());
}
