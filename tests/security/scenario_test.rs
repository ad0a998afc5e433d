/*!
 * End-to-End Scenarios
 * A well-behaved plugin and a hostile one against the same host tree
 */

use pretty_assertions::assert_eq;
use sandbox_mediator::{
    EventKind, HostTree, MemorySink, NodeId, RequestRouter, SandboxError, SandboxHost, Session,
    Value,
};
use std::sync::Arc;

const WICKED: &str = r#"
'use strict';

try { document.write('EVIL HACKERY'); }
catch (e) { context.log('document.write() not allowed (good!)'); }

try { alert('EVIL HACKERY'); }
catch (e) { context.log('alert() not allowed (good!)'); }

if (root.parentNode)
    context.log('security error: root.parentNode != null');

try { context.name = 'HACKED ' + context.name; }
catch (e) { context.log('modifying context.name not allowed (good!)'); }

var div = root.appendElement('div');
try { div.innerHTML = '<script type="text/javascript" src="evil.js"></script>'; }
catch (e) { context.log('innerHTML not reachable (good!)'); }

try
{
    var s = root.appendElement('script');
    s.src = 'http://www.google.com/';
    context.log('Script created a <script/> element (bad!)');
}
catch (e) { context.log('Creating <script/> element not allowed (good!)'); }

var imageSize = 256;

var remoteImage = root.appendElement('img');
remoteImage.src = 'www.google.com/images/logos/ps_logo2.png';
remoteImage.alt = 'Should be blank, but CLICK ME!';
remoteImage.height = imageSize;
remoteImage.width = imageSize;

context.globals.clicks = 0;
remoteImage.onclick = 'clicks++;';

context.globals.errors = 0;
remoteImage.onerror = "try { rootContext.log('logged VIA ROOT CONTEXT!!!!'); } catch (e) { escape = 'blocked'; } if (this.parentNode) leaked = this.parentNode; if (errors < 10) this.src = 'missing.png'; errors++; this.style.opacity = 0.5; this.style.position = 'absolute';";

try
{
    var remoteIFrame = root.appendElement('iframe');
    remoteIFrame.src = 'evil.html';
}
catch (e) { context.log('iframe creation blocked (good, for now anyway)'); }

return 42;
"#;

fn setup(name: &str) -> (HostTree, NodeId, Arc<MemorySink>, Session) {
    let tree = HostTree::new();
    let mount = tree.create_element("div");
    tree.append_child(tree.document_root(), mount).unwrap();
    let sink = Arc::new(MemorySink::new());
    let host = SandboxHost::new(tree.clone(), Arc::new(RequestRouter::new())).with_sink(sink.clone());
    let session = host.spawn(name, mount).unwrap();
    (tree, mount, sink, session)
}

#[test]
fn test_alice_creates_namespaced_image() {
    let (tree, mount, _, session) = setup("alice");
    let root = session.root();

    assert!(matches!(
        root.append_element("script"),
        Err(SandboxError::ForbiddenNodeKind { .. })
    ));
    let img = root.append_element("img").unwrap();
    img.set_src("logo.png").unwrap();

    let snapshot = tree.snapshot(mount).unwrap();
    let images = snapshot.find_all("img");
    assert_eq!(images.len(), 1);
    assert!(snapshot.find_all("script").is_empty());
    let src = images[0].attributes.get("src").unwrap();
    assert!(src.starts_with("/static/alice/"));
}

#[test]
fn test_alice_scenario_from_plugin_source() {
    let (tree, mount, _, session) = setup("alice");

    let result = session.run(
        "var blocked = false; \
         try { root.appendElement('script'); } catch (e) { blocked = true; } \
         if (!blocked) throw 'script element was created'; \
         var img = root.appendElement('img'); \
         img.src = 'logo.png'; \
         return img.src;",
    );

    assert_eq!(result.unwrap(), Value::from("/static/alice/logo.png"));
    assert_eq!(tree.snapshot(mount).unwrap().find_all("img").len(), 1);
}

#[test]
fn test_wicked_plugin_is_contained() {
    let (tree, mount, sink, session) = setup("wicked");

    assert_eq!(session.run(WICKED).unwrap(), Value::from(42));
    assert_eq!(
        sink.messages(),
        vec![
            "document.write() not allowed (good!)",
            "alert() not allowed (good!)",
            "modifying context.name not allowed (good!)",
            "innerHTML not reachable (good!)",
            "Creating <script/> element not allowed (good!)",
            "iframe creation blocked (good, for now anyway)",
        ]
    );
    assert_eq!(session.context().name(), "wicked");

    let snapshot = tree.snapshot(mount).unwrap();
    assert!(snapshot.find_all("script").is_empty());
    assert!(snapshot.find_all("iframe").is_empty());
    assert_eq!(snapshot.children.len(), 2);

    let images = snapshot.find_all("img");
    assert_eq!(images.len(), 1);
    let image = images[0];
    assert_eq!(
        image.attributes.get("src").map(String::as_str),
        Some("/static/wicked/www.google.com/images/logos/ps_logo2.png")
    );
    assert_eq!(image.attributes.get("height").map(String::as_str), Some("256"));
    assert_eq!(image.listeners, vec![EventKind::Click, EventKind::Error]);

    // script, name, innerHTML, iframe
    assert_eq!(session.context().audit().denial_count("wicked"), 4);
}

#[test]
fn test_wicked_error_handler_stays_in_its_box() {
    let (tree, mount, _, session) = setup("wicked");
    session.run(WICKED).unwrap();

    let image = tree.snapshot(mount).unwrap().find_all("img")[0].id;
    for _ in 0..12 {
        assert!(tree.dispatch(image, EventKind::Error).unwrap());
    }
    tree.dispatch(image, EventKind::Click).unwrap();

    let globals = session.context().globals();
    assert_eq!(globals.get("errors"), Some(Value::from(12)));
    assert_eq!(globals.get("clicks"), Some(Value::from(1)));
    assert_eq!(globals.get("escape"), Some(Value::from("blocked")));
    assert!(globals.get("leaked").is_none());

    assert_eq!(
        tree.attribute(image, "src").unwrap().as_deref(),
        Some("/static/wicked/missing.png")
    );
    assert_eq!(tree.style_property(image, "opacity").unwrap().as_deref(), Some("0.5"));
    assert_eq!(
        tree.style_property(image, "position").unwrap().as_deref(),
        Some("absolute")
    );
}
