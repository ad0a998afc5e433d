/*!
 * Creation Policy and Resource Namer Tests
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sandbox_mediator::policy::{allowed, rewrite};
use sandbox_mediator::{CreationPolicy, MediatorConfig, ResourceNamer, SandboxError};

#[test]
fn test_denylist_is_case_insensitive() {
    for kind in ["script", "SCRIPT", "Script", " iframe ", "IFRAME"] {
        assert!(!allowed(kind), "{kind} should be denied");
    }
    for kind in ["div", "img", "span", "a", "scripts"] {
        assert!(allowed(kind), "{kind} should be allowed");
    }
}

#[test]
fn test_check_reports_requested_kind() {
    let policy = CreationPolicy::default();
    assert_eq!(
        policy.check("IFrame"),
        Err(SandboxError::ForbiddenNodeKind {
            kind: "IFrame".into()
        })
    );
    assert_eq!(
        policy.check("IFrame").unwrap_err().to_string(),
        "Sandboxed script attempted to create a IFrame element"
    );
}

#[test]
fn test_configured_kinds_extend_defaults() {
    let config = MediatorConfig {
        denied_kinds: vec!["embed".into(), "Object".into()],
        ..MediatorConfig::default()
    };
    let policy = config.creation_policy();
    assert_eq!(policy.denied(), vec!["embed", "iframe", "object", "script"]);
    assert!(!policy.allows("OBJECT"));
    assert!(policy.allows("img"));
}

#[test]
fn test_namer_scopes_every_locator() {
    assert_eq!(rewrite("/static", "alice", "images/x.png"), "/static/alice/images/x.png");
    assert_eq!(
        rewrite("/static", "alice", "http://evil.example/x.png"),
        "/static/alice/http://evil.example/x.png"
    );
    // Traversal sequences pass through untouched
    assert_eq!(rewrite("/static", "alice", "../bob/x.png"), "/static/alice/../bob/x.png");
}

#[test]
fn test_namer_trims_root_slash() {
    let namer = ResourceNamer::new("/assets/");
    assert_eq!(namer.rewrite("bob", "a.css"), "/assets/bob/a.css");
    assert_eq!(namer.prefix_for("bob"), "/assets/bob/");
}

proptest! {
    #[test]
    fn prop_allowed_matches_denylist(kind in "[a-zA-Z]{1,10}") {
        let lower = kind.to_ascii_lowercase();
        prop_assert_eq!(allowed(&kind), lower != "script" && lower != "iframe");
    }

    #[test]
    fn prop_rewrite_is_always_scoped(
        context in "[a-z]{1,8}",
        requested in "[ -~]{0,40}",
    ) {
        let namer = ResourceNamer::new("/static");
        let path = namer.rewrite(&context, &requested);
        prop_assert!(path.starts_with(&namer.prefix_for(&context)));
        prop_assert!(path.ends_with(&requested));
    }
}
