/*!
 * Plugin Scope Tests
 * Top-level plugin code sees exactly `context` and `root`
 */

use pretty_assertions::assert_eq;
use sandbox_mediator::script::{compile, Interpreter, PluginBindings, ScriptError, Value};
use sandbox_mediator::context::{ContextDeps, RequestRouter, SandboxContext};
use sandbox_mediator::{HostTree, NodeCapability};
use std::sync::Arc;

fn bindings() -> (HostTree, PluginBindings) {
    let tree = HostTree::new();
    let context = SandboxContext::new("alice", ContextDeps::new(Arc::new(RequestRouter::new())));
    let root = NodeCapability::new(tree.document_root(), tree.clone(), context.clone()).unwrap();
    (tree, PluginBindings::new(context, root))
}

fn run(bindings: &PluginBindings, source: &str) -> Result<Value, ScriptError> {
    let program = compile(source)?;
    Interpreter::new(bindings, Value::Undefined).run(&program)
}

#[test]
fn test_typeof_scope_names() {
    let (_, bindings) = bindings();
    assert_eq!(run(&bindings, "return typeof context;").unwrap(), Value::from("object"));
    assert_eq!(run(&bindings, "return typeof root;").unwrap(), Value::from("object"));
    assert_eq!(run(&bindings, "return typeof document;").unwrap(), Value::from("undefined"));
    assert_eq!(run(&bindings, "return this;").unwrap(), Value::Undefined);
}

#[test]
fn test_globals_are_not_free_names_at_top_level() {
    let (_, bindings) = bindings();
    run(&bindings, "context.globals.count = 1;").unwrap();
    assert_eq!(
        run(&bindings, "return count;").unwrap_err(),
        ScriptError::Reference("count".into())
    );
    assert_eq!(run(&bindings, "return context.globals.count;").unwrap(), Value::from(1));
}

#[test]
fn test_locals_do_not_leak_between_runs() {
    let (_, bindings) = bindings();
    run(&bindings, "var secret = 'x';").unwrap();
    assert!(run(&bindings, "return secret;").is_err());
}

#[test]
fn test_capabilities_compare_by_identity() {
    let (tree, bindings) = bindings();
    assert_eq!(run(&bindings, "return root === root;").unwrap(), Value::from(true));
    assert_eq!(
        run(&bindings, "var a = root.appendElement('p'); return a === root;").unwrap(),
        Value::from(false)
    );
    assert_eq!(tree.render(tree.document_root()).unwrap(), "<body><p></p></body>");
}
