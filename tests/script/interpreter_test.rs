/*!
 * Script Interpreter Tests
 * Language behavior under handler and plugin bindings
 */

use pretty_assertions::assert_eq;
use sandbox_mediator::script::{compile, HandlerBindings, Interpreter, ScriptError, Value};
use sandbox_mediator::Globals;

fn eval(source: &str, globals: &Globals) -> Result<Value, ScriptError> {
    let program = compile(source)?;
    let bindings = HandlerBindings::new(globals.clone());
    Interpreter::new(&bindings, Value::Undefined).run(&program)
}

#[test]
fn test_if_else_chains() {
    let globals = Globals::new();
    globals.set("n", 7);
    let source = "if (n < 5) return 'small'; else if (n < 10) return 'medium'; else return 'large';";
    assert_eq!(eval(source, &globals).unwrap(), Value::from("medium"));
}

#[test]
fn test_compound_assignment_on_globals_bag() {
    let globals = Globals::new();
    globals.set("total", 10);
    eval("total -= 4; total *= 2; total /= 3;", &globals).unwrap();
    assert_eq!(globals.get("total"), Some(Value::from(4)));
}

#[test]
fn test_string_coercions() {
    let globals = Globals::new();
    assert_eq!(eval("return 'a' + 1 + 2;", &globals).unwrap(), Value::from("a12"));
    assert_eq!(eval("return 1 + 2 + 'a';", &globals).unwrap(), Value::from("3a"));
    assert_eq!(eval("return '6' * '7';", &globals).unwrap(), Value::from(42));
    assert_eq!(eval("return 'abc'.length;", &globals).unwrap(), Value::from(3));
    assert_eq!(eval("return 0.5 + '';", &globals).unwrap(), Value::from("0.5"));
}

#[test]
fn test_postfix_and_prefix_updates() {
    let globals = Globals::new();
    globals.set("i", 1);
    assert_eq!(eval("return i++;", &globals).unwrap(), Value::from(1));
    assert_eq!(eval("return ++i;", &globals).unwrap(), Value::from(3));
    assert_eq!(globals.get("i"), Some(Value::from(3)));
}

#[test]
fn test_nested_try_rethrow() {
    let globals = Globals::new();
    let source = "try { try { throw 'inner'; } catch (e) { throw e + '!'; } } catch (e) { return e; }";
    assert_eq!(eval(source, &globals).unwrap(), Value::from("inner!"));
}

#[test]
fn test_type_errors() {
    let globals = Globals::new();
    assert!(matches!(
        eval("var a = null; a.b = 1;", &globals).unwrap_err(),
        ScriptError::Type(_)
    ));
    globals.set("f", "text");
    assert_eq!(
        eval("f();", &globals).unwrap_err(),
        ScriptError::Type("text is not a function".into())
    );
}

#[test]
fn test_unsupported_constructs_fail_to_compile() {
    for source in ["while (true) {}", "for (;;) {}", "new Image()", "x = function() {}"] {
        assert!(
            matches!(compile(source), Err(ScriptError::Syntax { .. })),
            "{source} should not compile"
        );
    }
}

#[test]
fn test_syntax_errors_report_position() {
    match compile("a = 1;\nb = ;").unwrap_err() {
        ScriptError::Syntax { line, .. } => assert_eq!(line, 2),
        other => panic!("unexpected error {other:?}"),
    }
}
