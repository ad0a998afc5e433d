/*!
 * Interpreter
 * Tree-walking evaluator parameterized by an explicit scope
 */

use super::ast::*;
use super::error::{ScriptError, ScriptResult};
use super::value::Value;
use crate::capability::{NodeCapability, Property};
use crate::context::{Globals, SandboxContext};
use crate::core::errors::SandboxError;
use crate::tree::EventKind;
use ahash::RandomState;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Resolution of names not declared locally
pub trait Bindings {
    fn lookup(&self, name: &str) -> ScriptResult<Value>;

    fn assign(&self, name: &str, value: Value) -> ScriptResult<()>;
}

/// Event-handler scope: the session globals and nothing else
///
/// Assigning an undeclared name stores it in the globals bag.
pub struct HandlerBindings {
    globals: Globals,
}

impl HandlerBindings {
    pub fn new(globals: Globals) -> Self {
        Self { globals }
    }
}

impl Bindings for HandlerBindings {
    fn lookup(&self, name: &str) -> ScriptResult<Value> {
        self.globals
            .get(name)
            .ok_or_else(|| ScriptError::Reference(name.to_string()))
    }

    fn assign(&self, name: &str, value: Value) -> ScriptResult<()> {
        self.globals.set(name, value);
        Ok(())
    }
}

/// Plugin top-level scope: exactly `context` and `root`
pub struct PluginBindings {
    context: Arc<SandboxContext>,
    root: NodeCapability,
}

impl PluginBindings {
    pub fn new(context: Arc<SandboxContext>, root: NodeCapability) -> Self {
        Self { context, root }
    }
}

impl Bindings for PluginBindings {
    fn lookup(&self, name: &str) -> ScriptResult<Value> {
        match name {
            "context" => Ok(Value::Context(self.context.clone())),
            "root" => Ok(Value::Node(self.root.clone())),
            _ => Err(ScriptError::Reference(name.to_string())),
        }
    }

    fn assign(&self, name: &str, _value: Value) -> ScriptResult<()> {
        match name {
            "context" | "root" => {
                let err = SandboxError::ReadOnlyPropertyViolation {
                    property: name.to_string(),
                };
                self.context.audit_error(&err);
                Err(err.into())
            }
            _ => Err(ScriptError::Reference(name.to_string())),
        }
    }
}

enum Flow {
    Normal,
    Return(Value),
}

/// One evaluation: a receiver, a local frame and the outer bindings
pub struct Interpreter<'a> {
    bindings: &'a dyn Bindings,
    receiver: Value,
    locals: HashMap<String, Value, RandomState>,
}

impl<'a> Interpreter<'a> {
    pub fn new(bindings: &'a dyn Bindings, receiver: Value) -> Self {
        Self {
            bindings,
            receiver,
            locals: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Run a program; yields the `return` value or `undefined`
    pub fn run(&mut self, program: &Program) -> ScriptResult<Value> {
        match self.exec_block(&program.body)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Undefined),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn exec_block(&mut self, body: &[Stmt]) -> ScriptResult<Flow> {
        for stmt in body {
            if let Flow::Return(value) = self.exec(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> ScriptResult<Flow> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Declare { name, init } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                self.locals.insert(name.clone(), value);
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.truthy() {
                    return self.exec(then);
                } else if let Some(otherwise) = otherwise {
                    return self.exec(otherwise);
                }
            }
            Stmt::Block(body) => return self.exec_block(body),
            Stmt::Try {
                body,
                binding,
                handler,
            } => match self.exec_block(body) {
                Ok(flow) => return Ok(flow),
                Err(err) if err.is_catchable() => {
                    debug!(error = %err, "sandboxed script caught error");
                    if let Some(binding) = binding {
                        self.locals.insert(binding.clone(), Value::Str(err.message()));
                    }
                    return self.exec_block(handler);
                }
                Err(err) => return Err(err),
            },
            Stmt::Throw(expr) => {
                let value = self.eval(expr)?;
                return Err(ScriptError::Thrown(value.to_string()));
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Undefined,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Empty => {}
        }
        Ok(Flow::Normal)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn eval(&mut self, expr: &Expr) -> ScriptResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
                Literal::Undefined => Value::Undefined,
            }),
            Expr::Ident(name) => self.lookup(name),
            Expr::This => Ok(self.receiver.clone()),
            Expr::Member { object, property } => {
                let object = self.eval(object)?;
                get_member(&object, property)
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::Unary(UnaryOp::Typeof, operand) => {
                // `typeof` of an unbound name is "undefined", not an error
                let value = match (&**operand, self.eval(operand)) {
                    (Expr::Ident(_), Err(ScriptError::Reference(_))) => Value::Undefined,
                    (_, result) => result?,
                };
                Ok(Value::Str(value.type_name().to_string()))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Typeof => Value::Str(value.type_name().to_string()),
                })
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical(op, left, right) => {
                let left = self.eval(left)?;
                match (op, left.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Assign { op, target, value } => self.assign(*op, target, value),
            Expr::Update {
                increment,
                prefix,
                target,
            } => self.update(*increment, *prefix, target),
        }
    }

    fn lookup(&self, name: &str) -> ScriptResult<Value> {
        match self.locals.get(name) {
            Some(value) => Ok(value.clone()),
            None => self.bindings.lookup(name),
        }
    }

    fn store(&mut self, name: &str, value: Value) -> ScriptResult<()> {
        if let Some(slot) = self.locals.get_mut(name) {
            *slot = value;
            Ok(())
        } else {
            self.bindings.assign(name, value)
        }
    }

    /// Evaluate the object part of an assignment target once
    fn resolve_target(&mut self, target: &Expr) -> ScriptResult<Option<Value>> {
        match target {
            Expr::Ident(_) => Ok(None),
            Expr::Member { object, .. } => Ok(Some(self.eval(object)?)),
            _ => Err(ScriptError::Type("invalid assignment target".into())),
        }
    }

    fn read_target(&self, target: &Expr, object: &Option<Value>) -> ScriptResult<Value> {
        match (target, object) {
            (Expr::Ident(name), _) => self.lookup(name),
            (Expr::Member { property, .. }, Some(object)) => get_member(object, property),
            _ => Err(ScriptError::Type("invalid assignment target".into())),
        }
    }

    fn write_target(&mut self, target: &Expr, object: &Option<Value>, value: Value) -> ScriptResult<()> {
        match (target, object) {
            (Expr::Ident(name), _) => self.store(name, value),
            (Expr::Member { property, .. }, Some(object)) => set_member(object, property, value),
            _ => Err(ScriptError::Type("invalid assignment target".into())),
        }
    }

    fn assign(&mut self, op: AssignOp, target: &Expr, value: &Expr) -> ScriptResult<Value> {
        let object = self.resolve_target(target)?;
        let value = match op {
            AssignOp::Set => self.eval(value)?,
            AssignOp::Compound(op) => {
                let current = self.read_target(target, &object)?;
                let rhs = self.eval(value)?;
                binary(op, &current, &rhs)
            }
        };
        self.write_target(target, &object, value.clone())?;
        Ok(value)
    }

    fn update(&mut self, increment: bool, prefix: bool, target: &Expr) -> ScriptResult<Value> {
        let object = self.resolve_target(target)?;
        let old = self.read_target(target, &object)?.to_number();
        let new = if increment { old + 1.0 } else { old - 1.0 };
        self.write_target(target, &object, Value::Number(new))?;
        Ok(Value::Number(if prefix { new } else { old }))
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> ScriptResult<Value> {
        let Expr::Member { object, property } = callee else {
            // There are no free functions; a bound name is never callable
            let value = self.eval(callee)?;
            return Err(ScriptError::Type(format!("{} is not a function", value)));
        };
        let object = self.eval(object)?;
        let args = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<ScriptResult<Vec<_>>>()?;
        call_method(&object, property, &args)
    }
}

// =============================================================================
// Operators
// =============================================================================

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let concat = matches!(left, Value::Str(_))
                || matches!(right, Value::Str(_))
                || !left.is_primitive()
                || !right.is_primitive();
            if concat {
                Value::Str(format!("{}{}", left, right))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            Value::Bool(match ordering {
                None => false,
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::LtEq => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
            })
        }
        BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_eq(right)),
    }
}

// =============================================================================
// Mediated member access
// =============================================================================

fn get_member(object: &Value, name: &str) -> ScriptResult<Value> {
    match object {
        Value::Undefined | Value::Null => Err(ScriptError::Type(format!(
            "Cannot read properties of {} (reading '{}')",
            object, name
        ))),
        Value::Node(node) => {
            if name == "style" {
                return Ok(Value::Style(node.style()?));
            }
            match Property::from_str(name) {
                Ok(property) => Ok(node.get(property)?.map(Value::Str).unwrap_or_default()),
                // Not enumerated: invisible, including parentNode
                Err(_) => Ok(Value::Undefined),
            }
        }
        Value::Style(style) => Ok(style.get(name)?.map(Value::Str).unwrap_or_default()),
        Value::Context(context) => Ok(match name {
            "name" => Value::Str(context.name().to_string()),
            "globals" => Value::Globals(context.globals().clone()),
            _ => Value::Undefined,
        }),
        Value::Globals(globals) => Ok(globals.get(name).unwrap_or_default()),
        Value::Str(s) if name == "length" => Ok(Value::Number(s.chars().count() as f64)),
        _ => Ok(Value::Undefined),
    }
}

fn set_member(object: &Value, name: &str, value: Value) -> ScriptResult<()> {
    match object {
        Value::Node(node) => {
            if let Some(event) = EventKind::from_property(name) {
                let Value::Str(source) = value else {
                    return Err(ScriptError::Type(format!(
                        "{} handler source must be a string",
                        event
                    )));
                };
                // A failed compilation leaves the binding unset; the binder
                // has already logged and audited it
                if let Err(err) = node.set_handler(event, &source) {
                    match err {
                        SandboxError::CompilationFailure { .. } => return Ok(()),
                        other => return Err(other.into()),
                    }
                }
                return Ok(());
            }
            Ok(node.set_property(name, &value.to_string())?)
        }
        Value::Style(style) => Ok(style.set(name, &value.to_string())?),
        Value::Context(context) => Ok(context.assign(name, &value.to_string())?),
        Value::Globals(globals) => {
            globals.set(name, value);
            Ok(())
        }
        other => Err(ScriptError::Type(format!(
            "Cannot set property '{}' of {}",
            name, other
        ))),
    }
}

fn arg_string(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::to_string).unwrap_or_else(|| "undefined".into())
}

fn call_method(object: &Value, name: &str, args: &[Value]) -> ScriptResult<Value> {
    match (object, name) {
        (Value::Node(node), "appendText") => Ok(Value::Node(node.append_text(&arg_string(args, 0))?)),
        (Value::Node(node), "appendElement") => {
            Ok(Value::Node(node.append_element(&arg_string(args, 0))?))
        }
        (Value::Node(node), "clear") => {
            node.clear()?;
            Ok(Value::Undefined)
        }
        (Value::Context(context), "log") => {
            context.log(&arg_string(args, 0));
            Ok(Value::Undefined)
        }
        (Value::Context(context), "request") => {
            context.request(&arg_string(args, 0), Box::new(|_| {}))?;
            Ok(Value::Undefined)
        }
        (Value::Undefined | Value::Null, _) => Err(ScriptError::Type(format!(
            "Cannot read properties of {} (reading '{}')",
            object, name
        ))),
        _ => Err(ScriptError::Type(format!(
            "{}.{} is not a function",
            object.type_name(),
            name
        ))),
    }
}
