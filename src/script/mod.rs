/*!
 * Script Module
 * Restricted evaluator for plugin and event-handler source
 *
 * The language is a small JavaScript subset without loops or function
 * literals, so every program terminates. Free names resolve only through an
 * explicit `Bindings` implementation; there is no ambient global scope.
 */

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::Program;
pub use error::{ScriptError, ScriptResult};
pub use interpreter::{Bindings, HandlerBindings, Interpreter, PluginBindings};
pub use value::Value;

/// Parse source into a program
pub fn compile(source: &str) -> ScriptResult<Program> {
    let tokens = lexer::tokenize(source)?;
    parser::Parser::new(tokens).parse_program()
}
