/*!
 * Script Errors
 */

use crate::core::errors::SandboxError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ScriptResult<T> = Result<T, ScriptError>;

/// Compile-time and runtime script failures
///
/// Everything except `Syntax` is catchable from script with `try/catch`.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ScriptError {
    #[error("SyntaxError at {line}:{column}: {message}")]
    #[diagnostic(code(script::syntax))]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("ReferenceError: {0} is not defined")]
    #[diagnostic(
        code(script::reference),
        help("Only names in the provided scope are visible to sandboxed code.")
    )]
    Reference(String),

    #[error("TypeError: {0}")]
    #[diagnostic(code(script::type_error))]
    Type(String),

    #[error("{0}")]
    #[diagnostic(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("Uncaught {0}")]
    #[diagnostic(code(script::thrown))]
    Thrown(String),
}

impl ScriptError {
    /// Message bound to a `catch` parameter
    pub fn message(&self) -> String {
        match self {
            ScriptError::Thrown(value) => value.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_catchable(&self) -> bool {
        !matches!(self, ScriptError::Syntax { .. })
    }
}
