//! Front end and tree-walking runtime for a small dynamically-typed
//! scripting language.
//!
//! Source text goes through [`scanner::Scanner`] and [`parser::Parser`] into
//! [`stmt::Stmt`] trees, which [`interpreter::Interpreter`] evaluates against
//! the runtime object model in [`callable`], [`class`] and [`instance`].

pub mod ast_display;
pub mod callable;
pub mod class;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod expr;
pub mod instance;
pub mod interpreter;
pub mod parser;
pub mod scanner;
mod stack;
pub mod stmt;
pub mod token;
pub mod token_type;
pub mod utils;
pub mod value;

use thiserror::Error;

use diagnostics::Diagnostics;
use error::RuntimeError;
use interpreter::Interpreter;
use scanner::Scanner;
use value::Value;

/// Why running a piece of source failed.
#[derive(Debug, Error)]
pub enum RunError {
    /// One or more syntax errors; nothing was executed.
    #[error("{0}")]
    Syntax(Diagnostics),

    #[error("{0}\n[line {}]", .0.line())]
    Runtime(#[from] RuntimeError),
}

/// Scans, parses and runs a program on `interpreter`.
pub fn run(source: &str, interpreter: &mut Interpreter) -> Result<(), RunError> {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
    let statements = parser::parse(&tokens, &mut diagnostics);

    if diagnostics.had_error() {
        return Err(RunError::Syntax(diagnostics));
    }

    interpreter.interpret(&statements)?;
    Ok(())
}

/// Scans, parses and evaluates a single expression.
pub fn evaluate(source: &str, interpreter: &mut Interpreter) -> Result<Value, RunError> {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
    let expr = parser::parse_expression(&tokens, &mut diagnostics);

    match expr {
        Some(expr) if !diagnostics.had_error() => Ok(interpreter.evaluate(&expr)?),
        _ => Err(RunError::Syntax(diagnostics)),
    }
}
