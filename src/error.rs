use std::io;

use thiserror::Error;

use crate::token::Token;

/// Errors raised while evaluating a program.
///
/// Every variant that comes from the source carries the token it is located
/// at, so the caller can report a line number.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined property '{}'.", .name.lexeme)]
    UndefinedProperty { name: Token },

    #[error("Undefined variable '{}'.", .name.lexeme)]
    UndefinedVariable { name: Token },

    #[error("{message}")]
    Operand { token: Token, message: &'static str },

    #[error("Can only call functions and classes.")]
    NotCallable { paren: Token },

    #[error("Expected {expected} arguments but got {found}.")]
    Arity {
        paren: Token,
        expected: usize,
        found: usize,
    },

    #[error("Stack overflow.")]
    StackOverflow { paren: Token },

    #[error("{message}")]
    NotAnInstance { token: Token, message: &'static str },

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl RuntimeError {
    /// Source line of the offending token, or 0 when there is none.
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::UndefinedProperty { name } | RuntimeError::UndefinedVariable { name } => {
                name.line
            }
            RuntimeError::Operand { token, .. } | RuntimeError::NotAnInstance { token, .. } => {
                token.line
            }
            RuntimeError::NotCallable { paren }
            | RuntimeError::Arity { paren, .. }
            | RuntimeError::StackOverflow { paren } => paren.line,
            RuntimeError::Output(_) => 0,
        }
    }
}
