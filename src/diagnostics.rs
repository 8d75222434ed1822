//! Collector for syntax errors found while scanning and parsing.
//!
//! The scanner and parser receive a `&mut Diagnostics` and push every error
//! they detect into it. Reporting never affects control flow; the parser
//! recovers on its own and the caller checks [`Diagnostics::had_error`]
//! afterwards.

use std::fmt;

use tracing::debug;

use crate::token::Token;
use crate::token_type::TokenType;
use crate::utils::Soo;

/// A single reported syntax error.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    /// Either empty, `" at end"`, or `" at '<lexeme>'"`.
    pub location: String,
    pub message: Soo,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error{}: {}", self.line, self.location, self.message)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    errors: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports an error located at `token`.
    pub fn report(&mut self, token: &Token, message: impl Into<Soo>) {
        let location = match token.typ {
            TokenType::Eof => " at end".to_owned(),
            _ => format!(" at '{}'", token.lexeme),
        };
        self.push(token.line, location, message.into());
    }

    /// Reports an error that only has a line, as the scanner does.
    pub fn error(&mut self, line: usize, message: impl Into<Soo>) {
        self.push(line, String::new(), message.into());
    }

    fn push(&mut self, line: usize, location: String, message: Soo) {
        debug!(line, %location, %message, "syntax error");
        self.errors.push(Diagnostic {
            line,
            location,
            message,
        });
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
