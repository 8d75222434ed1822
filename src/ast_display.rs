use std::fmt;

use crate::{
    expr::*,
    token::{Literal, Token},
};

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::BoolLiteral(b) => {
                write!(f, "{}", b)
            }
            Literal::F64(float) => {
                write!(f, "{}", float)
            }
            Literal::IdentifierLiteral(identifier) => {
                write!(f, "{}", identifier)
            }
            Literal::StringLiteral(s) => {
                write!(f, "{}", s)
            }
            Literal::None => {
                write!(f, "nil")
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lexeme)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Assign { name, value } => {
                write!(f, "{name} = {value}")
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                write!(f, "({operator} {left} {right})")
            }
            Expr::Call {
                callee,
                paren: _,
                arguments,
            } => {
                write!(f, "{callee}(")?;
                if let Some(expr) = arguments.first() {
                    write!(f, "{expr}")?;
                }
                arguments.iter().skip(1).try_for_each(|expr| write!(f, ",{expr}"))?;
                write!(f, ")")
            }
            Expr::Get { object, name } => {
                write!(f, "{object}.{name}")
            }
            Expr::Grouping { expression } => {
                write!(f, "(group {expression})")
            }
            Expr::LiteralExpr { value } => {
                write!(f, "{value}")
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                write!(f, "{left} {operator} {right}")
            }
            Expr::Set {
                object,
                name,
                value,
            } => {
                write!(f, "{object}.{name} = {value}")
            }
            Expr::This { keyword } => {
                write!(f, "{keyword}")
            }
            Expr::Unary { operator, right } => {
                write!(f, "({operator} {right})")
            }
            Expr::Variable { name } => {
                write!(f, "{name}")
            }
        }
    }
}
