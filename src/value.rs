use std::fmt;

use crate::{callable::Callable, instance::Instance, token::Literal};

/// A runtime value.
#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable),
    Instance(Instance),
}

impl Value {
    /// `nil` and `false` are falsey, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::StringLiteral(s) => Value::String(s.clone()),
            // names are looked up in the environment, never evaluated as literals
            Literal::IdentifierLiteral(_) => Value::Nil,
            Literal::BoolLiteral(b) => Value::Bool(*b),
            Literal::F64(f) => Value::Number(*f),
            Literal::None => Value::Nil,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(f)
    }
}

/// Primitives compare by value, callables and instances by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(b1), Value::Bool(b2)) => b1 == b2,
            (Value::Number(f1), Value::Number(f2)) => f1 == f2,
            (Value::String(s1), Value::String(s2)) => s1 == s2,
            (Value::Callable(c1), Value::Callable(c2)) => c1.same(c2),
            (Value::Instance(i1), Value::Instance(i2)) => i1.same(i2),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            // f64's Display already drops a zero fraction and keeps `-0`
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Callable(callable) => write!(f, "{callable}"),
            Value::Instance(instance) => write!(f, "{instance}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::from("").is_truthy());
    }

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Number(-0.0).to_string(), "-0");
        assert_eq!(Value::Number(0.0).to_string(), "0");
        assert_eq!(Value::Number(1e20).to_string(), "100000000000000000000");
    }

    #[test]
    fn equality_does_not_coerce() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(1.0), Value::from("1"));
        assert_eq!(Value::from(&Literal::F64(2.0)), Value::Number(2.0));
    }

    #[test]
    fn identifier_literals_carry_no_value() {
        let name = Literal::IdentifierLiteral("x".to_owned());
        assert_eq!(Value::from(&name), Value::Nil);
        assert_eq!(
            Value::from(&Literal::StringLiteral("x".to_owned())),
            Value::from("x")
        );
    }
}
