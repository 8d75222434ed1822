use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{error::RuntimeError, token::Token, value::Value};

type Scope = Rc<RefCell<HashMap<String, Value>>>;

/// Chain of lexical scopes, outermost first.
///
/// Cloning copies the chain but shares the scopes themselves, which is how
/// closures see later writes to the variables they captured.
#[derive(Clone)]
pub struct Environment {
    layers: Vec<Scope>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            layers: vec![Scope::default()],
        }
    }

    pub fn add_scope(&mut self) {
        self.layers.push(Scope::default());
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn define(&self, name: &str, value: Value) {
        if let Some(scope) = self.layers.last() {
            scope.borrow_mut().insert(name.to_string(), value);
        }
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        for values in self.layers.iter().rev() {
            if let Some(value) = values.borrow().get(&name.lexeme) {
                return Ok(value.clone());
            }
        }

        Err(RuntimeError::UndefinedVariable { name: name.clone() })
    }

    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        for values in self.layers.iter().rev() {
            let mut values = values.borrow_mut();
            if let Some(slot) = values.get_mut(&name.lexeme) {
                *slot = value;
                return Ok(());
            }
        }

        Err(RuntimeError::UndefinedVariable { name: name.clone() })
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Literal;
    use crate::token_type::TokenType;

    fn name(lexeme: &str) -> Token {
        Token::new(TokenType::Identifier, lexeme, Literal::None, 1)
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut environment = Environment::new();
        environment.define("a", Value::Number(1.0));
        environment.add_scope();
        environment.define("a", Value::Number(2.0));

        assert_eq!(environment.get(&name("a")).ok(), Some(Value::Number(2.0)));
        assert_eq!(environment.depth(), 2);
    }

    #[test]
    fn assign_updates_nearest_definition() {
        let mut environment = Environment::new();
        environment.define("a", Value::Number(1.0));
        let outer = environment.clone();
        environment.add_scope();

        assert!(environment.assign(&name("a"), Value::Bool(true)).is_ok());
        assert_eq!(outer.get(&name("a")).ok(), Some(Value::Bool(true)));
    }

    #[test]
    fn clones_share_scopes() {
        let environment = Environment::new();
        let closure = environment.clone();
        environment.define("later", Value::Nil);
        assert!(closure.get(&name("later")).is_ok());
    }

    #[test]
    fn undefined_variable() {
        let environment = Environment::new();
        let error = environment.get(&name("nope")).unwrap_err();
        assert_eq!(error.to_string(), "Undefined variable 'nope'.");
        assert!(environment.assign(&name("nope"), Value::Nil).is_err());
    }
}
