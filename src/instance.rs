use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use tracing::trace;

use crate::{
    callable::Callable, class::Class, error::RuntimeError, token::Token, value::Value,
};

/// An object created by calling a class.
///
/// Clones share the same field map, so an `Instance` behaves as a reference.
#[derive(Clone)]
pub struct Instance {
    class: Rc<Class>,
    fields: Rc<RefCell<HashMap<String, Value>>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    /// Fields shadow methods; a method is returned bound to this instance.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        match self.class.find_method(&name.lexeme) {
            Some(method) => {
                trace!(class = self.class.name(), method = %name.lexeme, "bind method");
                let bound = method.bind(self.clone());
                Ok(Value::Callable(Callable::Function(Rc::new(bound))))
            }
            None => Err(RuntimeError::UndefinedProperty { name: name.clone() }),
        }
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields
            .borrow_mut()
            .insert(name.lexeme.to_owned(), value);
    }

    /// Identity comparison.
    pub fn same(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.fields, &other.fields)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::Function;
    use crate::interpreter::Interpreter;
    use crate::stmt;
    use crate::token::Literal;
    use crate::token_type::TokenType;

    fn name(lexeme: &str) -> Token {
        Token::new(TokenType::Identifier, lexeme, Literal::None, 1)
    }

    /// A class with one empty method called `greet`.
    fn greeter(interpreter: &Interpreter) -> Rc<Class> {
        let declaration = Rc::new(stmt::Function {
            name: name("greet"),
            params: vec![],
            body: vec![],
        });
        let method = Rc::new(Function::new(declaration, interpreter.globals()));
        Rc::new(Class::new(
            "Greeter".to_owned(),
            HashMap::from([("greet".to_owned(), method)]),
        ))
    }

    #[test]
    fn methods_are_bound_on_access() {
        let interpreter = Interpreter::new();
        let instance = Instance::new(greeter(&interpreter));

        match instance.get(&name("greet")) {
            Ok(Value::Callable(Callable::Function(method))) => {
                assert_eq!(method.name(), "greet");
            }
            other => panic!("expected a bound method, got {other:?}"),
        }
    }

    #[test]
    fn each_access_binds_a_new_method() {
        let interpreter = Interpreter::new();
        let instance = Instance::new(greeter(&interpreter));
        let first = instance.get(&name("greet")).ok();
        let second = instance.get(&name("greet")).ok();
        assert_ne!(first, second);
    }

    #[test]
    fn field_shadows_method() {
        let interpreter = Interpreter::new();
        let instance = Instance::new(greeter(&interpreter));

        instance.set(&name("greet"), Value::from("hi"));
        assert_eq!(instance.get(&name("greet")).ok(), Some(Value::from("hi")));
    }

    #[test]
    fn set_overwrites_and_is_shared_between_clones() {
        let interpreter = Interpreter::new();
        let instance = Instance::new(greeter(&interpreter));
        let alias = instance.clone();

        instance.set(&name("count"), Value::Number(1.0));
        alias.set(&name("count"), Value::Number(2.0));

        assert_eq!(instance.get(&name("count")).ok(), Some(Value::Number(2.0)));
        assert!(instance.same(&alias));
    }

    #[test]
    fn missing_property_is_an_error() {
        let interpreter = Interpreter::new();
        let instance = Instance::new(greeter(&interpreter));

        match instance.get(&name("wave")) {
            Err(RuntimeError::UndefinedProperty { name }) => assert_eq!(name.lexeme, "wave"),
            other => panic!("expected undefined property, got {other:?}"),
        }
    }

    #[test]
    fn distinct_instances_are_not_equal() {
        let interpreter = Interpreter::new();
        let class = greeter(&interpreter);
        let a = Value::Instance(Instance::new(Rc::clone(&class)));
        let b = Value::Instance(Instance::new(class));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
